//! # 能带数据模型
//!
//! 能带点、高对称点与带隙结果。
//!
//! ## 依赖关系
//! - 被 `parsers/bands_gnu.rs`, `parsers/kpath.rs`, `gap/` 使用
//! - 被 `commands/gap.rs` 使用

/// 单个能带点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    pub k_index: usize,
    pub band_index: usize,
    /// 能量 (eV)
    pub energy: f64,
}

impl BandPoint {
    pub fn new(k_index: usize, band_index: usize, energy: f64) -> Self {
        BandPoint {
            k_index,
            band_index,
            energy,
        }
    }
}

/// bands.x 输出的能带结构
#[derive(Debug, Clone, PartialEq)]
pub struct BandStructure {
    /// 沿路径的 k 距离
    pub kdist: Vec<f64>,
    /// bands[band][k]
    pub bands: Vec<Vec<f64>>,
}

impl BandStructure {
    pub fn num_kpoints(&self) -> usize {
        self.kdist.len()
    }

    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// 展开为按 k、band 排序的能带点
    pub fn band_points(&self) -> Vec<BandPoint> {
        let mut points = Vec::with_capacity(self.num_kpoints() * self.num_bands());
        for k in 0..self.num_kpoints() {
            for (b, band) in self.bands.iter().enumerate() {
                points.push(BandPoint::new(k, b, band[k]));
            }
        }
        points
    }
}

/// k 路径上的高对称点
#[derive(Debug, Clone, PartialEq)]
pub struct HighSymmetryPoint {
    pub label: String,
    pub coords: [f64; 3],
    /// 在能带 k 序列中的位置
    pub k_index: usize,
}

/// 带隙分析结果（能量相对费米能级）
#[derive(Debug, Clone, PartialEq)]
pub struct GapResult {
    pub vbm_energy: f64,
    pub vbm_k: usize,
    pub vbm_band: usize,
    pub cbm_energy: f64,
    pub cbm_k: usize,
    pub cbm_band: usize,
    pub gap: f64,
    pub is_direct: bool,
    pub fermi: f64,
}

impl GapResult {
    pub fn kind(&self) -> &'static str {
        if self.is_direct {
            "direct"
        } else {
            "indirect"
        }
    }

    /// 人类可读摘要；提供 k 路径时附带高对称点标签
    pub fn summary(&self, kpath: &[HighSymmetryPoint]) -> String {
        let position = |k: usize| match kpath.iter().find(|p| p.k_index == k) {
            Some(p) => format!("k={} [{}]", k, p.label),
            None => format!("k={}", k),
        };

        if self.is_direct {
            format!(
                "Direct gap of {:.6} eV at {} (VBM {:.6} eV, CBM {:.6} eV)",
                self.gap,
                position(self.vbm_k),
                self.vbm_energy,
                self.cbm_energy
            )
        } else {
            format!(
                "Indirect gap of {:.6} eV: VBM {:.6} eV at {}, CBM {:.6} eV at {}",
                self.gap,
                self.vbm_energy,
                position(self.vbm_k),
                self.cbm_energy,
                position(self.cbm_k)
            )
        }
    }
}
