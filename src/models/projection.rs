//! # 轨道投影数据模型
//!
//! 存储 projwfc.x 输出转换后的规范化投影表。
//!
//! ## 依赖关系
//! - 被 `projection/`, `parsers/projwfc.rs`, `parsers/pdos_table.rs` 使用
//! - 被 `commands/convert.rs`, `commands/gap.rs` 使用

use crate::models::band::BandPoint;
use serde::Deserialize;
use std::fmt;

/// 自旋通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spin {
    Up,
    Down,
}

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spin::Up => write!(f, "up"),
            Spin::Down => write!(f, "down"),
        }
    }
}

/// 解析模式，由调用方标志和文件头一次性确定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// 每个 state 对应一个轨道
    Collinear,
    /// 相邻两个 state 组成一个轨道的 up/down 通道
    SpinOrbit,
}

impl ParseMode {
    pub fn from_flag(soc: bool) -> Self {
        if soc {
            ParseMode::SpinOrbit
        } else {
            ParseMode::Collinear
        }
    }

    /// 每个轨道占用的 state 列数
    pub fn columns_per_orbital(&self) -> usize {
        match self {
            ParseMode::Collinear => 1,
            ParseMode::SpinOrbit => 2,
        }
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::Collinear => write!(f, "collinear"),
            ParseMode::SpinOrbit => write!(f, "spin-orbit"),
        }
    }
}

/// 输出密度：是否保留零权重行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DensityMode {
    #[default]
    Dense,
    Sparse,
}

/// 原子轨道标签
#[derive(Debug, Clone, PartialEq)]
pub struct AtomOrbitalLabel {
    /// 轨道序号（0 起）
    pub orbital_index: usize,

    /// 原子序号（与 QE 一致，1 起）
    pub atom_index: usize,

    /// 元素符号
    pub element: String,

    /// 赝势波函数序号
    pub wfc: usize,

    /// 角动量量子数
    pub l: u8,

    /// 实球谐函数磁量子数（QE 顺序，1 起）
    pub m: Option<u8>,

    /// 总角动量（自旋轨道耦合基组）
    pub j: Option<f64>,
}

impl AtomOrbitalLabel {
    /// 轨道类型 (s, p, d, f)
    pub fn orbital(&self) -> String {
        match self.l {
            0 => "s".to_string(),
            1 => "p".to_string(),
            2 => "d".to_string(),
            3 => "f".to_string(),
            4 => "g".to_string(),
            l => format!("l{}", l),
        }
    }

    /// 子轨道名称，例如 dxy
    pub fn sub_orbital(&self) -> Option<&'static str> {
        let m = self.m?;
        let name = match (self.l, m) {
            (0, 1) => "s",
            (1, 1) => "pz",
            (1, 2) => "px",
            (1, 3) => "py",
            (2, 1) => "dz2",
            (2, 2) => "dxz",
            (2, 3) => "dyz",
            (2, 4) => "dx2-y2",
            (2, 5) => "dxy",
            (3, 1) => "fz3",
            (3, 2) => "fxz2",
            (3, 3) => "fyz2",
            (3, 4) => "fz(x2-y2)",
            (3, 5) => "fxyz",
            (3, 6) => "fx(x2-3y2)",
            (3, 7) => "fy(3x2-y2)",
            _ => return None,
        };
        Some(name)
    }

    /// 原子标签，例如 Mo1
    pub fn atom_label(&self) -> String {
        format!("{}{}", self.element, self.atom_index)
    }

    /// 元素-轨道标签，例如 Mo-d
    pub fn element_orbital(&self) -> String {
        format!("{}-{}", self.element, self.orbital())
    }

    /// 表格中使用的完整标签：Mo-dxy, Mo-d5/2 或 Mo-d
    pub fn label(&self) -> String {
        if let Some(sub) = self.sub_orbital() {
            return format!("{}-{}", self.element, sub);
        }
        if let Some(j) = self.j {
            return format!("{}-{}{}/2", self.element, self.orbital(), (j * 2.0).round() as i64);
        }
        self.element_orbital()
    }
}

impl fmt::Display for AtomOrbitalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 单条投影记录
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRecord {
    pub k_index: usize,
    pub band_index: usize,
    pub orbital_index: usize,
    /// 仅在 SpinOrbit 模式下存在
    pub spin: Option<Spin>,
    /// 相对费米能级的能量 (eV)
    pub energy: f64,
    pub weight: f64,
}

impl ProjectionRecord {
    /// 输出排序键：k, band, orbital, spin
    pub fn sort_key(&self) -> (usize, usize, usize, Option<Spin>) {
        (self.k_index, self.band_index, self.orbital_index, self.spin)
    }
}

/// 权重和偏离 1.0 的 (k, band)
#[derive(Debug, Clone, PartialEq)]
pub struct WeightDeviation {
    pub k_index: usize,
    pub band_index: usize,
    pub sum: f64,
}

/// 规范化投影表
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionTable {
    pub mode: ParseMode,
    pub labels: Vec<AtomOrbitalLabel>,
    pub kpoints: Vec<[f64; 3]>,
    pub records: Vec<ProjectionRecord>,
}

impl ProjectionTable {
    pub fn empty(mode: ParseMode) -> Self {
        ProjectionTable {
            mode,
            labels: Vec::new(),
            kpoints: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn num_kpoints(&self) -> usize {
        self.kpoints.len()
    }

    pub fn num_bands(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.band_index + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn num_orbitals(&self) -> usize {
        self.labels.len()
    }

    /// 按轨道序号查找标签
    pub fn label_of(&self, orbital_index: usize) -> Option<&AtomOrbitalLabel> {
        self.labels.get(orbital_index)
    }

    /// 每个 (k, band) 一个能带点，按 k、band 排序
    pub fn band_points(&self) -> Vec<BandPoint> {
        let mut points: Vec<BandPoint> = Vec::new();
        for r in &self.records {
            match points.last() {
                Some(p) if p.k_index == r.k_index && p.band_index == r.band_index => {}
                _ => points.push(BandPoint::new(r.k_index, r.band_index, r.energy)),
            }
        }
        points
    }
}
