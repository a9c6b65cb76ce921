//! # 带隙检测器
//!
//! 根据能带点与费米能级确定 VBM、CBM、带隙大小与直接 / 间接类型。
//!
//! ## 算法概述
//! 1. 以 `E - E_F <= 0` 划分占据 / 非占据点
//! 2. 任一能带同时含占据与非占据点 → 金属
//! 3. VBM 取占据点最大能量，CBM 取非占据点最小能量；
//!    能量相同时取最小 k 序号，再取最小能带序号
//! 4. gap = CBM - VBM，小于容差 → 金属
//! 5. VBM 与 CBM 位于同一 k 点时为直接带隙
//!
//! ## 依赖关系
//! - 被 `commands/gap.rs` 调用
//! - 使用 `models/band.rs` 的 BandPoint, GapResult

use crate::error::{NoGapReason, QeplotterError, Result};
use crate::models::{BandPoint, GapResult};

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// 带隙判定的默认能量容差 (eV)
pub const DEFAULT_GAP_TOLERANCE: f64 = 1e-4;

/// 带隙检测器
pub struct GapDetector {
    /// 带隙小于此值视为金属 (eV)
    tolerance: f64,
}

impl Default for GapDetector {
    fn default() -> Self {
        Self::new(DEFAULT_GAP_TOLERANCE)
    }
}

impl GapDetector {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// 检测带隙
    pub fn detect(&self, points: &[BandPoint], fermi: f64) -> Result<GapResult> {
        if points.is_empty() {
            return Err(QeplotterError::EmptyInput(
                "no band points to analyze".to_string(),
            ));
        }

        let is_occupied = |p: &BandPoint| p.energy - fermi <= 0.0;

        // band -> (有占据点, 有非占据点)
        let mut sides: BTreeMap<usize, (bool, bool)> = BTreeMap::new();
        for p in points {
            let entry = sides.entry(p.band_index).or_insert((false, false));
            if is_occupied(p) {
                entry.0 = true;
            } else {
                entry.1 = true;
            }
        }
        if let Some((&band_index, _)) = sides.iter().find(|(_, (occ, unocc))| *occ && *unocc) {
            return Err(QeplotterError::NoGap(NoGapReason::BandCrossing { band_index }));
        }

        let vbm = points
            .iter()
            .filter(|&p| is_occupied(p))
            .fold(None, |best: Option<&BandPoint>, p| match best {
                Some(b) if !prefer(p, b, Ordering::Greater) => Some(b),
                _ => Some(p),
            })
            .ok_or(QeplotterError::NoGap(NoGapReason::NoOccupiedStates))?;

        let cbm = points
            .iter()
            .filter(|&p| !is_occupied(p))
            .fold(None, |best: Option<&BandPoint>, p| match best {
                Some(b) if !prefer(p, b, Ordering::Less) => Some(b),
                _ => Some(p),
            })
            .ok_or(QeplotterError::NoGap(NoGapReason::NoUnoccupiedStates))?;

        let gap = cbm.energy - vbm.energy;
        if gap < self.tolerance {
            return Err(QeplotterError::NoGap(NoGapReason::BelowTolerance {
                gap,
                tolerance: self.tolerance,
            }));
        }

        Ok(GapResult {
            vbm_energy: vbm.energy - fermi,
            vbm_k: vbm.k_index,
            vbm_band: vbm.band_index,
            cbm_energy: cbm.energy - fermi,
            cbm_k: cbm.k_index,
            cbm_band: cbm.band_index,
            gap,
            is_direct: vbm.k_index == cbm.k_index,
            fermi,
        })
    }
}

/// `candidate` 是否优于 `current`：能量按 `wanted` 方向更优，
/// 能量相同时 k 序号更小，再相同时能带序号更小
fn prefer(candidate: &BandPoint, current: &BandPoint, wanted: Ordering) -> bool {
    match candidate.energy.partial_cmp(&current.energy) {
        Some(ord) if ord == wanted => true,
        Some(Ordering::Equal) => {
            (candidate.k_index, candidate.band_index) < (current.k_index, current.band_index)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(data: &[(usize, usize, f64)]) -> Vec<BandPoint> {
        data.iter()
            .map(|&(k, b, e)| BandPoint::new(k, b, e))
            .collect()
    }

    #[test]
    fn test_direct_gap_example() {
        let points = pts(&[(0, 0, -1.0), (0, 1, 0.8), (1, 0, -0.5), (1, 1, 0.3)]);
        let result = GapDetector::default().detect(&points, 0.0).unwrap();

        assert_eq!((result.vbm_k, result.vbm_energy), (1, -0.5));
        assert_eq!((result.cbm_k, result.cbm_energy), (1, 0.3));
        assert!((result.gap - 0.8).abs() < 1e-12);
        assert!(result.is_direct);
    }

    #[test]
    fn test_indirect_gap() {
        let points = pts(&[(0, 0, -0.2), (0, 1, 1.5), (1, 0, -0.9), (1, 1, 1.1)]);
        let result = GapDetector::default().detect(&points, 0.0).unwrap();
        assert_eq!(result.vbm_k, 0);
        assert_eq!(result.cbm_k, 1);
        assert!(!result.is_direct);
        assert!((result.gap - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_energies_relative_to_fermi() {
        let points = pts(&[(0, 0, 4.0), (0, 1, 6.0)]);
        let result = GapDetector::default().detect(&points, 5.0).unwrap();
        assert_eq!(result.vbm_energy, -1.0);
        assert_eq!(result.cbm_energy, 1.0);
        assert_eq!(result.gap, 2.0);
        assert_eq!(result.fermi, 5.0);
    }

    #[test]
    fn test_empty_input() {
        let err = GapDetector::default().detect(&[], 0.0).unwrap_err();
        assert!(matches!(err, QeplotterError::EmptyInput(_)));
    }

    #[test]
    fn test_all_below_fermi_is_no_gap() {
        let points = pts(&[(0, 0, -2.0), (0, 1, -1.0), (1, 0, -1.8), (1, 1, -0.7)]);
        let err = GapDetector::default().detect(&points, 0.0).unwrap_err();
        assert!(matches!(
            err,
            QeplotterError::NoGap(NoGapReason::NoUnoccupiedStates)
        ));
    }

    #[test]
    fn test_all_above_fermi_is_no_gap() {
        let points = pts(&[(0, 0, 1.0), (1, 0, 2.0)]);
        let err = GapDetector::default().detect(&points, 0.0).unwrap_err();
        assert!(matches!(
            err,
            QeplotterError::NoGap(NoGapReason::NoOccupiedStates)
        ));
    }

    #[test]
    fn test_tolerance_boundary_keeps_gap() {
        let points = pts(&[(0, 0, -0.00005), (0, 1, 0.00005)]);
        let result = GapDetector::new(1e-4).detect(&points, 0.0).unwrap();
        assert_eq!(result.vbm_band, 0);
        assert_eq!(result.cbm_band, 1);
        assert!((result.gap - 1e-4).abs() < 1e-12);
    }

    #[test]
    fn test_gap_below_tolerance_is_metallic() {
        let points = pts(&[(0, 0, -0.00001), (0, 1, 0.00001)]);
        let err = GapDetector::new(1e-4).detect(&points, 0.0).unwrap_err();
        assert!(matches!(
            err,
            QeplotterError::NoGap(NoGapReason::BelowTolerance { .. })
        ));
    }

    #[test]
    fn test_band_crossing_is_metallic() {
        let points = pts(&[(0, 0, -1.0), (0, 1, -0.2), (1, 0, -0.9), (1, 1, 0.4)]);
        let err = GapDetector::default().detect(&points, 0.0).unwrap_err();
        assert!(matches!(
            err,
            QeplotterError::NoGap(NoGapReason::BandCrossing { band_index: 1 })
        ));
    }

    #[test]
    fn test_degenerate_tie_break() {
        let points = pts(&[
            (2, 1, -0.3),
            (0, 1, -0.3),
            (0, 0, -0.3),
            (2, 2, 0.9),
            (1, 2, 0.9),
        ]);
        let result = GapDetector::default().detect(&points, 0.0).unwrap();
        assert_eq!((result.vbm_k, result.vbm_band), (0, 0));
        assert_eq!((result.cbm_k, result.cbm_band), (1, 2));
    }

    #[test]
    fn test_point_at_fermi_is_occupied() {
        let points = pts(&[(0, 0, 0.0), (0, 1, 1.0)]);
        let result = GapDetector::default().detect(&points, 0.0).unwrap();
        assert_eq!(result.vbm_energy, 0.0);
    }
}
