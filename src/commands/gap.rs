//! # gap 子命令实现
//!
//! 读取能带数据（bands.x .gnu、proj.out 或 .pdos.csv），判定 VBM / CBM
//! 与直接 / 间接带隙。
//!
//! ## 依赖关系
//! - 使用 `cli/gap.rs` 定义的 GapArgs
//! - 使用 `parsers/` 读取能带与 k 路径
//! - 使用 `gap/detector.rs` 进行判定

use crate::cli::gap::{BandFormat, GapArgs};
use crate::error::{QeplotterError, Result};
use crate::gap::GapDetector;
use crate::models::{BandPoint, DensityMode, GapResult, HighSymmetryPoint};
use crate::parsers::{self, bands_gnu, kpath, pdos_table, BandSource};
use crate::projection::{ConverterConfig, ProjectionConverter};
use crate::utils::output;

use std::fs;
use std::path::Path;

/// 执行带隙分析
pub fn execute(args: GapArgs) -> Result<()> {
    output::print_header("Band Gap Analysis");

    if !args.tolerance.is_finite() || args.tolerance < 0.0 {
        return Err(QeplotterError::InvalidArgument(format!(
            "gap tolerance must be a non-negative number, got {}",
            args.tolerance
        )));
    }

    if !args.band_file.is_file() {
        return Err(QeplotterError::FileNotFound {
            path: args.band_file.display().to_string(),
        });
    }

    let source = resolve_source(&args.band_file, args.format)?;
    let points = load_band_points(&args.band_file, source, args.soc)?;
    output::print_success(&format!(
        "Loaded {} band points from '{}'",
        points.len(),
        args.band_file.display()
    ));

    let kpath_points = match &args.kpath {
        Some(path) => {
            let points = kpath::parse_kpath_file(path)?;
            output::print_info(&format!(
                "K-path: {}",
                points
                    .iter()
                    .map(|p| p.label.as_str())
                    .collect::<Vec<_>>()
                    .join(" - ")
            ));
            points
        }
        None => Vec::new(),
    };

    output::print_info(&format!(
        "Fermi level: {:.4} eV, tolerance: {:.1e} eV",
        args.fermi, args.tolerance
    ));

    let detector = GapDetector::new(args.tolerance);
    match detector.detect(&points, args.fermi) {
        Ok(result) => {
            print_gap_table(&result, &kpath_points);
            output::print_done(&result.summary(&kpath_points));
            Ok(())
        }
        Err(QeplotterError::NoGap(reason)) => {
            output::print_warning(&format!("No band gap: {}", reason));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// 确定能带数据格式
fn resolve_source(path: &Path, format: BandFormat) -> Result<BandSource> {
    match format {
        BandFormat::Auto => parsers::detect_band_source(path),
        BandFormat::Gnu => Ok(BandSource::Gnu),
        BandFormat::Proj => Ok(BandSource::Projwfc),
        BandFormat::Table => Ok(BandSource::PdosTable),
    }
}

/// 按来源读取能带点（能量为绝对值，费米能级由检测器扣除）
fn load_band_points(path: &Path, source: BandSource, soc: bool) -> Result<Vec<BandPoint>> {
    match source {
        BandSource::Gnu => Ok(bands_gnu::parse_bands_gnu_file(path)?.band_points()),
        BandSource::PdosTable => Ok(pdos_table::parse_table_file(path)?.band_points()),
        BandSource::Projwfc => {
            let content = fs::read_to_string(path).map_err(|e| QeplotterError::FileReadError {
                path: path.display().to_string(),
                source: e,
            })?;
            let converter = ProjectionConverter::new(ConverterConfig {
                soc,
                density: DensityMode::Dense,
                ..ConverterConfig::default()
            });
            Ok(converter.convert(&content)?.table.band_points())
        }
    }
}

/// 打印 VBM / CBM 表格
fn print_gap_table(result: &GapResult, kpath_points: &[HighSymmetryPoint]) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct EdgeRow {
        #[tabled(rename = "Edge")]
        edge: &'static str,
        #[tabled(rename = "E - E_F (eV)")]
        energy: String,
        #[tabled(rename = "k")]
        k: String,
        #[tabled(rename = "Band")]
        band: usize,
    }

    let k_label = |k: usize| match kpath_points.iter().find(|p| p.k_index == k) {
        Some(p) => format!("{} ({})", k, p.label),
        None => k.to_string(),
    };

    let rows = vec![
        EdgeRow {
            edge: "VBM",
            energy: format!("{:.6}", result.vbm_energy),
            k: k_label(result.vbm_k),
            band: result.vbm_band,
        },
        EdgeRow {
            edge: "CBM",
            energy: format!("{:.6}", result.cbm_energy),
            k: k_label(result.cbm_k),
            band: result.cbm_band,
        },
    ];

    println!("{}", Table::new(&rows));
    output::print_info(&format!("Gap: {:.6} eV ({})", result.gap, result.kind()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const GNU: &str = "\
  0.0000  -1.0000
  0.1000  -0.5000

  0.0000   0.8000
  0.1000   0.3000
";

    fn args(band_file: PathBuf) -> GapArgs {
        GapArgs {
            band_file,
            kpath: None,
            fermi: 0.0,
            tolerance: 1e-4,
            format: BandFormat::Auto,
            soc: false,
        }
    }

    #[test]
    fn test_resolve_source() {
        let path = Path::new("bands.txt");
        assert!(resolve_source(path, BandFormat::Auto).is_err());
        assert_eq!(
            resolve_source(path, BandFormat::Gnu).unwrap(),
            BandSource::Gnu
        );
    }

    #[test]
    fn test_load_gnu_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("si.bands.dat.gnu");
        fs::write(&path, GNU).unwrap();

        let points = load_band_points(&path, BandSource::Gnu, false).unwrap();
        let result = GapDetector::default().detect(&points, 0.0).unwrap();
        assert_eq!(result.vbm_k, 1);
        assert!(result.is_direct);
    }

    #[test]
    fn test_execute_with_kpath() {
        let dir = tempfile::tempdir().unwrap();
        let band_file = dir.path().join("bands.gnu");
        let kpath_file = dir.path().join("kpath.in");
        fs::write(&band_file, GNU).unwrap();
        fs::write(&kpath_file, "K_POINTS crystal_b\n2\n0 0 0 1 !G\n0.5 0 0 1 !X\n").unwrap();

        let mut a = args(band_file);
        a.kpath = Some(kpath_file);
        execute(a).unwrap();
    }

    #[test]
    fn test_metallic_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metal.gnu");
        fs::write(&path, "0.0 -1.0\n0.1 0.5\n\n0.0 2.0\n0.1 3.0\n").unwrap();
        execute(args(path)).unwrap();
    }

    #[test]
    fn test_empty_band_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.gnu");
        fs::write(&path, "").unwrap();
        assert!(matches!(
            execute(args(path)).unwrap_err(),
            QeplotterError::EmptyInput(_)
        ));
    }
}
