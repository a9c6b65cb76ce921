//! # convert 子命令实现
//!
//! 将 projwfc.x 输出转换为规范投影表 (.pdos.csv)，可选按通道拆分。
//!
//! ## 功能
//! - 支持单文件和批量目录处理
//! - 并行转换（rayon）
//! - 权重和偏离 1 的 (k, band) 以警告报告，不做修正
//!
//! ## 依赖关系
//! - 使用 `cli/convert.rs` 定义的 ConvertArgs
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `projection/` 模块进行转换与导出

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::convert::ConvertArgs;
use crate::error::{QeplotterError, Result};
use crate::models::{DensityMode, ProjectionTable, WeightDeviation};
use crate::projection::{
    export, group_channels, ChannelMode, Conversion, ConverterConfig, ProjectionConverter,
};
use crate::utils::output;

use std::fs;
use std::path::{Path, PathBuf};

/// 警告中最多列出的偏离条目
const MAX_LISTED_DEVIATIONS: usize = 5;

/// 执行转换
pub fn execute(args: ConvertArgs) -> Result<()> {
    output::print_header("Projection Table Conversion");

    if !args.weight_tolerance.is_finite() || args.weight_tolerance < 0.0 {
        return Err(QeplotterError::InvalidArgument(format!(
            "weight tolerance must be a non-negative number, got {}",
            args.weight_tolerance
        )));
    }

    if args.input.is_file() {
        execute_single_file(&args)
    } else if args.input.is_dir() {
        execute_batch(&args)
    } else {
        Err(QeplotterError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

/// 转换任务的共享配置
struct ConvertJob {
    /// 输入根目录，输出保留相对它的子目录结构
    input_root: PathBuf,
    output_dir: PathBuf,
    converter: ProjectionConverter,
    split_by: Option<ChannelMode>,
    overwrite: bool,
}

impl ConvertJob {
    fn from_args(args: &ConvertArgs) -> Self {
        let density = if args.sparse {
            DensityMode::Sparse
        } else {
            DensityMode::Dense
        };
        let input_root = if args.input.is_dir() {
            args.input.clone()
        } else {
            args.input.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        Self {
            input_root,
            output_dir: args.output.clone(),
            converter: ProjectionConverter::new(ConverterConfig {
                soc: args.soc,
                density,
                fermi: args.fermi,
                weight_tolerance: args.weight_tolerance,
            }),
            split_by: args.split_by,
            overwrite: args.overwrite,
        }
    }

    /// `<input>/run1/proj.out` → `<output>/run1/proj.pdos.csv`
    fn output_path(&self, input: &Path) -> PathBuf {
        let dir = match input
            .parent()
            .and_then(|p| p.strip_prefix(&self.input_root).ok())
        {
            Some(rel) => self.output_dir.join(rel),
            None => self.output_dir.clone(),
        };
        dir.join(format!("{}.pdos.csv", output_stem(input)))
    }

    /// 读取、转换并写出一个文件
    fn run(&self, input: &Path, output_path: &Path) -> Result<(Conversion, Vec<PathBuf>)> {
        let content = fs::read_to_string(input).map_err(|e| QeplotterError::FileReadError {
            path: input.display().to_string(),
            source: e,
        })?;

        let conversion = self.converter.convert(&content)?;
        let dir = output_path.parent().unwrap_or(self.output_dir.as_path());
        ensure_dir(dir)?;
        export::write_table(&conversion.table, output_path)?;

        let channel_files = match self.split_by {
            Some(mode) => {
                let series = group_channels(&conversion.table, mode);
                export::write_channels(&series, dir, &output_stem(input))?
            }
            None => Vec::new(),
        };

        Ok((conversion, channel_files))
    }
}

/// 输出文件名主干：`proj.out` → `proj`，`MoS2.proj.out` → `MoS2.proj`
fn output_stem(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| QeplotterError::FileWriteError {
        path: dir.display().to_string(),
        source: e,
    })
}

/// 单文件模式
fn execute_single_file(args: &ConvertArgs) -> Result<()> {
    output::print_info(&format!("Single file mode: '{}'", args.input.display()));

    let job = ConvertJob::from_args(args);
    let output_path = job.output_path(&args.input);

    if output_path.exists() && !job.overwrite {
        output::print_skip(&format!(
            "Output exists, use --overwrite to replace: {}",
            output_path.display()
        ));
        return Ok(());
    }

    let (conversion, channel_files) = job.run(&args.input, &output_path)?;

    output::print_conversion(&args.input, &output_path);
    for path in &channel_files {
        output::print_success(&format!("Channel file: {}", path.display()));
    }

    if conversion.table.is_empty() {
        output::print_warning("Input contains no projection data; wrote an empty table");
    }
    report_deviations(&args.input, &conversion.deviations, args.weight_tolerance);
    print_table_summary(&conversion.table, args.fermi);

    Ok(())
}

/// 批量处理模式
fn execute_batch(args: &ConvertArgs) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));

    let collector = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)?
        .recursive(args.recursive);

    let files = collector.collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No matching files found with pattern '{}'",
            args.pattern
        ));
        return Ok(());
    }

    output::print_info(&format!("Found {} projection files", files.len()));
    output::print_info(&format!(
        "Mode: {}, Fermi level: {} eV",
        if args.soc { "spin-orbit" } else { "collinear" },
        args.fermi
    ));

    ensure_dir(&args.output)?;

    let job = ConvertJob::from_args(args);
    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!("Using {} parallel jobs", runner.jobs()));
    let result = runner.run(files, |file, pb| {
        let output_path = job.output_path(file);
        if output_path.exists() && !job.overwrite {
            return ProcessResult::Skipped(format!(
                "Output exists, skipping: {}",
                output_path.display()
            ));
        }

        match job.run(file, &output_path) {
            Ok((conversion, _)) => {
                if !conversion.deviations.is_empty() {
                    pb.suspend(|| {
                        report_deviations(file, &conversion.deviations, args.weight_tolerance)
                    });
                }
                ProcessResult::Success(format!("{} -> {}", file.display(), output_path.display()))
            }
            Err(e) => ProcessResult::Failed(file.display().to_string(), e.to_string()),
        }
    });

    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} success, {} skipped, {} failed",
        result.success, result.skipped, result.failed
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 报告权重和偏离
fn report_deviations(input: &Path, deviations: &[WeightDeviation], tolerance: f64) {
    if deviations.is_empty() {
        return;
    }

    output::print_warning(&format!(
        "{}: {} (k, band) pairs have projection sums outside 1 ± {}",
        input.display(),
        deviations.len(),
        tolerance
    ));
    for d in deviations.iter().take(MAX_LISTED_DEVIATIONS) {
        output::print_warning(&format!(
            "  k={} band={} sum={:.4}",
            d.k_index, d.band_index, d.sum
        ));
    }
    if deviations.len() > MAX_LISTED_DEVIATIONS {
        output::print_warning(&format!(
            "  ... and {} more",
            deviations.len() - MAX_LISTED_DEVIATIONS
        ));
    }
}

/// 打印转换结果概要
fn print_table_summary(table: &ProjectionTable, fermi: f64) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct SummaryRow {
        #[tabled(rename = "Property")]
        property: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let rows = vec![
        SummaryRow {
            property: "Mode".to_string(),
            value: table.mode.to_string(),
        },
        SummaryRow {
            property: "k-points".to_string(),
            value: table.num_kpoints().to_string(),
        },
        SummaryRow {
            property: "Bands".to_string(),
            value: table.num_bands().to_string(),
        },
        SummaryRow {
            property: "Orbitals".to_string(),
            value: table.num_orbitals().to_string(),
        },
        SummaryRow {
            property: "Records".to_string(),
            value: table.records.len().to_string(),
        },
        SummaryRow {
            property: "Fermi (eV)".to_string(),
            value: format!("{:.4}", fermi),
        },
    ];

    output::print_header("Projection Table");
    println!("{}", Table::new(&rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::pdos_table;

    const SAMPLE: &str = r#"
     Atomic states used for projection
     (read from pseudopotential files):

     state #   1: atom   1 (Si ), wfc  1 (l=0 m= 1)
     state #   2: atom   1 (Si ), wfc  2 (l=1 m= 1)

 k =   0.0000000000  0.0000000000  0.0000000000
==== e(   1) =    -5.82000 eV ====
     psi = 1.000*[#   1]+
    |psi|^2 = 1.000
==== e(   2) =     6.21000 eV ====
     psi = 0.990*[#   2]+
    |psi|^2 = 0.990
"#;

    fn args(input: PathBuf, output: PathBuf) -> ConvertArgs {
        ConvertArgs {
            input,
            output,
            soc: false,
            fermi: 0.0,
            sparse: false,
            split_by: Some(ChannelMode::ElementOrbital),
            weight_tolerance: 0.05,
            pattern: "*proj*.out,proj.out*".to_string(),
            recursive: false,
            jobs: 1,
            overwrite: false,
        }
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(output_stem(Path::new("run/proj.out")), "proj");
        assert_eq!(output_stem(Path::new("MoS2.proj.out")), "MoS2.proj");
    }

    #[test]
    fn test_single_file_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("si.proj.out");
        fs::write(&input, SAMPLE).unwrap();
        let out_dir = dir.path().join("out");

        execute(args(input, out_dir.clone())).unwrap();

        let table = pdos_table::parse_table_file(&out_dir.join("si.proj.pdos.csv")).unwrap();
        assert_eq!(table.records.len(), 4);
        assert!(out_dir.join("si.proj.Si-s.pdos").exists());
        assert!(out_dir.join("si.proj.Si-p.pdos").exists());
    }

    #[test]
    fn test_batch_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.proj.out"), SAMPLE).unwrap();
        fs::write(dir.path().join("b.proj.out"), SAMPLE).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let out_dir = dir.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();
        fs::write(out_dir.join("a.proj.pdos.csv"), "keep").unwrap();

        let mut a = args(dir.path().to_path_buf(), out_dir.clone());
        a.split_by = None;
        execute(a).unwrap();

        assert_eq!(
            fs::read_to_string(out_dir.join("a.proj.pdos.csv")).unwrap(),
            "keep"
        );
        assert!(out_dir.join("b.proj.pdos.csv").exists());
    }

    #[test]
    fn test_recursive_batch_keeps_same_named_inputs_apart() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for run in ["run1", "run2"] {
            let dir = input.path().join(run);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("proj.out"), SAMPLE).unwrap();
        }

        let mut a = args(input.path().to_path_buf(), out.path().to_path_buf());
        a.recursive = true;
        a.jobs = 2;
        execute(a).unwrap();

        for run in ["run1", "run2"] {
            let table = out.path().join(run).join("proj.pdos.csv");
            assert_eq!(pdos_table::parse_table_file(&table).unwrap().records.len(), 4);
            assert!(out.path().join(run).join("proj.Si-s.pdos").exists());
        }
        assert!(!out.path().join("proj.pdos.csv").exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(args(dir.path().join("nope.out"), dir.path().join("out"))).unwrap_err();
        assert!(matches!(err, QeplotterError::FileNotFound { .. }));
    }

    #[test]
    fn test_negative_weight_tolerance_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path().to_path_buf(), dir.path().join("out"));
        a.weight_tolerance = -1.0;
        assert!(matches!(
            execute(a).unwrap_err(),
            QeplotterError::InvalidArgument(_)
        ));
    }
}
