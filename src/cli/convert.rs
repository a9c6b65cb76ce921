//! # convert 子命令 CLI 定义
//!
//! proj.out → 规范投影表 (.pdos.csv)，支持单文件与目录批量模式
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/convert.rs`

use crate::projection::{ChannelMode, DEFAULT_WEIGHT_TOLERANCE};
use clap::Args;
use std::path::PathBuf;

/// convert 子命令参数
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input: proj.out file or directory containing projwfc outputs
    pub input: PathBuf,

    /// Output directory for converted tables
    #[arg(short, long, default_value = "converted")]
    pub output: PathBuf,

    /// Input was computed with spin-orbit coupling (paired spin channels)
    #[arg(long, default_value_t = false)]
    pub soc: bool,

    /// Fermi level in eV; energies are written relative to it
    #[arg(long, default_value_t = 0.0, env = "QEPLOTTER_FERMI", allow_negative_numbers = true)]
    pub fermi: f64,

    /// Only write non-zero projection weights
    #[arg(long, default_value_t = false)]
    pub sparse: bool,

    /// Also write one .pdos file per channel
    #[arg(long, value_enum)]
    pub split_by: Option<ChannelMode>,

    /// Allowed deviation of summed weights from 1.0 before a warning
    #[arg(long, default_value_t = DEFAULT_WEIGHT_TOLERANCE)]
    pub weight_tolerance: f64,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for input files (batch mode, comma separated)
    #[arg(long, default_value = "*proj*.out,proj.out*")]
    pub pattern: String,

    /// Recurse into subdirectories (batch mode)
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
