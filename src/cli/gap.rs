//! # gap 子命令 CLI 定义
//!
//! 从能带数据判定带隙
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/gap.rs`

use crate::gap::DEFAULT_GAP_TOLERANCE;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 能带文件格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BandFormat {
    /// Detect from the file name
    Auto,
    /// bands.x gnuplot file (.gnu)
    Gnu,
    /// projwfc.x output (proj.out)
    Proj,
    /// Converted projection table (.pdos.csv)
    Table,
}

/// gap 子命令参数
#[derive(Args, Debug)]
pub struct GapArgs {
    /// Band data file (bands .gnu, proj.out or .pdos.csv)
    pub band_file: PathBuf,

    /// K-path file (K_POINTS crystal_b card) for high-symmetry labels
    #[arg(short, long)]
    pub kpath: Option<PathBuf>,

    /// Fermi level in eV (tables from `convert` are already relative to it)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub fermi: f64,

    /// Gaps smaller than this (eV) are classified as metallic
    #[arg(long, default_value_t = DEFAULT_GAP_TOLERANCE, env = "QEPLOTTER_GAP_TOLERANCE")]
    pub tolerance: f64,

    /// Band data format
    #[arg(short, long, value_enum, default_value = "auto")]
    pub format: BandFormat,

    /// proj.out input was computed with spin-orbit coupling
    #[arg(long, default_value_t = false)]
    pub soc: bool,
}
