//! # 统一错误处理模块
//!
//! 定义 QEPlotter 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use std::fmt;
use thiserror::Error;

/// 无法确定带隙的原因
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoGapReason {
    /// 没有能量高于费米能级的点
    NoUnoccupiedStates,
    /// 没有能量低于费米能级的点
    NoOccupiedStates,
    /// 某条能带穿过费米能级（金属）
    BandCrossing { band_index: usize },
    /// CBM - VBM 小于容差
    BelowTolerance { gap: f64, tolerance: f64 },
}

impl fmt::Display for NoGapReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoGapReason::NoUnoccupiedStates => {
                write!(f, "no band lies above the Fermi level")
            }
            NoGapReason::NoOccupiedStates => {
                write!(f, "no band lies below the Fermi level")
            }
            NoGapReason::BandCrossing { band_index } => {
                write!(f, "band {} crosses the Fermi level (metallic)", band_index)
            }
            NoGapReason::BelowTolerance { gap, tolerance } => write!(
                f,
                "gap {:.6} eV is below tolerance {:.1e} eV (metallic)",
                gap, tolerance
            ),
        }
    }
}

/// QEPlotter 统一错误类型
#[derive(Error, Debug)]
pub enum QeplotterError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} input at line {line}: {reason}\n  > {content}")]
    ParseError {
        format: String,
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 分析错误
    // ─────────────────────────────────────────────────────────────
    #[error("No usable data: {0}")]
    EmptyInput(String),

    #[error("No band gap: {0}")]
    NoGap(NoGapReason),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl QeplotterError {
    /// 构造带行号的解析错误
    pub fn parse(format: &str, line: usize, content: &str, reason: impl Into<String>) -> Self {
        QeplotterError::ParseError {
            format: format.to_string(),
            line,
            content: content.trim_end().to_string(),
            reason: reason.into(),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QeplotterError>;
