//! # 解析器模块
//!
//! 提供 Quantum ESPRESSO 输出与本工具规范表格的解析器。
//!
//! ## 依赖关系
//! - 被 `projection/` 和 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: projwfc, pdos_table, bands_gnu, kpath

pub mod bands_gnu;
pub mod kpath;
pub mod pdos_table;
pub mod projwfc;

use crate::error::{QeplotterError, Result};
use std::path::Path;

/// 能带数据来源格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandSource {
    /// bands.x 的 .gnu 文件
    Gnu,
    /// projwfc.x 的 proj.out
    Projwfc,
    /// 本工具输出的 .pdos.csv
    PdosTable,
}

/// 从文件名推断能带数据格式
pub fn detect_band_source(path: &Path) -> Result<BandSource> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if name.ends_with(".pdos.csv") {
        return Ok(BandSource::PdosTable);
    }
    if name.ends_with(".gnu") || name.ends_with(".dat") {
        return Ok(BandSource::Gnu);
    }
    if name.contains("proj") || name.ends_with(".out") {
        return Ok(BandSource::Projwfc);
    }

    Err(QeplotterError::UnsupportedFormat(format!(
        "Cannot determine band data format for: {}",
        path.display()
    )))
}
