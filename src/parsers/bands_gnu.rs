//! # bands.x gnuplot 能带文件解析器
//!
//! 解析 Quantum ESPRESSO `bands.x` 输出的 `.gnu` 文件。
//!
//! ## .gnu 格式说明
//! ```text
//!       0.0000    -5.6120
//!       0.0500    -5.5843
//!
//!       0.0000     6.2530
//!       0.0500     6.2301
//! ```
//! 每个空行分隔的块对应一条能带，每行为 (k 路径距离, 能量 eV)。
//!
//! ## 依赖关系
//! - 被 `commands/gap.rs` 使用
//! - 使用 `models/band.rs`

use crate::error::{QeplotterError, Result};
use crate::models::BandStructure;
use std::fs;
use std::path::Path;

const FORMAT: &str = "bands.gnu";

/// 解析 .gnu 文件
pub fn parse_bands_gnu_file(path: &Path) -> Result<BandStructure> {
    let content = fs::read_to_string(path).map_err(|e| QeplotterError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_bands_gnu_content(&content)
}

/// 从字符串内容解析 .gnu 格式
pub fn parse_bands_gnu_content(content: &str) -> Result<BandStructure> {
    let mut kdist: Vec<f64> = Vec::new();
    let mut bands: Vec<Vec<f64>> = Vec::new();
    let mut current: Vec<f64> = Vec::new();
    // 当前块第一行的行号，用于报告块长度不一致
    let mut block_start = 0;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.starts_with('#') {
            continue;
        }
        if line.is_empty() {
            finish_block(&mut bands, &mut current, block_start, content)?;
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(QeplotterError::parse(
                FORMAT,
                line_no,
                raw,
                format!("expected 2 columns, found {}", parts.len()),
            ));
        }

        let (k, e) = match (parts[0].parse::<f64>(), parts[1].parse::<f64>()) {
            (Ok(k), Ok(e)) => (k, e),
            _ => {
                return Err(QeplotterError::parse(
                    FORMAT,
                    line_no,
                    raw,
                    "non-numeric value",
                ))
            }
        };

        if current.is_empty() {
            block_start = line_no;
        }
        // 第一条能带确定 k 距离
        if bands.is_empty() {
            kdist.push(k);
        }
        current.push(e);
    }
    finish_block(&mut bands, &mut current, block_start, content)?;

    Ok(BandStructure { kdist, bands })
}

/// 结束当前能带块并检查长度一致
fn finish_block(
    bands: &mut Vec<Vec<f64>>,
    current: &mut Vec<f64>,
    block_start: usize,
    content: &str,
) -> Result<()> {
    if current.is_empty() {
        return Ok(());
    }
    if let Some(first) = bands.first() {
        if first.len() != current.len() {
            let raw = content.lines().nth(block_start - 1).unwrap_or("");
            return Err(QeplotterError::parse(
                FORMAT,
                block_start,
                raw,
                format!(
                    "band has {} k-points, expected {}",
                    current.len(),
                    first.len()
                ),
            ));
        }
    }
    bands.push(std::mem::take(current));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_bands() {
        let content = "  0.0000  -1.0000\n  0.5000  -0.5000\n\n  0.0000   0.8000\n  0.5000   0.3000\n\n";
        let bs = parse_bands_gnu_content(content).unwrap();
        assert_eq!(bs.num_bands(), 2);
        assert_eq!(bs.num_kpoints(), 2);
        assert_eq!(bs.kdist, vec![0.0, 0.5]);
        assert_eq!(bs.bands[1], vec![0.8, 0.3]);
    }

    #[test]
    fn test_multiple_blank_lines_between_bands() {
        let content = "0.0 -1.0\n\n\n\n0.0 1.0\n";
        let bs = parse_bands_gnu_content(content).unwrap();
        assert_eq!(bs.num_bands(), 2);
    }

    #[test]
    fn test_wrong_column_count() {
        let content = "0.0 -1.0\n0.5 -0.5 9.9\n";
        match parse_bands_gnu_content(content) {
            Err(QeplotterError::ParseError { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unequal_bands() {
        let content = "0.0 -1.0\n0.5 -0.5\n\n0.0 1.0\n";
        match parse_bands_gnu_content(content) {
            Err(QeplotterError::ParseError { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file() {
        let bs = parse_bands_gnu_content("").unwrap();
        assert!(bs.band_points().is_empty());
    }
}
