//! # 投影数据导出
//!
//! 将投影表写入规范 .pdos.csv，或按通道拆分写入制表符分隔的 .pdos 文件。
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs` 调用
//! - 使用 `parsers/pdos_table.rs` 生成规范文本
//! - 使用 `csv` 库写入通道文件

use crate::error::{QeplotterError, Result};
use crate::models::ProjectionTable;
use crate::parsers::pdos_table;
use crate::projection::channels::ChannelSeries;

use std::fs;
use std::path::{Path, PathBuf};

/// 写入规范投影表
pub fn write_table(table: &ProjectionTable, output_path: &Path) -> Result<()> {
    let content = pdos_table::to_table_string(table)?;
    fs::write(output_path, content).map_err(|e| QeplotterError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })
}

/// 通道文件名中不安全的字符替换为下划线
fn channel_file_name(stem: &str, channel: &str) -> String {
    let safe: String = channel
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.{}.pdos", stem, safe)
}

/// 每个通道写一个 .pdos 文件，返回写入的路径
pub fn write_channels(
    series: &[ChannelSeries],
    output_dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(series.len());

    for channel in series {
        let output_path = output_dir.join(channel_file_name(stem, &channel.name));
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&output_path)?;

        wtr.write_record(["k_index", "band_index", "energy", "weight"])?;
        for p in &channel.points {
            wtr.write_record(&[
                p.k_index.to_string(),
                p.band_index.to_string(),
                format!("{:.6}", p.energy),
                format!("{:.6}", p.weight),
            ])?;
        }

        wtr.flush().map_err(|e| QeplotterError::FileWriteError {
            path: output_path.display().to_string(),
            source: e,
        })?;
        written.push(output_path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::pdos_table::parse_table_file;
    use crate::projection::channels::{group_channels, ChannelMode};
    use crate::projection::converter::{ConverterConfig, ProjectionConverter};

    const PROJ: &str = r#"
     state #   1: atom   1 (Mo ), wfc  1 (l=2 m= 1)
     state #   2: atom   2 (S  ), wfc  1 (l=1 m= 1)
 k =   0.0000000000  0.0000000000  0.0000000000
==== e(   1) =   -1.00000 eV ====
     psi = 0.700*[#   1]+0.300*[#   2]+
    |psi|^2 = 1.000
"#;

    #[test]
    fn test_write_and_reload_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = ProjectionConverter::new(ConverterConfig::default())
            .convert(PROJ)
            .unwrap()
            .table;

        let path = dir.path().join("MoS2.pdos.csv");
        write_table(&table, &path).unwrap();
        assert_eq!(parse_table_file(&path).unwrap(), table);
    }

    #[test]
    fn test_write_channels() {
        let dir = tempfile::tempdir().unwrap();
        let table = ProjectionConverter::new(ConverterConfig::default())
            .convert(PROJ)
            .unwrap()
            .table;
        let series = group_channels(&table, ChannelMode::ElementOrbital);

        let paths = write_channels(&series, dir.path(), "MoS2").unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("MoS2.Mo-d.pdos"));

        let text = fs::read_to_string(&paths[1]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "k_index\tband_index\tenergy\tweight");
        assert_eq!(lines[1], "0\t0\t-1.000000\t0.300000");
    }

    #[test]
    fn test_channel_file_name_sanitized() {
        assert_eq!(channel_file_name("x", "fz(x2-y2)"), "x.fz_x2-y2_.pdos");
    }
}
