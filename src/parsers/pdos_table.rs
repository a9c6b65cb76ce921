//! # 规范投影表 (.pdos.csv) 读写
//!
//! 转换器输出的规范格式：注释前导区保存解析模式、k 点坐标与轨道标签，
//! 其后是 CSV 表格。
//!
//! ## .pdos.csv 格式说明
//! ```text
//! # qeplotter projection table
//! # mode = collinear
//! # kpoint 0 = 0 0 0
//! # orbital 0 = atom=1 element=Mo wfc=1 l=2 m=5
//! k_index,band_index,orbital_index,orbital_label,energy,weight
//! 0,0,0,Mo-dxy,-6,0.9
//! ```
//! 自旋轨道模式在 `energy` 前多一列 `spin` (up/down)。
//! 浮点数使用最短往返表示，重新解析得到完全相同的表。
//!
//! ## 依赖关系
//! - 被 `projection/export.rs`, `commands/gap.rs` 使用
//! - 使用 `models/projection.rs`
//! - 使用 `csv` + `serde` 读取表格行

use crate::error::{QeplotterError, Result};
use crate::models::{AtomOrbitalLabel, ParseMode, ProjectionRecord, ProjectionTable, Spin};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const FORMAT: &str = "pdos table";
const TITLE: &str = "# qeplotter projection table";

const COLLINEAR_COLUMNS: [&str; 6] = [
    "k_index",
    "band_index",
    "orbital_index",
    "orbital_label",
    "energy",
    "weight",
];
const SOC_COLUMNS: [&str; 7] = [
    "k_index",
    "band_index",
    "orbital_index",
    "orbital_label",
    "spin",
    "energy",
    "weight",
];

/// CSV 表格行
#[derive(Debug, Deserialize)]
struct TableRow {
    k_index: usize,
    band_index: usize,
    orbital_index: usize,
    orbital_label: String,
    #[serde(default)]
    spin: Option<Spin>,
    energy: f64,
    weight: f64,
}

/// 读取 .pdos.csv 文件
pub fn parse_table_file(path: &Path) -> Result<ProjectionTable> {
    let content = fs::read_to_string(path).map_err(|e| QeplotterError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_table_content(&content)
}

/// 从字符串内容解析规范投影表
pub fn parse_table_content(content: &str) -> Result<ProjectionTable> {
    let mut mode: Option<ParseMode> = None;
    let mut labels: Vec<AtomOrbitalLabel> = Vec::new();
    let mut kpoints: Vec<[f64; 3]> = Vec::new();
    // (行号, 内容)
    let mut data_lines: Vec<(usize, &str)> = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let Some(comment) = line.strip_prefix('#') else {
            data_lines.push((line_no, raw));
            continue;
        };

        let Some((key, value)) = comment.split_once('=') else {
            continue;
        };
        let key_parts: Vec<&str> = key.split_whitespace().collect();
        let value = value.trim();

        match key_parts.as_slice() {
            ["mode"] => {
                mode = Some(match value {
                    "collinear" => ParseMode::Collinear,
                    "spin-orbit" => ParseMode::SpinOrbit,
                    other => {
                        return Err(QeplotterError::parse(
                            FORMAT,
                            line_no,
                            raw,
                            format!("unknown mode '{}'", other),
                        ))
                    }
                });
            }
            ["kpoint", n] => {
                expect_sequence(n, kpoints.len(), line_no, raw)?;
                kpoints.push(parse_coords(value, line_no, raw)?);
            }
            ["orbital", n] => {
                expect_sequence(n, labels.len(), line_no, raw)?;
                labels.push(parse_label(labels.len(), value, line_no, raw)?);
            }
            _ => {}
        }
    }

    let mode = mode.unwrap_or(ParseMode::Collinear);
    let mut table = ProjectionTable::empty(mode);
    table.labels = labels;
    table.kpoints = kpoints;

    let Some(&(header_line, header_raw)) = data_lines.first() else {
        return Ok(table);
    };

    let body = data_lines
        .iter()
        .map(|(_, l)| *l)
        .collect::<Vec<_>>()
        .join("\n");

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| QeplotterError::parse(FORMAT, header_line, header_raw, e.to_string()))?
        .clone();
    let expected: &[&str] = match mode {
        ParseMode::Collinear => &COLLINEAR_COLUMNS,
        ParseMode::SpinOrbit => &SOC_COLUMNS,
    };
    if headers.iter().ne(expected.iter().copied()) {
        return Err(QeplotterError::parse(
            FORMAT,
            header_line,
            header_raw,
            format!("expected columns '{}' for {} mode", expected.join(","), mode),
        ));
    }

    for (i, row) in rdr.deserialize::<TableRow>().enumerate() {
        let (line_no, raw) = data_lines[i + 1];
        let row = row.map_err(|e| QeplotterError::parse(FORMAT, line_no, raw, e.to_string()))?;
        table
            .records
            .push(validate_row(row, &table, line_no, raw)?);
    }

    Ok(table)
}

fn validate_row(
    row: TableRow,
    table: &ProjectionTable,
    line_no: usize,
    raw: &str,
) -> Result<ProjectionRecord> {
    let fail = |reason: String| Err(QeplotterError::parse(FORMAT, line_no, raw, reason));

    match (table.mode, row.spin) {
        (ParseMode::Collinear, Some(_)) => {
            return fail("spin value in collinear table".to_string())
        }
        (ParseMode::SpinOrbit, None) => return fail("missing spin value".to_string()),
        _ => {}
    }

    let Some(label) = table.label_of(row.orbital_index) else {
        return fail(format!(
            "orbital index {} not declared in header",
            row.orbital_index
        ));
    };
    if label.label() != row.orbital_label {
        return fail(format!(
            "orbital label '{}' does not match header '{}'",
            row.orbital_label,
            label.label()
        ));
    }

    if row.k_index >= table.kpoints.len() {
        return fail(format!("k index {} not declared in header", row.k_index));
    }

    Ok(ProjectionRecord {
        k_index: row.k_index,
        band_index: row.band_index,
        orbital_index: row.orbital_index,
        spin: row.spin,
        energy: row.energy,
        weight: row.weight,
    })
}

fn expect_sequence(token: &str, expected: usize, line_no: usize, raw: &str) -> Result<()> {
    match token.parse::<usize>() {
        Ok(n) if n == expected => Ok(()),
        _ => Err(QeplotterError::parse(
            FORMAT,
            line_no,
            raw,
            format!("expected entry {}", expected),
        )),
    }
}

fn parse_coords(value: &str, line_no: usize, raw: &str) -> Result<[f64; 3]> {
    let values: Vec<f64> = value
        .split_whitespace()
        .map(|v| v.parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| QeplotterError::parse(FORMAT, line_no, raw, "non-numeric coordinate"))?;
    if values.len() != 3 {
        return Err(QeplotterError::parse(
            FORMAT,
            line_no,
            raw,
            format!("expected 3 coordinates, found {}", values.len()),
        ));
    }
    Ok([values[0], values[1], values[2]])
}

/// 解析 `atom=1 element=Mo wfc=1 l=2 m=5` 形式的轨道描述
fn parse_label(index: usize, value: &str, line_no: usize, raw: &str) -> Result<AtomOrbitalLabel> {
    let bad = |what: &str| QeplotterError::parse(FORMAT, line_no, raw, format!("invalid {}", what));

    let mut atom_index = None;
    let mut element = None;
    let mut wfc = None;
    let mut l = None;
    let mut m = None;
    let mut j = None;

    for token in value.split_whitespace() {
        let (key, val) = token.split_once('=').ok_or_else(|| bad("orbital field"))?;
        match key {
            "atom" => atom_index = Some(val.parse::<usize>().map_err(|_| bad("atom"))?),
            "element" => element = Some(val.to_string()),
            "wfc" => wfc = Some(val.parse::<usize>().map_err(|_| bad("wfc"))?),
            "l" => l = Some(val.parse::<u8>().map_err(|_| bad("l"))?),
            "m" => m = Some(val.parse::<u8>().map_err(|_| bad("m"))?),
            "j" => j = Some(val.parse::<f64>().map_err(|_| bad("j"))?),
            _ => return Err(bad("orbital field")),
        }
    }

    Ok(AtomOrbitalLabel {
        orbital_index: index,
        atom_index: atom_index.ok_or_else(|| bad("atom"))?,
        element: element.ok_or_else(|| bad("element"))?,
        wfc: wfc.ok_or_else(|| bad("wfc"))?,
        l: l.ok_or_else(|| bad("l"))?,
        m,
        j,
    })
}

/// 将投影表序列化为规范 .pdos.csv 文本
pub fn to_table_string(table: &ProjectionTable) -> Result<String> {
    let mut result = String::new();
    result.push_str(TITLE);
    result.push('\n');
    result.push_str(&format!("# mode = {}\n", table.mode));

    for (i, k) in table.kpoints.iter().enumerate() {
        result.push_str(&format!("# kpoint {} = {} {} {}\n", i, k[0], k[1], k[2]));
    }

    for label in &table.labels {
        result.push_str(&format!(
            "# orbital {} = atom={} element={} wfc={} l={}",
            label.orbital_index, label.atom_index, label.element, label.wfc, label.l
        ));
        if let Some(m) = label.m {
            result.push_str(&format!(" m={}", m));
        }
        if let Some(j) = label.j {
            result.push_str(&format!(" j={}", j));
        }
        result.push('\n');
    }

    let mut wtr = csv::Writer::from_writer(Vec::new());
    let soc = table.mode == ParseMode::SpinOrbit;
    if soc {
        wtr.write_record(SOC_COLUMNS)?;
    } else {
        wtr.write_record(COLLINEAR_COLUMNS)?;
    }

    for r in &table.records {
        let label = table
            .label_of(r.orbital_index)
            .map(|l| l.label())
            .unwrap_or_default();
        let mut fields = vec![
            r.k_index.to_string(),
            r.band_index.to_string(),
            r.orbital_index.to_string(),
            label,
        ];
        if soc {
            fields.push(r.spin.map(|s| s.to_string()).unwrap_or_default());
        }
        fields.push(r.energy.to_string());
        fields.push(r.weight.to_string());
        wtr.write_record(&fields)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| QeplotterError::Other(e.to_string()))?;
    let body = String::from_utf8(bytes).map_err(|e| QeplotterError::Other(e.to_string()))?;
    result.push_str(&body);

    Ok(result)
}
