//! # k 路径文件解析器
//!
//! 解析 `K_POINTS crystal_b` 形式的高对称路径，计算每个高对称点在
//! 能带 k 序列中的位置。
//!
//! ## k 路径格式说明
//! ```text
//! K_POINTS crystal_b
//! 3
//!   0.0 0.0 0.0 30 !G
//!   0.5 0.0 0.0 20 !M
//!   0.333333 0.333333 0.0 1 !K
//! ```
//! 可以是单独的文件，也可以是完整的 pw.x 输入（只读取 K_POINTS 卡片）。
//! 第 i 个点的权重为它与下一个点之间的 k 点数。
//!
//! ## 依赖关系
//! - 被 `commands/gap.rs` 使用
//! - 使用 `models/band.rs`

use crate::error::{QeplotterError, Result};
use crate::models::HighSymmetryPoint;
use std::fs;
use std::path::Path;

const FORMAT: &str = "k-path";

/// 解析 k 路径文件
pub fn parse_kpath_file(path: &Path) -> Result<Vec<HighSymmetryPoint>> {
    let content = fs::read_to_string(path).map_err(|e| QeplotterError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_kpath_content(&content)
}

/// 从字符串内容解析 k 路径
pub fn parse_kpath_content(content: &str) -> Result<Vec<HighSymmetryPoint>> {
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty())
        .collect();

    // 有 K_POINTS 卡片时从卡片后开始，否则从第一行开始
    let start = lines
        .iter()
        .position(|(_, l)| l.trim().to_uppercase().starts_with("K_POINTS"))
        .map(|p| p + 1)
        .unwrap_or(0);

    let Some(&(count_line, count_raw)) = lines.get(start) else {
        return Ok(Vec::new());
    };
    let count: usize = count_raw.trim().parse().map_err(|_| {
        QeplotterError::parse(FORMAT, count_line, count_raw, "expected number of k-path points")
    })?;

    let mut points = Vec::with_capacity(count);
    let mut k_index = 0;

    for i in 0..count {
        let Some(&(line_no, raw)) = lines.get(start + 1 + i) else {
            return Err(QeplotterError::parse(
                FORMAT,
                count_line,
                count_raw,
                format!("declares {} points but only {} follow", count, i),
            ));
        };

        let (body, label) = split_label(raw);
        let parts: Vec<&str> = body.split_whitespace().collect();
        let is_last = i + 1 == count;
        if parts.len() < 3 || (!is_last && parts.len() < 4) || parts.len() > 4 {
            return Err(QeplotterError::parse(
                FORMAT,
                line_no,
                raw,
                format!("expected 'x y z n', found {} tokens", parts.len()),
            ));
        }

        let mut coords = [0.0; 3];
        for (c, token) in coords.iter_mut().zip(&parts[..3]) {
            *c = token.parse().map_err(|_| {
                QeplotterError::parse(FORMAT, line_no, raw, "non-numeric coordinate")
            })?;
        }

        let segment: usize = match parts.get(3) {
            Some(token) => token
                .parse::<f64>()
                .ok()
                .filter(|n| *n >= 0.0 && n.fract() == 0.0)
                .map(|n| n as usize)
                .ok_or_else(|| {
                    QeplotterError::parse(FORMAT, line_no, raw, "invalid segment point count")
                })?,
            None => 0,
        };

        points.push(HighSymmetryPoint {
            label: normalize_label(&label),
            coords,
            k_index,
        });
        k_index += segment;
    }

    Ok(points)
}

/// 拆分坐标部分和 `!label` / `#label` 注释
fn split_label(raw: &str) -> (&str, String) {
    match raw.find(|c: char| c == '!' || c == '#') {
        Some(pos) => (&raw[..pos], raw[pos + 1..].trim().to_string()),
        None => (raw, String::new()),
    }
}

/// Γ 点的常见写法统一为 Γ
fn normalize_label(label: &str) -> String {
    match label.trim_start_matches('\\') {
        "G" | "gG" | "Gamma" | "GAMMA" | "gamma" => "Γ".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crystal_b() {
        let content = r#"
K_POINTS crystal_b
3
  0.0 0.0 0.0 30 !G
  0.5 0.0 0.0 20 !M
  0.333333 0.333333 0.0 1 !K
"#;
        let points = parse_kpath_content(content).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].label, "Γ");
        assert_eq!(points[1].k_index, 30);
        assert_eq!(points[2].k_index, 50);
        assert_eq!(points[2].label, "K");
        assert_eq!(points[1].coords, [0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_parse_inside_pw_input() {
        let content = r#"
&CONTROL
  calculation = 'bands'
/
ATOMIC_SPECIES
  Si 28.086 Si.pbe-n-rrkjus_psl.1.0.0.UPF
K_POINTS {crystal_b}
2
  0.0 0.0 0.0 40 # gG
  0.5 0.5 0.5 # L
"#;
        let points = parse_kpath_content(content).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].label, "Γ");
        assert_eq!(points[1].label, "L");
        assert_eq!(points[1].k_index, 40);
    }

    #[test]
    fn test_missing_points() {
        let content = "3\n0.0 0.0 0.0 10 !G\n";
        assert!(parse_kpath_content(content).is_err());
    }

    #[test]
    fn test_bad_coordinate() {
        let content = "2\n0.0 x 0.0 10 !G\n0.5 0.0 0.0 1 !X\n";
        match parse_kpath_content(content) {
            Err(QeplotterError::ParseError { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
