//! # Quantum ESPRESSO projwfc.x 输出解析器
//!
//! 解析 `projwfc.x` 的标准输出 (proj.out)，提取轨道 state 表头和
//! 每个 k 点、每条能带的投影分量。
//!
//! ## proj.out 格式说明
//! ```text
//!      state #   1: atom   1 (Mo ), wfc  1 (l=0 m= 1)
//!      state #   2: atom   1 (Mo ), wfc  2 (l=1 j=0.5 m_j=-0.5)
//!  k =   0.0000000000  0.0000000000  0.0000000000
//! ==== e(   1) =   -50.53372 eV ====
//!      psi = 0.998*[#   1]+0.002*[#   5]+
//!           0.010*[#   7]+
//!     |psi|^2 = 1.000
//! ```
//! 其余行（程序横幅、Lowdin 电荷等）被忽略。
//!
//! ## 依赖关系
//! - 被 `projection/converter.rs` 使用
//! - 使用 `regex` 匹配 state 行与投影分量

use crate::error::{QeplotterError, Result};
use regex::Regex;
use std::sync::OnceLock;

const FORMAT: &str = "proj.out";

/// 表头中的一个原子轨道 state
#[derive(Debug, Clone, PartialEq)]
pub struct StateInfo {
    /// 所在行号（1 起）
    pub line: usize,
    pub atom_index: usize,
    pub element: String,
    pub wfc: usize,
    pub l: u8,
    pub m: Option<u8>,
    pub j: Option<f64>,
    pub m_j: Option<f64>,
    pub s_z: Option<f64>,
}

/// 单条能带的投影数据
#[derive(Debug, Clone, PartialEq)]
pub struct BandBlock {
    pub line: usize,
    /// 绝对能量 (eV)
    pub energy: f64,
    /// (state 序号, 权重)，state 序号 0 起
    pub components: Vec<(usize, f64)>,
    /// 文件中给出的 |psi|^2
    pub psi_norm: Option<f64>,
}

/// 单个 k 点及其能带
#[derive(Debug, Clone, PartialEq)]
pub struct KBlock {
    pub line: usize,
    pub coords: [f64; 3],
    pub bands: Vec<BandBlock>,
}

/// 原始解析结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjwfcOutput {
    pub states: Vec<StateInfo>,
    pub kpoints: Vec<KBlock>,
}

fn state_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^state\s*#\s*(\d+)\s*:\s*atom\s+(\d+)\s*\(\s*([A-Za-z][A-Za-z0-9_]*)\s*\)\s*,\s*wfc\s+(\d+)\s*\((.*)\)$",
        )
        .unwrap()
    })
}

fn quantum_number_regex(name: &str) -> Regex {
    Regex::new(&format!(r"\b{}\s*=\s*(-?\d+(?:\.\d+)?)", name)).unwrap()
}

fn quantum_regexes() -> &'static [Regex; 5] {
    static RE: OnceLock<[Regex; 5]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            quantum_number_regex("l"),
            quantum_number_regex("m"),
            quantum_number_regex("j"),
            quantum_number_regex("m_j"),
            quantum_number_regex("s_z"),
        ]
    })
}

fn band_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^====\s*e\(\s*(\d+)\)\s*=\s*(\S+)\s+eV\s*====$").unwrap())
}

fn component_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d*\.?\d+(?:[eE][-+]?\d+)?)\s*\*\s*\[#\s*(\d+)\s*\]").unwrap()
    })
}

fn float_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+\.\d+(?:[eE][-+]?\d+)?").unwrap())
}

/// 解析 proj.out 文本
pub fn parse_projwfc_content(content: &str) -> Result<ProjwfcOutput> {
    let mut output = ProjwfcOutput::default();
    let mut current_k: Option<KBlock> = None;
    let mut current_band: Option<BandBlock> = None;
    let mut in_psi = false;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            in_psi = false;
            continue;
        }

        if line.starts_with("state #") {
            output.states.push(parse_state_line(line, line_no, raw)?);
            continue;
        }

        if line.starts_with("k =") {
            flush_band(&mut current_k, &mut current_band);
            if let Some(k) = current_k.take() {
                push_kblock(&mut output.kpoints, k, content)?;
            }
            current_k = Some(KBlock {
                line: line_no,
                coords: parse_kpoint_line(line, line_no, raw)?,
                bands: Vec::new(),
            });
            in_psi = false;
            continue;
        }

        if line.starts_with("==== e(") || line.starts_with("e =") {
            let energy = parse_band_line(line, line_no, raw)?;
            if current_k.is_none() {
                return Err(QeplotterError::parse(
                    FORMAT,
                    line_no,
                    raw,
                    "band energy appears before any k-point",
                ));
            }
            flush_band(&mut current_k, &mut current_band);
            current_band = Some(BandBlock {
                line: line_no,
                energy,
                components: Vec::new(),
                psi_norm: None,
            });
            in_psi = false;
            continue;
        }

        if let Some(body) = line.strip_prefix("psi =") {
            let band = current_band.as_mut().ok_or_else(|| {
                QeplotterError::parse(FORMAT, line_no, raw, "projection appears before any band")
            })?;
            parse_components(body, band, output.states.len(), line_no, raw)?;
            in_psi = true;
            continue;
        }

        if line.starts_with("|psi|^2") {
            let band = current_band.as_mut().ok_or_else(|| {
                QeplotterError::parse(FORMAT, line_no, raw, "|psi|^2 appears before any band")
            })?;
            let value = line
                .split('=')
                .nth(1)
                .map(str::trim)
                .and_then(|v| v.parse::<f64>().ok())
                .ok_or_else(|| {
                    QeplotterError::parse(FORMAT, line_no, raw, "non-numeric |psi|^2 value")
                })?;
            band.psi_norm = Some(value);
            in_psi = false;
            continue;
        }

        if in_psi && line.contains("*[#") {
            if let Some(band) = current_band.as_mut() {
                parse_components(line, band, output.states.len(), line_no, raw)?;
            }
            continue;
        }

        in_psi = false;
    }

    flush_band(&mut current_k, &mut current_band);
    if let Some(k) = current_k.take() {
        push_kblock(&mut output.kpoints, k, content)?;
    }

    Ok(output)
}

/// 解析 state 行
fn parse_state_line(line: &str, line_no: usize, raw: &str) -> Result<StateInfo> {
    let caps = state_regex().captures(line).ok_or_else(|| {
        QeplotterError::parse(FORMAT, line_no, raw, "malformed orbital state header")
    })?;

    let number = |i: usize| -> Result<usize> {
        caps[i]
            .parse::<usize>()
            .map_err(|_| QeplotterError::parse(FORMAT, line_no, raw, "invalid integer in state"))
    };

    let atom_index = number(2)?;
    let wfc = number(4)?;
    let element = caps[3].to_string();
    let quantum = &caps[5];

    let [l_re, m_re, j_re, mj_re, sz_re] = quantum_regexes();
    let capture_f64 = |re: &Regex| -> Option<f64> {
        re.captures(quantum)
            .and_then(|c| c.get(1))
            .and_then(|v| v.as_str().parse::<f64>().ok())
    };

    let l = l_re
        .captures(quantum)
        .and_then(|c| c[1].parse::<u8>().ok())
        .ok_or_else(|| QeplotterError::parse(FORMAT, line_no, raw, "missing l quantum number"))?;
    let m = m_re.captures(quantum).and_then(|c| c[1].parse::<u8>().ok());

    Ok(StateInfo {
        line: line_no,
        atom_index,
        element,
        wfc,
        l,
        m,
        j: capture_f64(j_re),
        m_j: capture_f64(mj_re),
        s_z: capture_f64(sz_re),
    })
}

/// 解析 k 点坐标行
fn parse_kpoint_line(line: &str, line_no: usize, raw: &str) -> Result<[f64; 3]> {
    let body = &line[line.find('=').map(|p| p + 1).unwrap_or(0)..];
    let values: Vec<f64> = float_regex()
        .find_iter(body)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    if values.len() != 3 {
        return Err(QeplotterError::parse(
            FORMAT,
            line_no,
            raw,
            format!("expected 3 k-point coordinates, found {}", values.len()),
        ));
    }

    Ok([values[0], values[1], values[2]])
}

/// 解析能带能量行（新旧两种格式）
fn parse_band_line(line: &str, line_no: usize, raw: &str) -> Result<f64> {
    let token = if line.starts_with("====") {
        let caps = band_regex().captures(line).ok_or_else(|| {
            QeplotterError::parse(FORMAT, line_no, raw, "malformed band energy line")
        })?;
        caps[2].to_string()
    } else {
        // "e = -50.53372 eV"
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 4 || parts[3] != "eV" {
            return Err(QeplotterError::parse(
                FORMAT,
                line_no,
                raw,
                format!("expected 4 tokens in band energy line, found {}", parts.len()),
            ));
        }
        parts[2].to_string()
    };

    token
        .parse::<f64>()
        .map_err(|_| QeplotterError::parse(FORMAT, line_no, raw, "non-numeric band energy"))
}

/// 解析 `w*[#n]+...` 投影分量
fn parse_components(
    body: &str,
    band: &mut BandBlock,
    num_states: usize,
    line_no: usize,
    raw: &str,
) -> Result<()> {
    let re = component_regex();

    let leftover = re.replace_all(body, "");
    if leftover.chars().any(|c| !c.is_whitespace() && c != '+') {
        return Err(QeplotterError::parse(
            FORMAT,
            line_no,
            raw,
            "malformed projection component",
        ));
    }

    if num_states == 0 {
        return Err(QeplotterError::parse(
            FORMAT,
            line_no,
            raw,
            "projection data appears before the orbital state header",
        ));
    }

    for caps in re.captures_iter(body) {
        let weight: f64 = caps[1].parse().map_err(|_| {
            QeplotterError::parse(FORMAT, line_no, raw, "non-numeric projection weight")
        })?;
        let state: usize = caps[2].parse().map_err(|_| {
            QeplotterError::parse(FORMAT, line_no, raw, "invalid state index")
        })?;

        if state == 0 || state > num_states {
            return Err(QeplotterError::parse(
                FORMAT,
                line_no,
                raw,
                format!(
                    "component references state #{} but the header declares {} states",
                    state, num_states
                ),
            ));
        }

        let state_idx = state - 1;
        if band.components.iter().any(|(s, _)| *s == state_idx) {
            return Err(QeplotterError::parse(
                FORMAT,
                line_no,
                raw,
                format!("duplicate component for state #{}", state),
            ));
        }
        band.components.push((state_idx, weight));
    }

    Ok(())
}

fn flush_band(current_k: &mut Option<KBlock>, current_band: &mut Option<BandBlock>) {
    if let (Some(k), Some(band)) = (current_k.as_mut(), current_band.take()) {
        k.bands.push(band);
    }
}

/// 追加 k 点并检查各 k 点能带数一致
fn push_kblock(kpoints: &mut Vec<KBlock>, block: KBlock, content: &str) -> Result<()> {
    if let Some(first) = kpoints.first() {
        if first.bands.len() != block.bands.len() {
            let raw = content.lines().nth(block.line - 1).unwrap_or("");
            return Err(QeplotterError::parse(
                FORMAT,
                block.line,
                raw,
                format!(
                    "k-point has {} bands, expected {}",
                    block.bands.len(),
                    first.bands.len()
                ),
            ));
        }
    }
    kpoints.push(block);
    Ok(())
}
