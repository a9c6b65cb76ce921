//! # proj.out → 投影表转换器
//!
//! 将 projwfc.x 原始解析结果规范化为 `ProjectionTable`。
//!
//! ## 算法概述
//! 1. 由调用方标志与表头一次性确定解析模式（共线 / 自旋轨道）
//! 2. 按模式把 state 列映射为 (轨道, 自旋) 并生成轨道标签
//! 3. 逐 k 点、逐能带展开权重，按密度模式输出记录
//! 4. 校验每个 (k, band) 的权重和是否接近 1.0（只报告，不修正）
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs`, `commands/gap.rs` 调用
//! - 使用 `parsers/projwfc.rs` 的原始解析结果
//! - 使用 `models/projection.rs`

use crate::error::{QeplotterError, Result};
use crate::models::{
    AtomOrbitalLabel, DensityMode, ParseMode, ProjectionRecord, ProjectionTable, Spin,
    WeightDeviation,
};
use crate::parsers::projwfc::{self, ProjwfcOutput, StateInfo};

/// 权重和允许的默认偏差
pub const DEFAULT_WEIGHT_TOLERANCE: f64 = 0.05;

const FORMAT: &str = "proj.out";

/// 转换配置
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// 输入是否包含自旋轨道耦合
    pub soc: bool,
    pub density: DensityMode,
    /// 费米能级 (eV)，输出能量相对于此值
    pub fermi: f64,
    pub weight_tolerance: f64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        ConverterConfig {
            soc: false,
            density: DensityMode::Dense,
            fermi: 0.0,
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
        }
    }
}

/// 转换结果
#[derive(Debug, Clone)]
pub struct Conversion {
    pub table: ProjectionTable,
    pub deviations: Vec<WeightDeviation>,
}

/// 投影转换器
pub struct ProjectionConverter {
    config: ConverterConfig,
}

impl ProjectionConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// 转换 proj.out 文本
    pub fn convert(&self, content: &str) -> Result<Conversion> {
        let raw = projwfc::parse_projwfc_content(content)?;
        self.convert_parsed(&raw, content)
    }

    /// 转换已解析的 projwfc 输出
    fn convert_parsed(&self, raw: &ProjwfcOutput, content: &str) -> Result<Conversion> {
        let mode = ParseMode::from_flag(self.config.soc);
        let columns = build_columns(&raw.states, mode, content)?;

        let mut table = ProjectionTable::empty(mode);
        table.labels = columns.labels;
        table.kpoints = raw.kpoints.iter().map(|k| k.coords).collect();

        let num_orbitals = table.labels.len();
        let spins: &[Option<Spin>] = match mode {
            ParseMode::Collinear => &[None],
            ParseMode::SpinOrbit => &[Some(Spin::Up), Some(Spin::Down)],
        };

        let mut deviations = Vec::new();

        for (k_index, kblock) in raw.kpoints.iter().enumerate() {
            for (band_index, band) in kblock.bands.iter().enumerate() {
                // weights[orbital][spin]
                let mut weights = vec![[0.0_f64; 2]; num_orbitals];
                for &(state, w) in &band.components {
                    let (orbital, spin) = columns.routes[state];
                    weights[orbital][spin_slot(spin)] += w;
                }

                let energy = band.energy - self.config.fermi;
                let mut sum = 0.0;

                for (orbital_index, slots) in weights.iter().enumerate() {
                    for &spin in spins {
                        let weight = slots[spin_slot(spin)];
                        sum += weight;
                        if self.config.density == DensityMode::Sparse && weight == 0.0 {
                            continue;
                        }
                        table.records.push(ProjectionRecord {
                            k_index,
                            band_index,
                            orbital_index,
                            spin,
                            energy,
                            weight,
                        });
                    }
                }

                if (sum - 1.0).abs() > self.config.weight_tolerance {
                    deviations.push(WeightDeviation {
                        k_index,
                        band_index,
                        sum,
                    });
                }
            }
        }

        table.records.sort_by_key(|r| r.sort_key());

        Ok(Conversion { table, deviations })
    }
}

fn spin_slot(spin: Option<Spin>) -> usize {
    match spin {
        None | Some(Spin::Up) => 0,
        Some(Spin::Down) => 1,
    }
}

/// state 列到 (轨道, 自旋) 的映射
struct Columns {
    labels: Vec<AtomOrbitalLabel>,
    routes: Vec<(usize, Option<Spin>)>,
}

fn build_columns(states: &[StateInfo], mode: ParseMode, content: &str) -> Result<Columns> {
    match mode {
        ParseMode::Collinear => Ok(Columns {
            labels: states
                .iter()
                .enumerate()
                .map(|(i, s)| make_label(i, s, s.j))
                .collect(),
            routes: (0..states.len()).map(|i| (i, None)).collect(),
        }),
        ParseMode::SpinOrbit if states.iter().any(|s| s.s_z.is_some()) => {
            pair_by_spin(states, content)
        }
        ParseMode::SpinOrbit => pair_adjacent(states, mode, content),
    }
}

fn raw_line(content: &str, line: usize) -> &str {
    content.lines().nth(line.saturating_sub(1)).unwrap_or("")
}

fn state_error(state: &StateInfo, content: &str, reason: impl Into<String>) -> QeplotterError {
    QeplotterError::parse(FORMAT, state.line, raw_line(content, state.line), reason)
}

/// 带 s_z 的 state：按 (atom, wfc, l, m) 配对相反自旋，与出现位置无关
fn pair_by_spin(states: &[StateInfo], content: &str) -> Result<Columns> {
    let mut labels: Vec<AtomOrbitalLabel> = Vec::new();
    let mut keys: Vec<(usize, usize, u8, Option<u8>)> = Vec::new();
    // orbital -> [up 的 state, down 的 state]
    let mut members: Vec<[Option<usize>; 2]> = Vec::new();
    let mut routes = Vec::with_capacity(states.len());

    for (i, state) in states.iter().enumerate() {
        let spin = match state.s_z {
            Some(sz) if sz > 0.0 => Spin::Up,
            Some(sz) if sz < 0.0 => Spin::Down,
            Some(_) => return Err(state_error(state, content, "s_z must be +0.5 or -0.5")),
            None => {
                return Err(state_error(
                    state,
                    content,
                    "state lacks s_z while other states carry it",
                ))
            }
        };

        let key = (state.atom_index, state.wfc, state.l, state.m);
        let orbital = match keys.iter().position(|k| *k == key) {
            Some(o) => o,
            None => {
                keys.push(key);
                members.push([None, None]);
                labels.push(make_label(labels.len(), state, state.j));
                keys.len() - 1
            }
        };

        let slot = &mut members[orbital][spin_slot(Some(spin))];
        if slot.is_some() {
            return Err(state_error(
                state,
                content,
                format!("duplicate {} state for orbital {}", spin, labels[orbital]),
            ));
        }
        *slot = Some(i);
        routes.push((orbital, Some(spin)));
    }

    for (orbital, pair) in members.iter().enumerate() {
        if let [Some(i), None] | [None, Some(i)] = *pair {
            return Err(state_error(
                &states[i],
                content,
                format!(
                    "orbital {} has no opposite-spin partner state",
                    labels[orbital]
                ),
            ));
        }
    }

    Ok(Columns { labels, routes })
}

/// 无 s_z（j 基组）：相邻两个 state 组成一个轨道，前者记为 up
fn pair_adjacent(states: &[StateInfo], mode: ParseMode, content: &str) -> Result<Columns> {
    if states.len() % mode.columns_per_orbital() != 0 {
        let last = &states[states.len() - 1];
        return Err(state_error(
            last,
            content,
            format!(
                "spin-orbit mode needs paired states, header declares {}",
                states.len()
            ),
        ));
    }

    let mut labels = Vec::with_capacity(states.len() / 2);
    let mut routes = Vec::with_capacity(states.len());

    for (orbital, pair) in states.chunks(2).enumerate() {
        let (first, second) = (&pair[0], &pair[1]);
        if first.atom_index != second.atom_index
            || first.wfc != second.wfc
            || first.l != second.l
            || first.m != second.m
            || first.j != second.j
        {
            return Err(state_error(
                second,
                content,
                "spin-orbit state pair spans different orbitals",
            ));
        }

        routes.push((orbital, Some(Spin::Up)));
        routes.push((orbital, Some(Spin::Down)));
        labels.push(make_label(orbital, first, first.j));
    }

    Ok(Columns { labels, routes })
}

fn make_label(orbital_index: usize, state: &StateInfo, j: Option<f64>) -> AtomOrbitalLabel {
    AtomOrbitalLabel {
        orbital_index,
        atom_index: state.atom_index,
        element: state.element.clone(),
        wfc: state.wfc,
        l: state.l,
        m: state.m,
        j,
    }
}
