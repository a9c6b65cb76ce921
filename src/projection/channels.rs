//! # 投影通道分组
//!
//! 按原子、轨道或元素-轨道汇总投影权重，用于 fatband / PDOS 绘图数据。
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs` 使用
//! - 使用 `models/projection.rs`

use crate::models::{AtomOrbitalLabel, ProjectionTable};

use clap::ValueEnum;
use std::collections::BTreeMap;
use std::fmt;

/// 分组方式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ChannelMode {
    /// Per atom (e.g. Mo1)
    Atomic,
    /// Per orbital type (e.g. d)
    Orbital,
    /// Per element and orbital type (e.g. Mo-d)
    ElementOrbital,
}

impl ChannelMode {
    /// 轨道所属通道名
    pub fn key(&self, label: &AtomOrbitalLabel) -> String {
        match self {
            ChannelMode::Atomic => label.atom_label(),
            ChannelMode::Orbital => label.orbital(),
            ChannelMode::ElementOrbital => label.element_orbital(),
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelMode::Atomic => write!(f, "atomic"),
            ChannelMode::Orbital => write!(f, "orbital"),
            ChannelMode::ElementOrbital => write!(f, "element-orbital"),
        }
    }
}

/// 通道中的一个数据点
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPoint {
    pub k_index: usize,
    pub band_index: usize,
    pub energy: f64,
    pub weight: f64,
}

/// 单个通道的权重序列
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSeries {
    pub name: String,
    pub points: Vec<ChannelPoint>,
}

/// 按通道汇总权重（自旋通道一并求和）
pub fn group_channels(table: &ProjectionTable, mode: ChannelMode) -> Vec<ChannelSeries> {
    // 通道按标签首次出现顺序排列
    let mut names: Vec<String> = Vec::new();
    let mut channel_of = Vec::with_capacity(table.labels.len());
    for label in &table.labels {
        let key = mode.key(label);
        let idx = match names.iter().position(|n| *n == key) {
            Some(i) => i,
            None => {
                names.push(key);
                names.len() - 1
            }
        };
        channel_of.push(idx);
    }

    let mut sums: Vec<BTreeMap<(usize, usize), (f64, f64)>> = vec![BTreeMap::new(); names.len()];
    for r in &table.records {
        let Some(&channel) = channel_of.get(r.orbital_index) else {
            continue;
        };
        let entry = sums[channel]
            .entry((r.k_index, r.band_index))
            .or_insert((r.energy, 0.0));
        entry.1 += r.weight;
    }

    names
        .into_iter()
        .zip(sums)
        .map(|(name, points)| ChannelSeries {
            name,
            points: points
                .into_iter()
                .map(|((k_index, band_index), (energy, weight))| ChannelPoint {
                    k_index,
                    band_index,
                    energy,
                    weight,
                })
                .collect(),
        })
        .collect()
}
