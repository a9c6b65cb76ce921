//! # 数据模型模块
//!
//! 定义投影表、能带和带隙结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `projection/`, `gap/` 和 `commands/` 使用
//! - 子模块: projection, band

pub mod band;
pub mod projection;

pub use band::{BandPoint, BandStructure, GapResult, HighSymmetryPoint};
pub use projection::{
    AtomOrbitalLabel, DensityMode, ParseMode, ProjectionRecord, ProjectionTable, Spin,
    WeightDeviation,
};
