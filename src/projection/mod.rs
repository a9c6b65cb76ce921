//! # 轨道投影模块
//!
//! proj.out 到规范投影表 (.pdos) 的转换、通道分组与导出。
//!
//! ## 子模块
//! - `converter`: 投影转换器
//! - `channels`: 按原子 / 轨道 / 元素-轨道分组
//! - `export`: 文件导出
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs`, `commands/gap.rs` 使用
//! - 使用 `parsers/projwfc.rs`, `parsers/pdos_table.rs`, `models/projection.rs`

pub mod channels;
pub mod converter;
pub mod export;

pub use channels::{group_channels, ChannelMode};
pub use converter::{Conversion, ConverterConfig, ProjectionConverter, DEFAULT_WEIGHT_TOLERANCE};
