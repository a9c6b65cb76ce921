//! # 带隙分析模块
//!
//! 从能带数据判定 VBM / CBM 与带隙类型。
//!
//! ## 子模块
//! - `detector`: 带隙检测器
//!
//! ## 依赖关系
//! - 被 `commands/gap.rs` 使用
//! - 使用 `models/band.rs`

pub mod detector;

pub use detector::{GapDetector, DEFAULT_GAP_TOLERANCE};
