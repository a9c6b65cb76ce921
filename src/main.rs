//! # QEPlotter - Quantum ESPRESSO 后处理工具箱
//!
//! 将 projwfc.x 的轨道投影输出整理成规范表格，并从能带数据判定带隙。
//!
//! ## 子命令
//! - `convert` - proj.out → .pdos.csv 投影表（单文件 / 批量目录）
//! - `gap`     - VBM / CBM 与直接、间接带隙判定
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── batch/      (批量并行处理)
//!   │     ├── projection/ (投影转换与导出)
//!   │     ├── gap/        (带隙检测)
//!   │     ├── parsers/    (格式解析器)
//!   │     └── models/     (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod gap;
mod models;
mod parsers;
mod projection;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
