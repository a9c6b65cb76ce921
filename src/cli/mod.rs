//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `convert`: proj.out → .pdos 投影表转换
//! - `gap`: 能带带隙分析
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: convert, gap

pub mod convert;
pub mod gap;

use clap::{Parser, Subcommand};

/// QEPlotter - Quantum ESPRESSO 后处理工具箱
#[derive(Parser)]
#[command(name = "qeplotter")]
#[command(version)]
#[command(about = "Quantum ESPRESSO projection converter and band gap toolkit", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Convert projwfc.x output (proj.out) into orbital projection tables
    Convert(convert::ConvertArgs),

    /// Detect the band gap (VBM, CBM, direct/indirect) from band data
    Gap(gap::GapArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap::DEFAULT_GAP_TOLERANCE;
    use crate::projection::ChannelMode;

    #[test]
    fn test_parse_convert_args() {
        let cli = Cli::try_parse_from([
            "qeplotter",
            "convert",
            "proj.out",
            "--soc",
            "--fermi",
            "5.2",
            "--split-by",
            "element-orbital",
        ])
        .unwrap();

        match cli.command {
            Commands::Convert(args) => {
                assert!(args.soc);
                assert_eq!(args.fermi, 5.2);
                assert_eq!(args.split_by, Some(ChannelMode::ElementOrbital));
                assert!(!args.sparse);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_fermi_env_only_applies_to_convert() {
        std::env::set_var("QEPLOTTER_FERMI", "3.5");
        let convert = Cli::try_parse_from(["qeplotter", "convert", "proj.out"]).unwrap();
        let gap = Cli::try_parse_from(["qeplotter", "gap", "MoS2.pdos.csv"]).unwrap();
        std::env::remove_var("QEPLOTTER_FERMI");

        match (convert.command, gap.command) {
            (Commands::Convert(c), Commands::Gap(g)) => {
                assert_eq!(c.fermi, 3.5);
                assert_eq!(g.fermi, 0.0);
            }
            _ => panic!("unexpected subcommands"),
        }
    }

    #[test]
    fn test_parse_gap_defaults() {
        let cli = Cli::try_parse_from(["qeplotter", "gap", "bands.dat.gnu"]).unwrap();
        match cli.command {
            Commands::Gap(args) => {
                assert_eq!(args.tolerance, DEFAULT_GAP_TOLERANCE);
                assert_eq!(args.format, gap::BandFormat::Auto);
                assert!(args.kpath.is_none());
            }
            _ => panic!("expected gap"),
        }
    }
}
