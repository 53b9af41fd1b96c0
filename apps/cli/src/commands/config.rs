//! 配置管理命令
//!
//! 打印和校验调度器的 TOML 配置

use anyhow::{Context, Result};
use clap::Subcommand;
use m3pi_sdk::RobotConfig;
use std::path::{Path, PathBuf};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置（缺省为内置默认值）
    Show {
        /// 配置文件路径
        path: Option<PathBuf>,
    },

    /// 校验配置文件
    Check {
        /// 配置文件路径
        path: PathBuf,
    },
}

impl ConfigCommand {
    pub fn execute(&self) -> Result<()> {
        match self {
            ConfigCommand::Show { path } => {
                let config = match path {
                    Some(path) => load(path)?,
                    None => RobotConfig::default(),
                };
                print!("{}", config.to_toml_string()?);
                Ok(())
            },
            ConfigCommand::Check { path } => {
                let config = load(path)?;
                println!(
                    "✅ {} is valid (queue capacity {}, speed {}, avoidance {})",
                    path.display(),
                    config.queue_capacity,
                    config.motion.speed,
                    config.motion.avoidance
                );
                Ok(())
            },
        }
    }
}

fn load(path: &Path) -> Result<RobotConfig> {
    RobotConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
}
