//! # m3pi CLI
//!
//! 在 mock 硬件上运行 m3pi 指令调度循环的命令行仿真器。
//!
//! ```bash
//! # 交互式：从标准输入逐行读取指令
//! $ m3pi-cli run
//! 3
//! 9 40
//! speed 60
//! avoid ccw
//! forward
//!
//! # 脚本 + 前方障碍物读数
//! m3pi-cli run --script square.txt --front 10,10,80
//!
//! # 打印默认配置
//! m3pi-cli config show > m3pi.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod commands;
mod input;
mod render;

use commands::{ConfigCommand, RunCommand};

/// m3pi CLI - 指令调度仿真器
#[derive(Parser, Debug)]
#[command(name = "m3pi-cli")]
#[command(about = "Simulate the m3pi rover command loop on mock hardware", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 运行调度循环（标准输入或脚本文件）
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("m3pi_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args } => {
            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();
            ctrlc::set_handler(move || {
                r.store(false, Ordering::SeqCst);
                println!("\n收到退出信号，正在关闭...");
            })?;

            args.execute(&running)
        },

        Commands::Config(cmd) => cmd.execute(),
    }
}
