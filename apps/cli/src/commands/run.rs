//! 运行命令
//!
//! 在 mock 硬件上启动完整的 Robot，逐行读取指令并打印硬件事件。

use crate::{input, render};
use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::RecvTimeoutError;
use m3pi_sdk::hal::mock::{EventLog, MockRig, RecordingSleeper};
use m3pi_sdk::{Hardware, Robot, RobotBuilder, RobotConfig};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 输入线程与主循环之间的缓冲行数
const LINE_BUFFER: usize = 64;

/// 检查退出信号的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 配置文件（TOML），缺省使用内置默认值
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 指令队列容量（覆盖配置文件）
    #[arg(long)]
    pub capacity: Option<usize>,

    /// 指令脚本（每行一条），缺省读取标准输入
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// 前后测距的初始读数（cm）
    #[arg(long, default_value_t = 80)]
    pub clear_cm: u16,

    /// 前方依次返回的距离（cm，逗号分隔），用完后保持最后一个
    #[arg(long, value_delimiter = ',')]
    pub front: Vec<u16>,

    /// 后方依次返回的距离（cm，逗号分隔），用完后保持最后一个
    #[arg(long, value_delimiter = ',')]
    pub rear: Vec<u16>,

    /// 按真实时长等待（默认只记录等待，不休眠）
    #[arg(long)]
    pub real_time: bool,

    /// 打印全部硬件事件（默认只打印发布的遥测）
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunCommand {
    pub fn execute(&self, running: &AtomicBool) -> Result<()> {
        let config = self.load_config()?;
        let (robot, log) = self.start_robot(config)?;
        let lines = self.spawn_reader()?;

        let mut line_no = 0usize;
        while running.load(Ordering::SeqCst) {
            let line = match lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            line_no += 1;
            self.dispatch_line(&robot, &log, line_no, &line)?;
        }

        let metrics = robot.metrics();
        println!(
            "processed {} commands ({} unknown, {} avoidance rotations, {} publish failures)",
            metrics.commands_processed,
            metrics.unknown_opcodes,
            metrics.avoidance_rotations,
            metrics.publish_failures
        );

        robot
            .shutdown()
            .context("dispatcher did not shut down cleanly")?;
        Ok(())
    }

    fn load_config(&self) -> Result<RobotConfig> {
        match &self.config {
            Some(path) => RobotConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => Ok(RobotConfig::default()),
        }
    }

    fn start_robot(&self, config: RobotConfig) -> Result<(Robot, EventLog)> {
        let calibration = config.sensor;
        let mut rig = MockRig::new(calibration, self.clear_cm);
        let log = rig.log.clone();

        let front = rig.front.script();
        for cm in &self.front {
            front.push_distance(*cm, &calibration);
        }
        let rear = rig.rear.script();
        for cm in &self.rear {
            rear.push_distance(*cm, &calibration);
        }
        if self.real_time {
            rig.sleeper = RecordingSleeper::real_time(log.clone());
        }

        let mut builder = RobotBuilder::new().config(config);
        if let Some(capacity) = self.capacity {
            builder = builder.queue_capacity(capacity);
        }
        let robot = builder
            .build(Hardware::from(rig))
            .context("failed to start robot")?;

        info!("Simulator ready (clear distance {} cm)", self.clear_cm);
        Ok((robot, log))
    }

    /// 在独立线程读取输入，主循环可以在等待输入时响应 Ctrl-C
    fn spawn_reader(&self) -> Result<crossbeam_channel::Receiver<String>> {
        let reader: Box<dyn BufRead + Send> = match &self.script {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open script {}", path.display()))?;
                Box::new(BufReader::new(file))
            },
            None => Box::new(BufReader::new(std::io::stdin())),
        };

        let (tx, rx) = crossbeam_channel::bounded(LINE_BUFFER);
        std::thread::Builder::new()
            .name("m3pi-input".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!("Failed to read input: {}", e);
                            break;
                        },
                    };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .context("failed to spawn input thread")?;

        Ok(rx)
    }

    fn dispatch_line(&self, robot: &Robot, log: &EventLog, line_no: usize, line: &str) -> Result<()> {
        let frame = match input::parse_line(line) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(e) => {
                println!("line {line_no}: {e}");
                return Ok(());
            },
        };

        match robot.send_frame(&frame) {
            Ok(command) => debug!("Line {} queued as {:?}", line_no, command),
            Err(e) => {
                println!("line {line_no}: rejected: {e}");
                return Ok(());
            },
        }

        robot
            .wait_idle(self.idle_timeout())
            .with_context(|| format!("line {line_no}: command did not finish"))?;

        for event in log.take() {
            if render::is_visible(&event, self.verbose) {
                println!("{}", render::describe(&event));
            }
        }
        Ok(())
    }

    fn idle_timeout(&self) -> Duration {
        if self.real_time {
            Duration::from_secs(60)
        } else {
            Duration::from_secs(5)
        }
    }
}
