//! 机器人句柄（对外 API）

use crate::error::DriverError;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::phase::{AtomicDispatcherPhase, DispatcherPhase};
use crate::queue::CommandSender;
use crossbeam_channel::Sender;
use m3pi_protocol::Command;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{JoinHandle, spawn};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// 停机时等待调度线程的最长时间
///
/// 调度线程只在空闲时响应停机，所以这个值需要覆盖最长的一条指令。
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 由看门狗线程执行 join，本线程带超时等待结果
        spawn(move || {
            let _ = tx.send(self.join().map(|_| ()));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Box::new(
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                ),
            )),
        }
    }
}

/// m3pi 机器人
///
/// 持有指令队列的生产者端和调度线程。Drop 时发送停机信号并等待调度线程退出。
///
/// # 示例
///
/// ```rust,no_run
/// use m3pi_driver::{Hardware, RobotBuilder};
/// use m3pi_protocol::Command;
///
/// # fn hardware() -> Hardware { unimplemented!() }
/// let robot = RobotBuilder::new().build(hardware())?;
/// robot.send(Command::MoveForward)?;
/// robot.send_frame(b"19 40")?;
/// robot.shutdown()?;
/// # Ok::<(), m3pi_driver::DriverError>(())
/// ```
pub struct Robot {
    sender: CommandSender,
    shutdown_tx: Option<Sender<()>>,
    dispatcher_thread: Option<JoinHandle<()>>,
    metrics: Arc<DispatcherMetrics>,
    phase: Arc<AtomicDispatcherPhase>,
    join_timeout: Duration,
}

impl Robot {
    pub(crate) fn from_parts(
        sender: CommandSender,
        shutdown_tx: Sender<()>,
        dispatcher_thread: JoinHandle<()>,
        metrics: Arc<DispatcherMetrics>,
        phase: Arc<AtomicDispatcherPhase>,
        join_timeout: Duration,
    ) -> Self {
        Self {
            sender,
            shutdown_tx: Some(shutdown_tx),
            dispatcher_thread: Some(dispatcher_thread),
            metrics,
            phase,
            join_timeout,
        }
    }

    /// 非阻塞提交一条指令
    pub fn send(&self, command: Command) -> Result<(), DriverError> {
        self.sender.enqueue(command)
    }

    /// 解码并提交一个入站帧
    pub fn send_frame(&self, bytes: &[u8]) -> Result<Command, DriverError> {
        self.sender.enqueue_frame(bytes)
    }

    /// 额外的生产者句柄（可发送到其他线程）
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    /// 指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 调度器当前阶段
    pub fn phase(&self) -> DispatcherPhase {
        self.phase.get(Ordering::Acquire)
    }

    /// 排队中的指令数
    pub fn queued(&self) -> usize {
        self.sender.len()
    }

    /// 等待所有已入队的指令执行完成
    pub fn wait_idle(&self, timeout: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            let enqueued = self.metrics.commands_enqueued.load(Ordering::Acquire);
            let processed = self.metrics.commands_processed.load(Ordering::Acquire);
            if processed >= enqueued {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// 调度线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.dispatcher_thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 调度线程名
    pub fn dispatcher_thread_name(&self) -> Option<&str> {
        self.dispatcher_thread
            .as_ref()
            .and_then(|handle| handle.thread().name())
    }

    /// 优雅停机
    ///
    /// 正在执行的指令会先完成；队列中尚未开始的指令被丢弃。
    pub fn shutdown(mut self) -> Result<(), DriverError> {
        self.stop_dispatcher()
    }

    fn stop_dispatcher(&mut self) -> Result<(), DriverError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            // 调度线程已退出时发送失败，无需处理
            let _ = shutdown_tx.try_send(());
        }

        let Some(handle) = self.dispatcher_thread.take() else {
            return Ok(());
        };

        match handle.join_timeout(self.join_timeout) {
            Ok(()) => {
                info!("Dispatcher thread stopped");
                Ok(())
            },
            Err(_) => {
                error!(
                    "Dispatcher thread panicked or failed to shut down within {:?}",
                    self.join_timeout
                );
                Err(DriverError::DispatcherThread(
                    "failed to join dispatcher thread".into(),
                ))
            },
        }
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        // 错误已在 stop_dispatcher 中记录
        let _ = self.stop_dispatcher();
    }
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("phase", &self.phase())
            .field("queued", &self.queued())
            .finish_non_exhaustive()
    }
}
