//! Builder 模式实现
//!
//! 提供链式构造 [`Robot`] 的方式。

use crate::config::RobotConfig;
use crate::dispatcher::Dispatcher;
use crate::error::DriverError;
use crate::hardware::Hardware;
use crate::metrics::DispatcherMetrics;
use crate::queue::command_queue;
use crate::robot::{DEFAULT_JOIN_TIMEOUT, Robot};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 调度线程名
pub const DISPATCHER_THREAD_NAME: &str = "m3pi-dispatcher";

/// Robot Builder（链式构造）
///
/// # 示例
///
/// ```rust,no_run
/// use m3pi_driver::{Hardware, RobotBuilder, RobotConfig};
/// use std::time::Duration;
///
/// # fn hardware() -> Hardware { unimplemented!() }
/// let config = RobotConfig::load("m3pi.toml")?;
/// let robot = RobotBuilder::new()
///     .config(config)
///     .queue_capacity(32)
///     .join_timeout(Duration::from_secs(10))
///     .build(hardware())?;
/// # Ok::<(), m3pi_driver::DriverError>(())
/// ```
#[derive(Debug, Default)]
pub struct RobotBuilder {
    config: RobotConfig,
    queue_capacity: Option<usize>,
    join_timeout: Option<Duration>,
}

impl RobotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换配置
    pub fn config(mut self, config: RobotConfig) -> Self {
        self.config = config;
        self
    }

    /// 覆盖队列容量
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// 覆盖停机时的 join 超时
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = Some(timeout);
        self
    }

    /// 校验配置，创建队列并启动调度线程
    pub fn build(self, hardware: Hardware) -> Result<Robot, DriverError> {
        let mut config = self.config;
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        config.validate()?;

        let metrics = Arc::new(DispatcherMetrics::new());
        let (sender, receiver) = command_queue(config.queue_capacity, metrics.clone());
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let mut dispatcher = Dispatcher::new(
            hardware,
            config.motion,
            config.dispatcher,
            config.sensor,
            config.topics,
            metrics.clone(),
        );
        let phase = dispatcher.phase();

        let handle = std::thread::Builder::new()
            .name(DISPATCHER_THREAD_NAME.to_string())
            .spawn(move || {
                #[cfg(feature = "realtime")]
                {
                    use thread_priority::*;

                    match set_current_thread_priority(ThreadPriority::Max) {
                        Ok(_) => info!("Dispatcher thread priority set to MAX (realtime)"),
                        Err(e) => tracing::warn!(
                            "Failed to set dispatcher thread priority: {:?}. \
                            On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                            e
                        ),
                    }
                }

                dispatcher.run(&receiver, &shutdown_rx);
            })
            .map_err(|e| DriverError::DispatcherThread(e.to_string()))?;

        info!(
            "Robot started (queue capacity {}, speed {}, avoidance {})",
            config.queue_capacity, config.motion.speed, config.motion.avoidance
        );

        Ok(Robot::from_parts(
            sender,
            shutdown_tx,
            handle,
            metrics,
            phase,
            self.join_timeout.unwrap_or(DEFAULT_JOIN_TIMEOUT),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use m3pi_hal::SensorCalibration;
    use m3pi_hal::mock::{MockEvent, MockRig};
    use m3pi_protocol::Command;

    #[test]
    fn test_build_rejects_invalid_config() {
        let rig = MockRig::new(SensorCalibration::default(), 80);
        let err = RobotBuilder::new()
            .queue_capacity(0)
            .build(Hardware::from(rig))
            .unwrap_err();
        assert!(matches!(err, DriverError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_build_runs_dispatcher() {
        let rig = MockRig::new(SensorCalibration::default(), 80);
        let log = rig.log.clone();
        let robot = RobotBuilder::new()
            .queue_capacity(4)
            .build(Hardware::from(rig))
            .unwrap();

        assert!(robot.is_running());
        robot.send(Command::PublishLiveness).unwrap();
        robot.wait_idle(Duration::from_secs(2)).unwrap();

        assert_eq!(log.publishes().len(), 1);
        assert!(log.snapshot().iter().all(|e| matches!(e, MockEvent::Publish { .. })));
        assert_eq!(robot.metrics().commands_processed, 1);
        robot.shutdown().unwrap();
    }

    #[test]
    fn test_dispatcher_thread_is_named() {
        let rig = MockRig::new(SensorCalibration::default(), 80);
        let robot = RobotBuilder::new().build(Hardware::from(rig)).unwrap();
        assert_eq!(robot.dispatcher_thread_name(), Some(DISPATCHER_THREAD_NAME));
    }
}
