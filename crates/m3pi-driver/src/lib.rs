//! 驱动层模块
//!
//! 本模块提供 m3pi 小车的指令调度功能，包括：
//! - 有界指令队列（多生产者，单消费者）
//! - 调度线程管理（一次只执行一条指令，执行到底）
//! - 避障、行驶、指示灯和遥测发布
//! - TOML 配置与运行指标
//!
//! # 使用场景
//!
//! 大多数用户应该通过 [`RobotBuilder`] 得到 [`Robot`] 句柄；
//! 需要在当前线程同步驱动调度器时（测试、仿真）可以直接使用 [`Dispatcher`]。

pub mod actuator;
mod builder;
pub mod config;
pub mod dispatcher;
mod error;
mod hardware;
pub mod metrics;
pub mod phase;
pub mod publisher;
pub mod queue;
mod robot;
pub mod state;

pub use actuator::{IndicatorLamp, MotionActuator};
pub use builder::{DISPATCHER_THREAD_NAME, RobotBuilder};
pub use config::{ConfigError, RobotConfig};
pub use dispatcher::{CommandOutcome, Dispatcher, DispatcherConfig, MAX_AVOIDANCE_ATTEMPTS};
pub use error::DriverError;
pub use hardware::Hardware;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use phase::{AtomicDispatcherPhase, DispatcherPhase};
pub use publisher::TelemetryPublisher;
pub use queue::{CommandReceiver, CommandSender, DEFAULT_QUEUE_CAPACITY, command_queue};
pub use robot::{DEFAULT_JOIN_TIMEOUT, Robot};
pub use state::{MotionConfig, MotionState};
