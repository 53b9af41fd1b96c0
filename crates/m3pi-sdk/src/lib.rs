//! m3pi SDK - m3pi 小车指令调度核心
//!
//! 入站指令经有界队列交给单个调度线程，调度线程按到达顺序逐条执行：
//! 避障、行驶、指示灯、测距和遥测发布。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **协议层** (`protocol`): 入站指令帧解码、遥测载荷编码
//! - **硬件层** (`hal`): 电机、传感器、指示灯、传输的接口与 mock 实现
//! - **驱动层** (`driver`): 指令队列、调度线程、配置与指标
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use m3pi_sdk::prelude::*;
//!
//! # fn hardware() -> Hardware { unimplemented!() }
//! m3pi_sdk::init_logger();
//!
//! let robot = RobotBuilder::new()
//!     .config(RobotConfig::load("m3pi.toml")?)
//!     .build(hardware())?;
//!
//! robot.send_frame(b"19 40")?;
//! robot.send(Command::MoveForward)?;
//! # Ok::<(), DriverError>(())
//! ```

pub use m3pi_driver as driver;
pub use m3pi_hal as hal;
pub use m3pi_protocol as protocol;

mod logging;
pub mod prelude;

pub use logging::{DEFAULT_FILTER, init_logger, init_logger_with};

// --- 用户以此为界 ---
// 以下是通过 Facade Pattern 提供的公共 API

pub use driver::{
    CommandOutcome, CommandSender, ConfigError, Dispatcher, DispatcherConfig, DriverError,
    Hardware, MetricsSnapshot, MotionConfig, Robot, RobotBuilder, RobotConfig,
};
pub use hal::{HalError, SensorCalibration, SharedTransport, TransportError, shared_transport};
pub use protocol::{Command, ProtocolError, Rotation, SensorPosition, Speed, TopicSet};
