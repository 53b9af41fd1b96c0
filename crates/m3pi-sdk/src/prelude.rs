//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use m3pi_sdk::prelude::*;
//! ```

// 句柄与配置
pub use crate::driver::{Hardware, Robot, RobotBuilder, RobotConfig};

// 指令与遥测
pub use crate::protocol::{Command, Rotation, SensorPosition, Speed, TelemetryPayload};

// 硬件接口（实现自己的设备时使用）
pub use crate::hal::{AnalogInput, Indicator, MotorDriver, Sleeper, Transport};

// 错误类型
pub use crate::driver::{ConfigError, DriverError};
pub use crate::hal::{HalError, TransportError};
pub use crate::protocol::ProtocolError;
