//! # m3pi Hardware Abstraction Layer
//!
//! 硬件抽象层：电机、模拟距离传感器、指示灯和消息传输的统一接口。
//! 寄存器级访问、网络连接管理都由实现这些 trait 的外部协作方提供。

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// 重新导出协议层类型
pub use m3pi_protocol::{DistanceReading, Message, SensorPosition};

pub mod sensor;

pub use sensor::{DistanceSensor, MAX_RANGE_CM, SensorCalibration};

#[cfg(feature = "mock")]
pub mod mock;

/// 硬件层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] DeviceError),
    #[error("Device not ready")]
    NotReady,
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    Unknown,
    NotFound,
    Busy,
    InvalidResponse,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// 传输层发布错误
///
/// 遥测是尽力而为的：发布方只记录这个错误，不向上传播。
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport not connected")]
    NotConnected,
    #[error("Publish rejected: {0}")]
    Rejected(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

/// 电机运动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    /// 原地左转（逆时针）
    Left,
    /// 原地右转（顺时针）
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// 模拟输入通道
///
/// `read()` 返回归一化的瞬时值（通常为 0.0..=1.0），没有错误路径。
pub trait AnalogInput: Send {
    fn read(&mut self) -> f32;
}

impl<T: AnalogInput + ?Sized> AnalogInput for Box<T> {
    fn read(&mut self) -> f32 {
        (**self).read()
    }
}

/// 差速电机驱动
///
/// `duty` 为归一化占空比（0.0..=1.0）。
pub trait MotorDriver: Send {
    /// 以给定占空比朝 `direction` 运动，直到下一次调用
    fn drive(&mut self, direction: Direction, duty: f32) -> Result<(), HalError>;

    /// 全停
    fn stop(&mut self) -> Result<(), HalError>;
}

/// 可视指示灯（LED）
pub trait Indicator: Send {
    fn set(&mut self, on: bool) -> Result<(), HalError>;
}

/// 消息传输（MQTT 客户端等）
///
/// 连接、重连、保活由实现方负责；这里只暴露一次发布调用。
pub trait Transport: Send {
    fn publish(&mut self, topic: &str, message: &Message) -> Result<(), TransportError>;
}

/// 阻塞等待
///
/// 调度器线程上的所有定长等待都经过这个接口，测试可以替换为不真正休眠的实现。
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// 默认等待实现
///
/// 使用 spin_sleep 提供亚毫秒级精度（相比 std::thread::sleep 的 1-2ms 抖动）。
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinSleeper;

impl Sleeper for SpinSleeper {
    fn sleep(&self, duration: Duration) {
        spin_sleep::sleep(duration);
    }
}

/// 与系统中其他发布者共享的传输句柄
///
/// 互斥锁由传输协作方持有，所有发布方在每次发布前后立即加锁/解锁。
pub type SharedTransport = Arc<Mutex<dyn Transport>>;

/// 把传输实现包装成可共享的句柄
pub fn shared_transport<T: Transport + 'static>(transport: T) -> SharedTransport {
    Arc::new(Mutex::new(transport))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullTransport;

    impl Transport for NullTransport {
        fn publish(&mut self, _topic: &str, _message: &Message) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[test]
    fn test_hal_error_display() {
        let err = HalError::Device(DeviceError::new(DeviceErrorKind::Busy, "motor busy"));
        let msg = err.to_string();
        assert!(msg.contains("Busy") && msg.contains("motor busy"), "{msg}");

        assert_eq!(HalError::NotReady.to_string(), "Device not ready");
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(
            TransportError::NotConnected.to_string(),
            "Transport not connected"
        );
        let err = TransportError::Rejected("broker".into());
        assert!(err.to_string().contains("broker"));
    }

    #[test]
    fn test_shared_transport_is_cloneable_handle() {
        let shared = shared_transport(NullTransport);
        let other = Arc::clone(&shared);
        let message = Message::best_effort(m3pi_protocol::TelemetryPayload::liveness());
        assert!(other.lock().publish("t", &message).is_ok());
        assert_eq!(Arc::strong_count(&shared), 2);
    }

    #[test]
    fn test_spin_sleeper_waits() {
        let start = std::time::Instant::now();
        SpinSleeper.sleep(Duration::from_millis(2));
        assert!(start.elapsed() >= Duration::from_millis(2));
    }
}
