//! 驱动层错误类型定义

use crate::config::ConfigError;
use m3pi_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 入站帧解码错误（生产者侧）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 指令队列已满
    #[error("Command queue full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    /// 指令通道已关闭（调度线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 配置错误（仅在启动时出现）
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 调度线程错误
    #[error("Dispatcher thread error: {0}")]
    DispatcherThread(String),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,
}
