//! # m3pi Protocol
//!
//! 小车指令/遥测的线上格式定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `command`: 入站指令解码（操作码表、调速参数）与编码
//! - `telemetry`: 出站遥测载荷、主题与 QoS
//!
//! ## 入站帧布局
//!
//! ```text
//! byte 0      byte 1        byte 2..
//! [route tag] [opcode char] [ASCII 十进制参数（仅调速指令）]
//! ```

pub mod command;
pub mod telemetry;

// 重新导出常用类型
pub use command::*;
pub use telemetry::*;

use thiserror::Error;

/// 入站指令帧最大长度（字节）
pub const COMMAND_FRAME_SIZE: usize = 8;

/// 入站指令帧
///
/// 由外部输入源（无线/MQTT 订阅回调）填充的定长缓冲区。
///
/// # 设计特性
///
/// - **Copy trait**：帧本身很小，按值在队列中传递
/// - **固定 8 字节**：避免堆分配，超长输入会被截断
///
/// # 示例
///
/// ```rust
/// use m3pi_protocol::CommandFrame;
///
/// let frame = CommandFrame::new(b"19 40");
/// assert_eq!(frame.data_slice(), b"19 40");
/// assert_eq!(frame.opcode_byte(), Some(b'9'));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    /// 帧数据（未使用部分为 0）
    pub data: [u8; COMMAND_FRAME_SIZE],

    /// 有效数据长度 (0-8)
    pub len: u8,
}

impl CommandFrame {
    /// 从原始字节创建帧（超过 8 字节的部分被丢弃）
    pub fn new(data: &[u8]) -> Self {
        let mut fixed = [0u8; COMMAND_FRAME_SIZE];
        let len = data.len().min(COMMAND_FRAME_SIZE);
        fixed[..len].copy_from_slice(&data[..len]);

        Self {
            data: fixed,
            len: len as u8,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 操作码字符（byte 1）
    pub fn opcode_byte(&self) -> Option<u8> {
        self.data_slice().get(1).copied()
    }

    /// 参数字节（byte 2 起）
    pub fn argument(&self) -> &[u8] {
        self.data_slice().get(2..).unwrap_or(&[])
    }
}

/// 协议错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected at least {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid speed argument: {0:?}")]
    InvalidSpeed(String),
}
