//! 入站指令定义
//!
//! 操作码是一个封闭的字符表（`'0'`..`'9'`），表外的字符解码为 [`Command::Unknown`]，
//! 由调度器记录后忽略。

use crate::{COMMAND_FRAME_SIZE, CommandFrame, ProtocolError};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 生产者编码指令时写入 byte 0 的路由标记
pub const ROUTE_TAG: u8 = b'1';

/// 操作码字符（byte 1）
///
/// 取值即 ASCII 字符：`0x30` = `'0'` ... `0x39` = `'9'`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    /// `'0'`：发布存活消息
    PublishLiveness = 0x30,
    /// `'1'`：指示灯亮 1 秒
    IndicatorOn = 0x31,
    /// `'2'`：指示灯快闪（10 次翻转，间隔 0.1 秒）
    IndicatorBlink = 0x32,
    /// `'3'`：前进（带避障）
    MoveForward = 0x33,
    /// `'4'`：后退（带避障）
    MoveBackward = 0x34,
    /// `'5'`：原地顺时针旋转
    RotateCw = 0x35,
    /// `'6'`：原地逆时针旋转
    RotateCcw = 0x36,
    /// `'7'`：避障方向设为顺时针
    AvoidCw = 0x37,
    /// `'8'`：避障方向设为逆时针
    AvoidCcw = 0x38,
    /// `'9'`：根据后续 ASCII 整数设置速度
    SetSpeed = 0x39,
}

impl Opcode {
    /// 操作码字符
    pub fn as_char(self) -> char {
        char::from(u8::from(self))
    }
}

/// 原地旋转方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Rotation {
    /// 顺时针（向右）
    #[default]
    Cw,
    /// 逆时针（向左）
    Ccw,
}

impl Rotation {
    pub fn as_str(self) -> &'static str {
        match self {
            Rotation::Cw => "cw",
            Rotation::Ccw => "ccw",
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 行驶速度（百分比，1..=100）
///
/// 构造时校验范围，之后任何持有 `Speed` 的地方都无需再检查。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Speed(u8);

impl Speed {
    pub const MIN: Speed = Speed(1);
    pub const MAX: Speed = Speed(100);

    /// 创建速度值，超出 1..=100 返回错误
    pub fn new(percent: u8) -> Result<Self, ProtocolError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&percent) {
            Ok(Self(percent))
        } else {
            Err(ProtocolError::InvalidSpeed(percent.to_string()))
        }
    }

    /// 百分比值
    pub fn percent(self) -> u8 {
        self.0
    }

    /// 归一化占空比（0.0..=1.0），电机驱动使用
    pub fn duty(self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

impl Default for Speed {
    /// 巡航速度 25%
    fn default() -> Self {
        Self(25)
    }
}

impl TryFrom<u8> for Speed {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Speed> for u8 {
    fn from(speed: Speed) -> Self {
        speed.0
    }
}

impl std::fmt::Display for Speed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// 解码后的指令
///
/// 入队后不可变；调度器通过一个穷尽的 `match` 分发。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PublishLiveness,
    IndicatorOn,
    IndicatorBlink,
    MoveForward,
    MoveBackward,
    RotateCw,
    RotateCcw,
    /// 设置避障旋转方向
    SetAvoidance(Rotation),
    /// 设置行驶速度
    SetSpeed(Speed),
    /// 表外操作码（原始字节）
    Unknown(u8),
}

impl Command {
    /// 从原始入站缓冲区解码
    ///
    /// # 错误
    /// - `InvalidLength`: 缓冲区不足 2 字节（没有操作码）
    /// - `InvalidSpeed`: 调速指令缺少数字或数值不在 1..=100
    ///
    /// # 示例
    ///
    /// ```rust
    /// use m3pi_protocol::{Command, Speed};
    ///
    /// let cmd = Command::decode(b"19 40").unwrap_or(Command::Unknown(0));
    /// assert_eq!(cmd, Command::SetSpeed(Speed::new(40).unwrap()));
    /// ```
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::try_from(&CommandFrame::new(bytes))
    }

    /// 对应的操作码（`Unknown` 返回 `None`）
    pub fn opcode(&self) -> Option<Opcode> {
        let opcode = match self {
            Command::PublishLiveness => Opcode::PublishLiveness,
            Command::IndicatorOn => Opcode::IndicatorOn,
            Command::IndicatorBlink => Opcode::IndicatorBlink,
            Command::MoveForward => Opcode::MoveForward,
            Command::MoveBackward => Opcode::MoveBackward,
            Command::RotateCw => Opcode::RotateCw,
            Command::RotateCcw => Opcode::RotateCcw,
            Command::SetAvoidance(Rotation::Cw) => Opcode::AvoidCw,
            Command::SetAvoidance(Rotation::Ccw) => Opcode::AvoidCcw,
            Command::SetSpeed(_) => Opcode::SetSpeed,
            Command::Unknown(_) => return None,
        };
        Some(opcode)
    }

    /// byte 1 上的选择字节
    pub fn selector(&self) -> u8 {
        match self {
            Command::Unknown(raw) => *raw,
            other => other.opcode().map(u8::from).unwrap_or_default(),
        }
    }

    /// 编码为入站帧布局（供生产者和测试使用）
    pub fn to_frame(&self) -> CommandFrame {
        let mut bytes = [0u8; COMMAND_FRAME_SIZE];
        bytes[0] = ROUTE_TAG;
        bytes[1] = self.selector();
        let mut len = 2;

        if let Command::SetSpeed(speed) = self {
            let digits = speed.percent().to_string();
            let digits = digits.as_bytes();
            bytes[2..2 + digits.len()].copy_from_slice(digits);
            len += digits.len();
        }

        CommandFrame::new(&bytes[..len])
    }
}

impl TryFrom<&CommandFrame> for Command {
    type Error = ProtocolError;

    fn try_from(frame: &CommandFrame) -> Result<Self, Self::Error> {
        let Some(selector) = frame.opcode_byte() else {
            return Err(ProtocolError::InvalidLength {
                expected: 2,
                actual: frame.len as usize,
            });
        };

        let Ok(opcode) = Opcode::try_from(selector) else {
            return Ok(Command::Unknown(selector));
        };

        let command = match opcode {
            Opcode::PublishLiveness => Command::PublishLiveness,
            Opcode::IndicatorOn => Command::IndicatorOn,
            Opcode::IndicatorBlink => Command::IndicatorBlink,
            Opcode::MoveForward => Command::MoveForward,
            Opcode::MoveBackward => Command::MoveBackward,
            Opcode::RotateCw => Command::RotateCw,
            Opcode::RotateCcw => Command::RotateCcw,
            Opcode::AvoidCw => Command::SetAvoidance(Rotation::Cw),
            Opcode::AvoidCcw => Command::SetAvoidance(Rotation::Ccw),
            Opcode::SetSpeed => Command::SetSpeed(parse_speed(frame.argument())?),
        };

        Ok(command)
    }
}

/// 解析调速参数
///
/// 跳过前导空格，读取连续的 ASCII 数字，遇到第一个非数字字节（通常是 NUL）停止。
fn parse_speed(argument: &[u8]) -> Result<Speed, ProtocolError> {
    let invalid = || ProtocolError::InvalidSpeed(String::from_utf8_lossy(argument).into_owned());

    let digits: Vec<u8> = argument
        .iter()
        .copied()
        .skip_while(|b| *b == b' ')
        .take_while(u8::is_ascii_digit)
        .collect();

    if digits.is_empty() {
        return Err(invalid());
    }

    // 最多 6 位数字（帧长 8），u32 不会溢出
    let value = digits
        .iter()
        .fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'));

    u8::try_from(value)
        .ok()
        .and_then(|v| Speed::new(v).ok())
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn speed(value: u8) -> Speed {
        Speed::new(value).unwrap()
    }

    #[test]
    fn test_opcode_table() {
        let table: [(u8, Command); 9] = [
            (b'0', Command::PublishLiveness),
            (b'1', Command::IndicatorOn),
            (b'2', Command::IndicatorBlink),
            (b'3', Command::MoveForward),
            (b'4', Command::MoveBackward),
            (b'5', Command::RotateCw),
            (b'6', Command::RotateCcw),
            (b'7', Command::SetAvoidance(Rotation::Cw)),
            (b'8', Command::SetAvoidance(Rotation::Ccw)),
        ];

        for (selector, expected) in table {
            let decoded = Command::decode(&[ROUTE_TAG, selector]).unwrap();
            assert_eq!(decoded, expected, "selector {}", selector as char);
        }
    }

    #[test]
    fn test_set_speed_decoding() {
        assert_eq!(Command::decode(b"x940").unwrap(), Command::SetSpeed(speed(40)));
        assert_eq!(Command::decode(b"x9100").unwrap(), Command::SetSpeed(speed(100)));
        assert_eq!(Command::decode(b"x9 7").unwrap(), Command::SetSpeed(speed(7)));
        // NUL 终止
        assert_eq!(
            Command::decode(&[b'x', b'9', b'5', b'5', 0, b'9']).unwrap(),
            Command::SetSpeed(speed(55))
        );
    }

    #[test]
    fn test_set_speed_rejects_invalid_argument() {
        assert!(matches!(
            Command::decode(b"x9"),
            Err(ProtocolError::InvalidSpeed(_))
        ));
        assert!(matches!(
            Command::decode(b"x9abc"),
            Err(ProtocolError::InvalidSpeed(_))
        ));
        assert!(matches!(
            Command::decode(b"x90"),
            Err(ProtocolError::InvalidSpeed(_))
        ));
        assert!(matches!(
            Command::decode(b"x9101"),
            Err(ProtocolError::InvalidSpeed(_))
        ));
        assert!(matches!(
            Command::decode(b"x9999999"),
            Err(ProtocolError::InvalidSpeed(_))
        ));
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(Command::decode(b"xA").unwrap(), Command::Unknown(b'A'));
        assert_eq!(Command::decode(&[0, 0]).unwrap(), Command::Unknown(0));
        assert_eq!(Command::Unknown(b'Z').opcode(), None);
        assert_eq!(Command::Unknown(b'Z').selector(), b'Z');
    }

    #[test]
    fn test_short_buffer() {
        assert_eq!(
            Command::decode(b"x"),
            Err(ProtocolError::InvalidLength {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_to_frame_layout() {
        let frame = Command::MoveForward.to_frame();
        assert_eq!(frame.data_slice(), &[ROUTE_TAG, b'3']);

        let frame = Command::SetSpeed(speed(40)).to_frame();
        assert_eq!(frame.data_slice(), &[ROUTE_TAG, b'9', b'4', b'0']);

        let frame = Command::SetAvoidance(Rotation::Ccw).to_frame();
        assert_eq!(frame.opcode_byte(), Some(b'8'));
    }

    #[test]
    fn test_speed_bounds() {
        assert!(Speed::new(0).is_err());
        assert!(Speed::new(101).is_err());
        assert_eq!(Speed::MIN.percent(), 1);
        assert_eq!(Speed::MAX.percent(), 100);
        assert!((speed(25).duty() - 0.25).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn prop_every_frame_decodes_or_reports(bytes in proptest::collection::vec(any::<u8>(), 0..12)) {
            // 任意输入都不会 panic；只有长度和调速参数会报错
            match Command::decode(&bytes) {
                Ok(_) => prop_assert!(bytes.len() >= 2),
                Err(ProtocolError::InvalidLength { .. }) => prop_assert!(bytes.len() < 2),
                Err(ProtocolError::InvalidSpeed(_)) => prop_assert_eq!(bytes[1], b'9'),
            }
        }

        #[test]
        fn prop_valid_speed_survives_frame_encoding(value in 1u8..=100) {
            let cmd = Command::SetSpeed(Speed::new(value).unwrap());
            prop_assert_eq!(Command::try_from(&cmd.to_frame()).unwrap(), cmd);
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_rotation_serde_lowercase() {
        let json = serde_json::to_string(&Rotation::Ccw).unwrap();
        assert_eq!(json, "\"ccw\"");
        let speed: Speed = serde_json::from_str("40").unwrap();
        assert_eq!(speed.percent(), 40);
        assert!(serde_json::from_str::<Speed>("0").is_err());
    }
}
