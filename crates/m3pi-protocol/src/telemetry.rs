//! 出站遥测格式
//!
//! 距离载荷按 100 cm 分支编码：
//!
//! | 距离 | 载荷 | 长度 |
//! |---|---|---|
//! | `< 100` | 两位补零 + `" cm "` | 6 |
//! | `>= 100` | 数字 + `"cm"` | 三位数时为 5 |

use crate::ProtocolError;
use num_enum::IntoPrimitive;

/// 遥测载荷最大长度（字节）
pub const MAX_PAYLOAD_LEN: usize = 16;

/// 存活消息载荷
pub const LIVENESS_GREETING: &[u8; 2] = b"hi";

/// 两位 / 三位编码的分界（cm）
pub const THREE_DIGIT_THRESHOLD_CM: u16 = 100;

/// 距离传感器位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SensorPosition {
    Front,
    Rear,
}

impl SensorPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorPosition::Front => "front",
            SensorPosition::Rear => "rear",
        }
    }
}

impl std::fmt::Display for SensorPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次距离测量结果（瞬时值，不持久化）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceReading {
    pub position: SensorPosition,
    pub centimeters: u16,
}

impl DistanceReading {
    pub fn new(position: SensorPosition, centimeters: u16) -> Self {
        Self {
            position,
            centimeters,
        }
    }

    /// 是否低于给定的安全阈值
    pub fn is_below(&self, threshold_cm: u16) -> bool {
        self.centimeters < threshold_cm
    }
}

/// 遥测载荷（栈上定长缓冲区，最多 16 字节）
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TelemetryPayload {
    bytes: [u8; MAX_PAYLOAD_LEN],
    len: u8,
}

impl TelemetryPayload {
    /// 存活消息（固定 2 字节 `hi`）
    pub fn liveness() -> Self {
        let mut bytes = [0u8; MAX_PAYLOAD_LEN];
        bytes[..LIVENESS_GREETING.len()].copy_from_slice(LIVENESS_GREETING);
        Self {
            bytes,
            len: LIVENESS_GREETING.len() as u8,
        }
    }

    /// 距离消息
    ///
    /// # 示例
    ///
    /// ```rust
    /// use m3pi_protocol::TelemetryPayload;
    ///
    /// assert_eq!(TelemetryPayload::distance(7).as_bytes(), b"07 cm ");
    /// assert_eq!(TelemetryPayload::distance(123).as_bytes(), b"123cm");
    /// ```
    pub fn distance(centimeters: u16) -> Self {
        let mut payload = Self {
            bytes: [0u8; MAX_PAYLOAD_LEN],
            len: 0,
        };

        if centimeters < THREE_DIGIT_THRESHOLD_CM {
            payload.push_decimal(centimeters, 2);
            payload.push_str(b" cm ");
        } else {
            payload.push_decimal(centimeters, 3);
            payload.push_str(b"cm");
        }

        payload
    }

    /// 有效字节
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 载荷文本（有效字节都是 ASCII 时）
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    // u16 最多 5 位数字 + 4 字节后缀，不会超出 16 字节
    fn push_decimal(&mut self, value: u16, min_digits: usize) {
        let mut digits = [0u8; 5];
        let mut count = 0;
        let mut rest = value;
        loop {
            digits[count] = b'0' + (rest % 10) as u8;
            count += 1;
            rest /= 10;
            if rest == 0 {
                break;
            }
        }
        while count < min_digits {
            digits[count] = b'0';
            count += 1;
        }
        for digit in digits[..count].iter().rev() {
            self.bytes[self.len as usize] = *digit;
            self.len += 1;
        }
    }

    fn push_str(&mut self, suffix: &[u8]) {
        let start = self.len as usize;
        self.bytes[start..start + suffix.len()].copy_from_slice(suffix);
        self.len += suffix.len() as u8;
    }
}

impl std::fmt::Debug for TelemetryPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_str() {
            Some(text) => write!(f, "TelemetryPayload({text:?})"),
            None => write!(f, "TelemetryPayload({:?})", self.as_bytes()),
        }
    }
}

/// MQTT 服务质量等级
///
/// 遥测只使用 QoS 0，发布方不等待确认也不重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive)]
#[repr(u8)]
pub enum QoS {
    /// 至多一次（无确认）
    #[default]
    AtMostOnce = 0,
}

/// 交给传输层的完整消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub qos: QoS,
    pub retained: bool,
    pub dup: bool,
    pub payload: TelemetryPayload,
}

impl Message {
    /// 尽力而为的遥测消息：QoS 0，不保留，非重复
    pub fn best_effort(payload: TelemetryPayload) -> Self {
        Self {
            qos: QoS::AtMostOnce,
            retained: false,
            dup: false,
            payload,
        }
    }
}

/// 遥测主题集合
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TopicSet {
    /// 存活消息主题
    pub liveness: String,
    /// 前方距离主题
    pub front: String,
    /// 后方距离主题
    pub rear: String,
}

impl TopicSet {
    /// 传感器位置对应的主题
    pub fn for_position(&self, position: SensorPosition) -> &str {
        match position {
            SensorPosition::Front => &self.front,
            SensorPosition::Rear => &self.rear,
        }
    }
}

impl Default for TopicSet {
    fn default() -> Self {
        Self {
            liveness: "m3pi-mqtt-ee250/led-thread".to_string(),
            front: "m3pi-mqtt-ee250/front-distance".to_string(),
            rear: "m3pi-mqtt-ee250/rear-distance".to_string(),
        }
    }
}
