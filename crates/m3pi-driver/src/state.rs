//! 运动状态
//!
//! 只有调度线程读写，不加锁。

use m3pi_protocol::{Rotation, Speed};
use serde::{Deserialize, Serialize};

/// 启动时的运动默认值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// 行驶 / 旋转速度（1..=100）
    pub speed: Speed,
    /// 避障旋转方向
    pub avoidance: Rotation,
}

/// 当前运动参数
///
/// 始终保存最近一次显式设置的值，未设置过则为默认值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionState {
    pub speed: Speed,
    pub avoidance: Rotation,
}

impl From<MotionConfig> for MotionState {
    fn from(config: MotionConfig) -> Self {
        Self {
            speed: config.speed,
            avoidance: config.avoidance,
        }
    }
}
