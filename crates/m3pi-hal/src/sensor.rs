//! 模拟距离传感器
//!
//! `centimeters = round(raw / constant * unit_scale)`，结果截断到 `0..=max_range_cm`。
//! 负值和非有限值记为 0（避障逻辑会把它当作“被挡住”）。

use crate::AnalogInput;
use m3pi_protocol::{DistanceReading, SensorPosition};
use tracing::trace;

/// 量程上限的最大取值（cm），保证距离负载不超过 3 位数字
pub const MAX_RANGE_CM: u16 = 999;

/// 传感器标定参数（由传感器型号给定）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorCalibration {
    /// 每英寸对应的归一化读数
    pub constant: f32,
    /// 单位换算（英寸 → 厘米）
    pub unit_scale: f32,
    /// 量程上限（cm）
    pub max_range_cm: u16,
}

impl Default for SensorCalibration {
    fn default() -> Self {
        Self {
            constant: 0.0098,
            unit_scale: 2.54,
            max_range_cm: MAX_RANGE_CM,
        }
    }
}

impl SensorCalibration {
    /// 原始读数 → 厘米
    pub fn to_centimeters(&self, raw: f32) -> u16 {
        let cap = self.max_range_cm.min(MAX_RANGE_CM);
        let cm = (raw / self.constant * self.unit_scale).round();
        if !cm.is_finite() || cm <= 0.0 {
            0
        } else if cm >= f32::from(cap) {
            cap
        } else {
            cm as u16
        }
    }

    /// 厘米 → 原始读数（仿真与测试用的反函数）
    pub fn raw_for(&self, centimeters: u16) -> f32 {
        f32::from(centimeters) / self.unit_scale * self.constant
    }
}

/// 一个安装位置上的距离传感器
pub struct DistanceSensor {
    position: SensorPosition,
    input: Box<dyn AnalogInput>,
    calibration: SensorCalibration,
}

impl DistanceSensor {
    pub fn new(
        position: SensorPosition,
        input: impl AnalogInput + 'static,
        calibration: SensorCalibration,
    ) -> Self {
        Self {
            position,
            input: Box::new(input),
            calibration,
        }
    }

    pub fn position(&self) -> SensorPosition {
        self.position
    }

    pub fn calibration(&self) -> &SensorCalibration {
        &self.calibration
    }

    /// 读取一次距离
    pub fn read(&mut self) -> DistanceReading {
        let raw = self.input.read();
        let centimeters = self.calibration.to_centimeters(raw);
        trace!(
            "{} sensor: raw={:.4}, distance={} cm",
            self.position, raw, centimeters
        );
        DistanceReading::new(self.position, centimeters)
    }
}

impl std::fmt::Debug for DistanceSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceSensor")
            .field("position", &self.position)
            .field("calibration", &self.calibration)
            .finish_non_exhaustive()
    }
}
