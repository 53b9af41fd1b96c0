//! 机器人配置
//!
//! TOML 格式，所有字段都有默认值；缺失的表按默认值补齐。
//!
//! ```toml
//! queue_capacity = 16
//!
//! [motion]
//! speed = 25
//! avoidance = "cw"
//!
//! [dispatcher]
//! safety_threshold_cm = 26
//! max_avoidance_attempts = 2
//!
//! [sensor]
//! constant = 0.0098
//! unit_scale = 2.54
//!
//! [topics]
//! front = "m3pi-mqtt-ee250/front-distance"
//! ```

use crate::dispatcher::{DispatcherConfig, MAX_AVOIDANCE_ATTEMPTS};
use crate::queue::DEFAULT_QUEUE_CAPACITY;
use crate::state::MotionConfig;
use m3pi_hal::{MAX_RANGE_CM, SensorCalibration};
use m3pi_protocol::TopicSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 完整的机器人配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// 指令队列容量
    pub queue_capacity: usize,
    pub motion: MotionConfig,
    pub dispatcher: DispatcherConfig,
    pub sensor: SensorCalibration,
    pub topics: TopicSet,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            motion: MotionConfig::default(),
            dispatcher: DispatcherConfig::default(),
            sensor: SensorCalibration::default(),
            topics: TopicSet::default(),
        }
    }
}

impl RobotConfig {
    /// 从文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 校验取值范围
    ///
    /// 速度在反序列化时已经校验（`Speed` 只接受 1..=100）。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".into(),
            ));
        }
        let attempts = self.dispatcher.max_avoidance_attempts;
        if !(1..=MAX_AVOIDANCE_ATTEMPTS).contains(&attempts) {
            return Err(ConfigError::Invalid(format!(
                "dispatcher.max_avoidance_attempts must be in 1..={MAX_AVOIDANCE_ATTEMPTS}, got {attempts}"
            )));
        }
        if !(self.sensor.constant.is_finite() && self.sensor.constant > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "sensor.constant must be positive, got {}",
                self.sensor.constant
            )));
        }
        if !(1..=MAX_RANGE_CM).contains(&self.sensor.max_range_cm) {
            return Err(ConfigError::Invalid(format!(
                "sensor.max_range_cm must be in 1..={MAX_RANGE_CM}, got {}",
                self.sensor.max_range_cm
            )));
        }
        if !(self.sensor.unit_scale.is_finite() && self.sensor.unit_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "sensor.unit_scale must be positive, got {}",
                self.sensor.unit_scale
            )));
        }

        let topics = [
            ("liveness", &self.topics.liveness),
            ("front", &self.topics.front),
            ("rear", &self.topics.rear),
        ];
        for (name, topic) in topics {
            if topic.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "topics.{name} must not be empty"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use m3pi_protocol::{Rotation, Speed};
    use std::io::Write;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = RobotConfig::from_toml_str("").unwrap();
        assert_eq!(config, RobotConfig::default());
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.dispatcher.safety_threshold_cm, 26);
        assert_eq!(config.dispatcher.max_avoidance_attempts, 2);
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let config = RobotConfig::from_toml_str(
            r#"
            queue_capacity = 4

            [motion]
            speed = 60
            avoidance = "ccw"

            [dispatcher]
            travel_ms = 1200

            [topics]
            front = "lab/front"
            "#,
        )
        .unwrap();

        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.motion.speed, Speed::new(60).unwrap());
        assert_eq!(config.motion.avoidance, Rotation::Ccw);
        assert_eq!(config.dispatcher.travel_ms, 1200);
        assert_eq!(config.dispatcher.rotate_ms, 250);
        assert_eq!(config.topics.front, "lab/front");
        assert_eq!(config.topics.rear, "m3pi-mqtt-ee250/rear-distance");
        assert_eq!(config.sensor, SensorCalibration::default());
    }

    #[test]
    fn test_out_of_range_speed_rejected() {
        let err = RobotConfig::from_toml_str("[motion]\nspeed = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = RobotConfig::from_toml_str("[dispatcher]\navoidance_speed = 101\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_errors() {
        let err = RobotConfig::from_toml_str("queue_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("queue_capacity")));

        let err =
            RobotConfig::from_toml_str("[dispatcher]\nmax_avoidance_attempts = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = RobotConfig::from_toml_str("[sensor]\nconstant = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("constant")));

        let err = RobotConfig::from_toml_str("[topics]\nrear = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("topics.rear")));
    }

    #[test]
    fn test_avoidance_attempts_bounded() {
        let config =
            RobotConfig::from_toml_str("[dispatcher]\nmax_avoidance_attempts = 1").unwrap();
        assert_eq!(config.dispatcher.max_avoidance_attempts, 1);

        for attempts in [3, 7] {
            let text = format!("[dispatcher]\nmax_avoidance_attempts = {attempts}");
            let err = RobotConfig::from_toml_str(&text).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid(ref msg) if msg.contains("max_avoidance_attempts"))
            );
        }
    }

    #[test]
    fn test_sensor_range_capped_at_three_digits() {
        let config = RobotConfig::from_toml_str("[sensor]\nmax_range_cm = 999").unwrap();
        assert_eq!(config.sensor.max_range_cm, 999);

        for range in [0, 1000, 60000] {
            let text = format!("[sensor]\nmax_range_cm = {range}");
            let err = RobotConfig::from_toml_str(&text).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("max_range_cm")));
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = RobotConfig::default();
        config.motion.speed = Speed::new(42).unwrap();
        config.dispatcher.blink_toggles = 4;

        let text = config.to_toml_string().unwrap();
        assert_eq!(RobotConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[motion]\nspeed = 70").unwrap();

        let config = RobotConfig::load(file.path()).unwrap();
        assert_eq!(config.motion.speed.percent(), 70);

        let err = RobotConfig::load("/nonexistent/m3pi.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
