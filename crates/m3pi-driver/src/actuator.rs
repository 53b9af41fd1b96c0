//! 执行器：电机与指示灯
//!
//! 所有等待都在调用线程（调度线程）上同步进行，没有取消路径。

use crate::metrics::DispatcherMetrics;
use m3pi_hal::{Direction, Indicator, MotorDriver, Sleeper};
use m3pi_protocol::{Rotation, Speed};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, error, warn};

/// 旋转方向对应的电机方向
pub fn rotation_direction(rotation: Rotation) -> Direction {
    match rotation {
        Rotation::Cw => Direction::Right,
        Rotation::Ccw => Direction::Left,
    }
}

/// 电机执行器
pub struct MotionActuator {
    motors: Box<dyn MotorDriver>,
    sleeper: Arc<dyn Sleeper>,
    metrics: Arc<DispatcherMetrics>,
}

impl MotionActuator {
    pub fn new(
        motors: Box<dyn MotorDriver>,
        sleeper: Arc<dyn Sleeper>,
        metrics: Arc<DispatcherMetrics>,
    ) -> Self {
        Self {
            motors,
            sleeper,
            metrics,
        }
    }

    /// 以 `speed` 朝 `direction` 运动 `duration`，然后全停
    ///
    /// 启动失败时仍然等待并停车，保证返回前电机一定处于停止状态。
    pub fn drive(&mut self, direction: Direction, speed: Speed, duration: Duration) {
        debug!(
            "Drive {} at {} for {:?}",
            direction.as_str(),
            speed,
            duration
        );
        if let Err(e) = self.motors.drive(direction, speed.duty()) {
            self.metrics.device_errors.fetch_add(1, Ordering::Relaxed);
            warn!("Motor driver rejected {} command: {}", direction.as_str(), e);
        }
        self.sleeper.sleep(duration);
        self.stop();
    }

    /// 原地旋转（顺时针 = 右转，逆时针 = 左转）
    pub fn rotate(&mut self, rotation: Rotation, speed: Speed, duration: Duration) {
        self.drive(rotation_direction(rotation), speed, duration);
    }

    /// 全停
    pub fn stop(&mut self) {
        if let Err(e) = self.motors.stop() {
            self.metrics.device_errors.fetch_add(1, Ordering::Relaxed);
            error!("Failed to stop motors: {}", e);
        }
    }
}

impl std::fmt::Debug for MotionActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionActuator").finish_non_exhaustive()
    }
}

/// 指示灯执行器
pub struct IndicatorLamp {
    indicator: Box<dyn Indicator>,
    sleeper: Arc<dyn Sleeper>,
    lit: bool,
}

impl IndicatorLamp {
    pub fn new(indicator: Box<dyn Indicator>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            indicator,
            sleeper,
            lit: false,
        }
    }

    /// 点亮 `hold` 后熄灭
    pub fn hold(&mut self, hold: Duration) {
        self.set(true);
        self.sleeper.sleep(hold);
        self.set(false);
    }

    /// 翻转 `toggles` 次，每次间隔 `interval`，结束时熄灭
    pub fn blink(&mut self, toggles: u8, interval: Duration) {
        for _ in 0..toggles {
            self.set(!self.lit);
            self.sleeper.sleep(interval);
        }
        if self.lit {
            self.set(false);
        }
    }

    /// 当前是否点亮
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    fn set(&mut self, on: bool) {
        match self.indicator.set(on) {
            Ok(()) => self.lit = on,
            Err(e) => warn!("Failed to switch indicator {}: {}", if on { "on" } else { "off" }, e),
        }
    }
}

impl std::fmt::Debug for IndicatorLamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorLamp")
            .field("lit", &self.lit)
            .finish_non_exhaustive()
    }
}
