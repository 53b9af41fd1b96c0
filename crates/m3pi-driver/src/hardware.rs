//! 调度器独占的硬件集合

use m3pi_hal::{AnalogInput, Indicator, MotorDriver, SharedTransport, Sleeper, SpinSleeper};
use std::sync::Arc;

/// 交给调度线程的全部硬件
///
/// 除传输句柄外，所有设备都由调度线程独占。
pub struct Hardware {
    pub motors: Box<dyn MotorDriver>,
    pub indicator: Box<dyn Indicator>,
    pub front: Box<dyn AnalogInput>,
    pub rear: Box<dyn AnalogInput>,
    pub transport: SharedTransport,
    pub sleeper: Arc<dyn Sleeper>,
}

impl Hardware {
    /// 使用默认的 spin_sleep 等待实现
    pub fn new(
        motors: impl MotorDriver + 'static,
        indicator: impl Indicator + 'static,
        front: impl AnalogInput + 'static,
        rear: impl AnalogInput + 'static,
        transport: SharedTransport,
    ) -> Self {
        Self {
            motors: Box::new(motors),
            indicator: Box::new(indicator),
            front: Box::new(front),
            rear: Box::new(rear),
            transport,
            sleeper: Arc::new(SpinSleeper),
        }
    }

    /// 替换等待实现（测试、仿真）
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }
}

#[cfg(any(test, feature = "mock"))]
impl From<m3pi_hal::mock::MockRig> for Hardware {
    fn from(rig: m3pi_hal::mock::MockRig) -> Self {
        Hardware::new(
            rig.motors,
            rig.indicator,
            rig.front,
            rig.rear,
            m3pi_hal::shared_transport(rig.transport),
        )
        .with_sleeper(rig.sleeper)
    }
}

impl std::fmt::Debug for Hardware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hardware").finish_non_exhaustive()
    }
}
