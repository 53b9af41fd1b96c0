//! Mock 硬件
//!
//! 所有 mock 设备写入同一个有序事件日志 [`EventLog`]，测试可以断言
//! “旋转 → 等待 → 旋转 → 前进 → 发布”这样的跨设备顺序。

use crate::{AnalogInput, Direction, HalError, Indicator, MotorDriver, Sleeper, Transport};
use crate::{DeviceError, DeviceErrorKind, SensorCalibration, TransportError};
use m3pi_protocol::{Message, QoS, SensorPosition};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 一次硬件交互
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Drive { direction: Direction, duty: f32 },
    Stop,
    Indicator(bool),
    Sleep(Duration),
    SensorRead(SensorPosition),
    Publish {
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
        retained: bool,
        dup: bool,
    },
}

/// 共享的有序事件日志
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<MockEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: MockEvent) {
        self.events.lock().push(event);
    }

    /// 复制当前所有事件
    pub fn snapshot(&self) -> Vec<MockEvent> {
        self.events.lock().clone()
    }

    /// 取出并清空所有事件
    pub fn take(&self) -> Vec<MockEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// 只保留发布事件（topic, payload）
    pub fn publishes(&self) -> Vec<(String, Vec<u8>)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                MockEvent::Publish { topic, payload, .. } => Some((topic.clone(), payload.clone())),
                _ => None,
            })
            .collect()
    }
}

/// 脚本化的模拟输入
///
/// 按顺序返回脚本中的读数；脚本耗尽后重复最后一个值。
pub struct ScriptedAnalogInput {
    position: SensorPosition,
    script: AnalogScript,
    log: EventLog,
}

impl ScriptedAnalogInput {
    pub fn new(position: SensorPosition, initial: f32, log: EventLog) -> Self {
        Self {
            position,
            script: AnalogScript::new(initial),
            log,
        }
    }

    /// 用于在测试线程中追加读数的句柄
    pub fn script(&self) -> AnalogScript {
        self.script.clone()
    }
}

impl AnalogInput for ScriptedAnalogInput {
    fn read(&mut self) -> f32 {
        self.log.push(MockEvent::SensorRead(self.position));
        self.script.next()
    }
}

#[derive(Debug)]
struct ScriptState {
    queue: VecDeque<f32>,
    last: f32,
}

/// 模拟输入的脚本句柄（可跨线程克隆）
#[derive(Debug, Clone)]
pub struct AnalogScript {
    state: Arc<Mutex<ScriptState>>,
}

impl AnalogScript {
    fn new(initial: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                queue: VecDeque::new(),
                last: initial,
            })),
        }
    }

    /// 追加一个原始读数
    pub fn push_raw(&self, raw: f32) {
        self.state.lock().queue.push_back(raw);
    }

    /// 按标定参数追加一个距离读数
    pub fn push_distance(&self, centimeters: u16, calibration: &SensorCalibration) {
        self.push_raw(calibration.raw_for(centimeters));
    }

    /// 清空脚本并固定为一个常量读数
    pub fn set_constant(&self, raw: f32) {
        let mut state = self.state.lock();
        state.queue.clear();
        state.last = raw;
    }

    fn next(&self) -> f32 {
        let mut state = self.state.lock();
        if let Some(raw) = state.queue.pop_front() {
            state.last = raw;
        }
        state.last
    }
}

/// 故障注入开关
#[derive(Debug, Clone, Default)]
pub struct FaultSwitch {
    failing: Arc<AtomicBool>,
}

impl FaultSwitch {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::Relaxed)
    }
}

/// 记录指令的电机驱动
///
/// 故障开关打开时 `drive()` 返回错误（仍会记录），`stop()` 始终成功。
pub struct MockMotorDriver {
    log: EventLog,
    faults: FaultSwitch,
}

impl MockMotorDriver {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            faults: FaultSwitch::default(),
        }
    }

    pub fn faults(&self) -> FaultSwitch {
        self.faults.clone()
    }
}

impl MotorDriver for MockMotorDriver {
    fn drive(&mut self, direction: Direction, duty: f32) -> Result<(), HalError> {
        self.log.push(MockEvent::Drive { direction, duty });
        if self.faults.is_failing() {
            return Err(DeviceError::new(DeviceErrorKind::Busy, "mock motor fault").into());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HalError> {
        self.log.push(MockEvent::Stop);
        Ok(())
    }
}

/// 记录状态的指示灯
pub struct MockIndicator {
    log: EventLog,
}

impl MockIndicator {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl Indicator for MockIndicator {
    fn set(&mut self, on: bool) -> Result<(), HalError> {
        self.log.push(MockEvent::Indicator(on));
        Ok(())
    }
}

/// 记录发布的传输
pub struct MockTransport {
    log: EventLog,
    faults: FaultSwitch,
}

impl MockTransport {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            faults: FaultSwitch::default(),
        }
    }

    pub fn faults(&self) -> FaultSwitch {
        self.faults.clone()
    }
}

impl Transport for MockTransport {
    fn publish(&mut self, topic: &str, message: &Message) -> Result<(), TransportError> {
        if self.faults.is_failing() {
            return Err(TransportError::NotConnected);
        }
        self.log.push(MockEvent::Publish {
            topic: topic.to_string(),
            payload: message.payload.as_bytes().to_vec(),
            qos: message.qos,
            retained: message.retained,
            dup: message.dup,
        });
        Ok(())
    }
}

/// 记录等待的 Sleeper
///
/// 默认不真正休眠；`real_time()` 版本在记录后按实际时长等待（仿真器使用）。
#[derive(Debug, Clone)]
pub struct RecordingSleeper {
    log: EventLog,
    real_time: bool,
}

impl RecordingSleeper {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            real_time: false,
        }
    }

    pub fn real_time(log: EventLog) -> Self {
        Self {
            log,
            real_time: true,
        }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.log.push(MockEvent::Sleep(duration));
        if self.real_time {
            spin_sleep::sleep(duration);
        }
    }
}

/// 一整套共享日志的 mock 硬件
pub struct MockRig {
    pub log: EventLog,
    pub calibration: SensorCalibration,
    pub motors: MockMotorDriver,
    pub indicator: MockIndicator,
    pub front: ScriptedAnalogInput,
    pub rear: ScriptedAnalogInput,
    pub transport: MockTransport,
    pub sleeper: RecordingSleeper,
}

impl MockRig {
    /// 前后方向初始读数均为 `clear_cm`
    pub fn new(calibration: SensorCalibration, clear_cm: u16) -> Self {
        let log = EventLog::new();
        let raw = calibration.raw_for(clear_cm);
        Self {
            calibration,
            motors: MockMotorDriver::new(log.clone()),
            indicator: MockIndicator::new(log.clone()),
            front: ScriptedAnalogInput::new(SensorPosition::Front, raw, log.clone()),
            rear: ScriptedAnalogInput::new(SensorPosition::Rear, raw, log.clone()),
            transport: MockTransport::new(log.clone()),
            sleeper: RecordingSleeper::new(log.clone()),
            log,
        }
    }
}
