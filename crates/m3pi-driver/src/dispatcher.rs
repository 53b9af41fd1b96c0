//! 指令调度器
//!
//! 单线程循环：空闲时阻塞在队列上，取出一条指令后执行到底（运动、测距、发布全部完成），
//! 然后回到空闲。调度器是运动状态的唯一写者，也是电机、指示灯、传感器的唯一调用方。

use crate::actuator::{IndicatorLamp, MotionActuator};
use crate::error::DriverError;
use crate::hardware::Hardware;
use crate::metrics::DispatcherMetrics;
use crate::phase::{AtomicDispatcherPhase, DispatcherPhase};
use crate::publisher::TelemetryPublisher;
use crate::queue::CommandReceiver;
use crate::state::{MotionConfig, MotionState};
use crossbeam_channel::Receiver;
use m3pi_hal::{Direction, DistanceSensor, SensorCalibration, Sleeper};
use m3pi_protocol::{Command, DistanceReading, Rotation, SensorPosition, Speed, TopicSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 每次行驶前避障旋转次数的上限
pub const MAX_AVOIDANCE_ATTEMPTS: u8 = 2;

/// 调度器时序与避障参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// 安全距离（cm），低于该值视为前路被挡
    pub safety_threshold_cm: u16,
    /// 每次行驶前最多的避障旋转次数（1..=2）
    pub max_avoidance_attempts: u8,
    /// 避障旋转速度
    pub avoidance_speed: Speed,
    /// 单次避障旋转时长（ms）
    pub avoidance_rotation_ms: u64,
    /// 避障旋转后重新测距前的等待（ms）
    pub avoidance_settle_ms: u64,
    /// 前进 / 后退时长（ms）
    pub travel_ms: u64,
    /// 原地旋转时长（ms）
    pub rotate_ms: u64,
    /// 指示灯常亮时长（ms）
    pub indicator_hold_ms: u64,
    /// 快闪翻转次数
    pub blink_toggles: u8,
    /// 快闪翻转间隔（ms）
    pub blink_interval_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            safety_threshold_cm: 26,
            max_avoidance_attempts: MAX_AVOIDANCE_ATTEMPTS,
            avoidance_speed: Speed::default(),
            avoidance_rotation_ms: 250,
            avoidance_settle_ms: 100,
            travel_ms: 500,
            rotate_ms: 250,
            indicator_hold_ms: 1000,
            blink_toggles: 10,
            blink_interval_ms: 100,
        }
    }
}

impl DispatcherConfig {
    pub fn avoidance_rotation(&self) -> Duration {
        Duration::from_millis(self.avoidance_rotation_ms)
    }

    pub fn avoidance_settle(&self) -> Duration {
        Duration::from_millis(self.avoidance_settle_ms)
    }

    pub fn travel(&self) -> Duration {
        Duration::from_millis(self.travel_ms)
    }

    pub fn rotate(&self) -> Duration {
        Duration::from_millis(self.rotate_ms)
    }

    pub fn indicator_hold(&self) -> Duration {
        Duration::from_millis(self.indicator_hold_ms)
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }
}

/// 一条指令的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// 已发布存活消息
    LivenessPublished,
    /// 指示灯动作完成
    IndicatorCycled,
    /// 行驶完成
    Moved {
        direction: Direction,
        speed: Speed,
        /// 行驶前的避障旋转次数
        avoidance_rotations: u8,
        /// 避障次数用尽（最后一次旋转后未再测距）
        avoidance_exhausted: bool,
    },
    /// 原地旋转完成
    Rotated { rotation: Rotation, speed: Speed },
    /// 避障方向已更新
    AvoidanceSet(Rotation),
    /// 速度已更新
    SpeedSet(Speed),
    /// 未知操作码，已忽略
    Ignored(u8),
}

/// 指令调度器
pub struct Dispatcher {
    state: MotionState,
    config: DispatcherConfig,
    actuator: MotionActuator,
    indicator: IndicatorLamp,
    front: DistanceSensor,
    rear: DistanceSensor,
    publisher: TelemetryPublisher,
    sleeper: Arc<dyn Sleeper>,
    metrics: Arc<DispatcherMetrics>,
    phase: Arc<AtomicDispatcherPhase>,
}

impl Dispatcher {
    pub fn new(
        hardware: Hardware,
        motion: MotionConfig,
        config: DispatcherConfig,
        calibration: SensorCalibration,
        topics: TopicSet,
        metrics: Arc<DispatcherMetrics>,
    ) -> Self {
        let Hardware {
            motors,
            indicator,
            front,
            rear,
            transport,
            sleeper,
        } = hardware;

        Self {
            state: MotionState::from(motion),
            config,
            actuator: MotionActuator::new(motors, sleeper.clone(), metrics.clone()),
            indicator: IndicatorLamp::new(indicator, sleeper.clone()),
            front: DistanceSensor::new(SensorPosition::Front, front, calibration),
            rear: DistanceSensor::new(SensorPosition::Rear, rear, calibration),
            publisher: TelemetryPublisher::new(transport, topics, metrics.clone()),
            sleeper,
            metrics,
            phase: Arc::new(AtomicDispatcherPhase::new(DispatcherPhase::Idle)),
        }
    }

    /// 当前运动状态
    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// 阶段句柄（可在其他线程读取）
    pub fn phase(&self) -> Arc<AtomicDispatcherPhase> {
        self.phase.clone()
    }

    /// 调度循环
    ///
    /// 只在空闲时检查停机信号，正在执行的指令总会完成。
    /// 通道断开或收到停机信号时返回。
    pub fn run(&mut self, receiver: &CommandReceiver, shutdown: &Receiver<()>) {
        info!("Dispatcher loop started");

        while let Some(command) = receiver.dequeue_until(shutdown) {
            self.execute(command);
        }

        let dropped = receiver.len();
        if dropped > 0 {
            warn!("Dispatcher stopped with {} queued command(s) discarded", dropped);
        }
        info!("Dispatcher loop exited");
    }

    /// 阻塞取出一条指令并执行
    pub fn step(&mut self, receiver: &CommandReceiver) -> Result<CommandOutcome, DriverError> {
        let command = receiver.dequeue_blocking()?;
        Ok(self.execute(command))
    }

    fn execute(&mut self, command: Command) -> CommandOutcome {
        self.phase.set(DispatcherPhase::Executing, Ordering::Release);
        let outcome = self.handle(command);
        self.metrics.commands_processed.fetch_add(1, Ordering::Release);
        self.phase.set(DispatcherPhase::Idle, Ordering::Release);
        outcome
    }

    /// 执行一条指令
    pub fn handle(&mut self, command: Command) -> CommandOutcome {
        debug!("Executing {:?}", command);

        match command {
            Command::PublishLiveness => {
                self.publisher.publish_liveness();
                CommandOutcome::LivenessPublished
            },
            Command::IndicatorOn => {
                self.indicator.hold(self.config.indicator_hold());
                CommandOutcome::IndicatorCycled
            },
            Command::IndicatorBlink => {
                self.indicator
                    .blink(self.config.blink_toggles, self.config.blink_interval());
                CommandOutcome::IndicatorCycled
            },
            Command::MoveForward => self.travel(Direction::Forward, SensorPosition::Front),
            Command::MoveBackward => self.travel(Direction::Backward, SensorPosition::Rear),
            Command::RotateCw => self.rotate_in_place(Rotation::Cw),
            Command::RotateCcw => self.rotate_in_place(Rotation::Ccw),
            Command::SetAvoidance(rotation) => {
                self.state.avoidance = rotation;
                info!("Avoidance direction set to {}", rotation);
                CommandOutcome::AvoidanceSet(rotation)
            },
            Command::SetSpeed(speed) => {
                self.state.speed = speed;
                info!("Travel speed set to {}", speed);
                CommandOutcome::SpeedSet(speed)
            },
            Command::Unknown(raw) => {
                self.metrics.unknown_opcodes.fetch_add(1, Ordering::Relaxed);
                warn!("Ignoring unknown opcode 0x{:02X}", raw);
                CommandOutcome::Ignored(raw)
            },
        }
    }

    /// 避障后行驶，然后上报前后距离
    fn travel(&mut self, direction: Direction, facing: SensorPosition) -> CommandOutcome {
        let (avoidance_rotations, avoidance_exhausted) = self.clear_path(facing);
        if avoidance_exhausted {
            self.metrics.moves_while_blocked.fetch_add(1, Ordering::Relaxed);
            info!(
                "Avoidance exhausted after {} rotation(s), driving {} anyway",
                avoidance_rotations,
                direction.as_str()
            );
        }

        let speed = self.state.speed;
        self.actuator.drive(direction, speed, self.config.travel());
        self.report_distances();

        CommandOutcome::Moved {
            direction,
            speed,
            avoidance_rotations,
            avoidance_exhausted,
        }
    }

    fn rotate_in_place(&mut self, rotation: Rotation) -> CommandOutcome {
        let speed = self.state.speed;
        self.actuator.rotate(rotation, speed, self.config.rotate());
        self.report_distances();
        CommandOutcome::Rotated { rotation, speed }
    }

    /// 避障
    ///
    /// 面向行驶方向的传感器低于安全距离时朝避障方向旋转一次，等待后重新测距。
    /// 最多旋转 `max_avoidance_attempts` 次（不超过 [`MAX_AVOIDANCE_ATTEMPTS`]）；最后一次旋转后不再测距。
    /// 返回（旋转次数，是否用尽）。
    fn clear_path(&mut self, facing: SensorPosition) -> (u8, bool) {
        let threshold = self.config.safety_threshold_cm;
        let attempts = self
            .config
            .max_avoidance_attempts
            .min(MAX_AVOIDANCE_ATTEMPTS);

        for rotations in 0..attempts {
            if rotations > 0 {
                self.sleeper.sleep(self.config.avoidance_settle());
            }

            let reading = self.sensor(facing).read();
            if !reading.is_below(threshold) {
                return (rotations, false);
            }

            debug!(
                "{} obstacle at {} cm (< {} cm), rotating {}",
                facing, reading.centimeters, threshold, self.state.avoidance
            );
            self.actuator.rotate(
                self.state.avoidance,
                self.config.avoidance_speed,
                self.config.avoidance_rotation(),
            );
            self.metrics.avoidance_rotations.fetch_add(1, Ordering::Relaxed);
        }

        (attempts, true)
    }

    /// 依次读取并发布前、后距离
    fn report_distances(&mut self) {
        for position in [SensorPosition::Front, SensorPosition::Rear] {
            let reading: DistanceReading = self.sensor(position).read();
            self.publisher.publish_distance(reading);
        }
    }

    fn sensor(&mut self, position: SensorPosition) -> &mut DistanceSensor {
        match position {
            SensorPosition::Front => &mut self.front,
            SensorPosition::Rear => &mut self.rear,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
