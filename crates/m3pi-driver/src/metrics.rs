//! 调度器运行指标
//!
//! 原子计数器，调度线程和生产者线程直接更新，任何线程都可以读取快照，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 调度器实时指标
///
/// # 使用示例
///
/// ```rust
/// use m3pi_driver::DispatcherMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(DispatcherMetrics::default());
/// metrics.commands_processed.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.commands_processed, 1);
/// ```
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// 成功入队的指令数
    pub commands_enqueued: AtomicU64,

    /// 执行完成的指令数（包括未知操作码）
    pub commands_processed: AtomicU64,

    /// 未知操作码次数
    pub unknown_opcodes: AtomicU64,

    /// 避障旋转次数
    pub avoidance_rotations: AtomicU64,

    /// 避障次数用尽后仍继续行驶的次数
    ///
    /// 持续增长说明机器人经常被困在狭窄区域。
    pub moves_while_blocked: AtomicU64,

    /// 发布成功次数
    pub publishes_ok: AtomicU64,

    /// 发布失败次数（传输层错误，已记录但未上报）
    pub publish_failures: AtomicU64,

    /// 队列满被拒绝的指令数
    pub queue_full_rejections: AtomicU64,

    /// 入站帧解码失败次数
    pub decode_rejections: AtomicU64,

    /// 电机驱动错误次数
    pub device_errors: AtomicU64,
}

impl DispatcherMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器分别以 `Relaxed` 读取，相互之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_enqueued: self.commands_enqueued.load(Ordering::Relaxed),
            commands_processed: self.commands_processed.load(Ordering::Relaxed),
            unknown_opcodes: self.unknown_opcodes.load(Ordering::Relaxed),
            avoidance_rotations: self.avoidance_rotations.load(Ordering::Relaxed),
            moves_while_blocked: self.moves_while_blocked.load(Ordering::Relaxed),
            publishes_ok: self.publishes_ok.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            queue_full_rejections: self.queue_full_rejections.load(Ordering::Relaxed),
            decode_rejections: self.decode_rejections.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.commands_enqueued.store(0, Ordering::Relaxed);
        self.commands_processed.store(0, Ordering::Relaxed);
        self.unknown_opcodes.store(0, Ordering::Relaxed);
        self.avoidance_rotations.store(0, Ordering::Relaxed);
        self.moves_while_blocked.store(0, Ordering::Relaxed);
        self.publishes_ok.store(0, Ordering::Relaxed);
        self.publish_failures.store(0, Ordering::Relaxed);
        self.queue_full_rejections.store(0, Ordering::Relaxed);
        self.decode_rejections.store(0, Ordering::Relaxed);
        self.device_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub commands_enqueued: u64,
    pub commands_processed: u64,
    pub unknown_opcodes: u64,
    pub avoidance_rotations: u64,
    pub moves_while_blocked: u64,
    pub publishes_ok: u64,
    pub publish_failures: u64,
    pub queue_full_rejections: u64,
    pub decode_rejections: u64,
    pub device_errors: u64,
}

impl MetricsSnapshot {
    /// 已入队但尚未执行完成的指令数
    pub fn pending(&self) -> u64 {
        self.commands_enqueued.saturating_sub(self.commands_processed)
    }

    /// 发布失败率（百分比），没有发布时返回 0.0
    pub fn publish_failure_rate(&self) -> f64 {
        let total = self.publishes_ok + self.publish_failures;
        if total == 0 {
            return 0.0;
        }
        (self.publish_failures as f64 / total as f64) * 100.0
    }
}
