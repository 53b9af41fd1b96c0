//! 调度器阶段
//!
//! 调度器只有两个阶段：空闲（阻塞在队列上）和执行中。

use std::sync::atomic::{AtomicU8, Ordering};

/// 调度器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DispatcherPhase {
    /// 等待下一条指令（默认）
    #[default]
    Idle = 0,

    /// 正在执行一条指令
    Executing = 1,
}

impl DispatcherPhase {
    /// 从 u8 转换，无效值视为 Idle
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Executing,
            _ => Self::Idle,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }
}

/// 调度器阶段（原子版本，调度线程写，句柄读）
#[derive(Debug, Default)]
pub struct AtomicDispatcherPhase {
    inner: AtomicU8,
}

impl AtomicDispatcherPhase {
    pub fn new(phase: DispatcherPhase) -> Self {
        Self {
            inner: AtomicU8::new(phase.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> DispatcherPhase {
        DispatcherPhase::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, phase: DispatcherPhase, ordering: Ordering) {
        self.inner.store(phase.as_u8(), ordering);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_conversion() {
        assert_eq!(DispatcherPhase::from_u8(0), DispatcherPhase::Idle);
        assert_eq!(DispatcherPhase::from_u8(1), DispatcherPhase::Executing);
        assert_eq!(DispatcherPhase::from_u8(200), DispatcherPhase::Idle);
        assert_eq!(DispatcherPhase::Executing.as_u8(), 1);
        assert!(DispatcherPhase::default().is_idle());
    }

    #[test]
    fn test_atomic_phase() {
        let phase = AtomicDispatcherPhase::new(DispatcherPhase::Idle);
        phase.set(DispatcherPhase::Executing, Ordering::Release);
        assert_eq!(phase.get(Ordering::Acquire), DispatcherPhase::Executing);
        phase.set(DispatcherPhase::Idle, Ordering::Release);
        assert!(phase.get(Ordering::Acquire).is_idle());
    }
}
