//! 有界指令队列
//!
//! 多个生产者（`CommandSender` 可克隆），一个消费者（调度线程）。
//! 入队永不阻塞；队列满时立即返回 [`DriverError::QueueFull`]。

use crate::error::DriverError;
use crate::metrics::DispatcherMetrics;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded, select};
use m3pi_protocol::Command;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{trace, warn};

/// 默认队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// 创建一对队列端点
///
/// `capacity` 为 0 时按 1 处理（零容量通道是同步交接，不是邮箱）。
pub fn command_queue(
    capacity: usize,
    metrics: Arc<DispatcherMetrics>,
) -> (CommandSender, CommandReceiver) {
    let capacity = capacity.max(1);
    let (tx, rx) = bounded(capacity);
    (
        CommandSender {
            tx,
            capacity,
            metrics,
        },
        CommandReceiver { rx },
    )
}

/// 生产者端
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
    capacity: usize,
    metrics: Arc<DispatcherMetrics>,
}

impl CommandSender {
    /// 非阻塞入队
    ///
    /// # 错误
    /// - `QueueFull`: 队列中已有 `capacity` 条指令
    /// - `ChannelClosed`: 调度线程已退出
    pub fn enqueue(&self, command: Command) -> Result<(), DriverError> {
        match self.tx.try_send(command) {
            Ok(()) => {
                self.metrics.commands_enqueued.fetch_add(1, Ordering::Relaxed);
                trace!("Enqueued {:?}", command);
                Ok(())
            },
            Err(TrySendError::Full(command)) => {
                self.metrics.queue_full_rejections.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Command queue full (capacity {}), rejecting {:?}",
                    self.capacity, command
                );
                Err(DriverError::QueueFull {
                    capacity: self.capacity,
                })
            },
            Err(TrySendError::Disconnected(_)) => Err(DriverError::ChannelClosed),
        }
    }

    /// 解码入站缓冲区并入队
    ///
    /// 解码失败时不入队，错误返回给生产者。成功时返回解码出的指令。
    pub fn enqueue_frame(&self, bytes: &[u8]) -> Result<Command, DriverError> {
        let command = Command::decode(bytes).inspect_err(|e| {
            self.metrics.decode_rejections.fetch_add(1, Ordering::Relaxed);
            warn!("Rejected inbound frame {:02X?}: {}", bytes, e);
        })?;
        self.enqueue(command)?;
        Ok(command)
    }

    /// 队列容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前排队的指令数
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }
}

/// 消费者端（只由调度线程持有）
#[derive(Debug)]
pub struct CommandReceiver {
    rx: Receiver<Command>,
}

impl CommandReceiver {
    /// 阻塞直到有一条指令
    ///
    /// 所有生产者都已释放且队列为空时返回 `ChannelClosed`。
    pub fn dequeue_blocking(&self) -> Result<Command, DriverError> {
        self.rx.recv().map_err(|_| DriverError::ChannelClosed)
    }

    /// 阻塞直到有一条指令或收到停机信号
    ///
    /// 收到停机信号或通道断开时返回 `None`。
    pub fn dequeue_until(&self, shutdown: &Receiver<()>) -> Option<Command> {
        select! {
            recv(self.rx) -> command => command.ok(),
            recv(shutdown) -> _ => None,
        }
    }

    /// 非阻塞出队
    pub fn try_dequeue(&self) -> Result<Option<Command>, DriverError> {
        match self.rx.try_recv() {
            Ok(command) => Ok(Some(command)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(DriverError::ChannelClosed),
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use m3pi_protocol::{Rotation, Speed};
    use std::thread;
    use std::time::Duration;

    fn queue(capacity: usize) -> (CommandSender, CommandReceiver, Arc<DispatcherMetrics>) {
        let metrics = Arc::new(DispatcherMetrics::new());
        let (tx, rx) = command_queue(capacity, metrics.clone());
        (tx, rx, metrics)
    }

    #[test]
    fn test_fifo_order() {
        let (tx, rx, metrics) = queue(4);
        tx.enqueue(Command::MoveForward).unwrap();
        tx.enqueue(Command::SetAvoidance(Rotation::Ccw)).unwrap();
        tx.enqueue(Command::PublishLiveness).unwrap();

        assert_eq!(rx.dequeue_blocking().unwrap(), Command::MoveForward);
        assert_eq!(
            rx.dequeue_blocking().unwrap(),
            Command::SetAvoidance(Rotation::Ccw)
        );
        assert_eq!(rx.dequeue_blocking().unwrap(), Command::PublishLiveness);
        assert_eq!(metrics.snapshot().commands_enqueued, 3);
    }

    #[test]
    fn test_full_queue_rejects_without_blocking() {
        let (tx, rx, metrics) = queue(2);
        tx.enqueue(Command::RotateCw).unwrap();
        tx.enqueue(Command::RotateCcw).unwrap();
        assert!(tx.is_full());

        let err = tx.enqueue(Command::MoveForward).unwrap_err();
        assert!(matches!(err, DriverError::QueueFull { capacity: 2 }));
        assert_eq!(metrics.snapshot().queue_full_rejections, 1);

        // 被拒绝的指令不会进入队列
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.dequeue_blocking().unwrap(), Command::RotateCw);
        tx.enqueue(Command::MoveForward).unwrap();
    }

    #[test]
    fn test_zero_capacity_becomes_one() {
        let (tx, _rx, _) = queue(0);
        assert_eq!(tx.capacity(), 1);
        tx.enqueue(Command::IndicatorOn).unwrap();
        assert!(tx.enqueue(Command::IndicatorOn).is_err());
    }

    #[test]
    fn test_enqueue_frame_decodes() {
        let (tx, rx, _) = queue(4);
        let command = tx.enqueue_frame(b"19 40\0\0\0").unwrap();
        assert_eq!(command, Command::SetSpeed(Speed::new(40).unwrap()));
        assert_eq!(rx.dequeue_blocking().unwrap(), command);
    }

    #[test]
    fn test_enqueue_frame_rejects_bad_input() {
        let (tx, rx, metrics) = queue(4);
        assert!(matches!(
            tx.enqueue_frame(b"1"),
            Err(DriverError::Protocol(_))
        ));
        assert!(matches!(
            tx.enqueue_frame(b"19abc"),
            Err(DriverError::Protocol(_))
        ));
        assert!(rx.is_empty());
        assert_eq!(metrics.snapshot().decode_rejections, 2);
        assert_eq!(metrics.snapshot().commands_enqueued, 0);
    }

    #[test]
    fn test_closed_channel() {
        let (tx, rx, _) = queue(4);
        drop(rx);
        assert!(matches!(
            tx.enqueue(Command::MoveForward),
            Err(DriverError::ChannelClosed)
        ));

        let (tx, rx, _) = queue(4);
        tx.enqueue(Command::RotateCw).unwrap();
        drop(tx);
        // 断开后仍能取出剩余指令
        assert_eq!(rx.dequeue_blocking().unwrap(), Command::RotateCw);
        assert!(matches!(rx.dequeue_blocking(), Err(DriverError::ChannelClosed)));
        assert!(matches!(rx.try_dequeue(), Err(DriverError::ChannelClosed)));
    }

    #[test]
    fn test_dequeue_blocks_until_available() {
        let (tx, rx, _) = queue(4);
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            tx.enqueue(Command::IndicatorBlink).unwrap();
        });
        assert_eq!(rx.dequeue_blocking().unwrap(), Command::IndicatorBlink);
        producer.join().unwrap();
    }

    #[test]
    fn test_dequeue_until_shutdown() {
        let (tx, rx, _) = queue(4);
        let (shutdown_tx, shutdown_rx) = bounded(1);

        tx.enqueue(Command::PublishLiveness).unwrap();
        assert_eq!(
            rx.dequeue_until(&shutdown_rx),
            Some(Command::PublishLiveness)
        );

        shutdown_tx.send(()).unwrap();
        assert_eq!(rx.dequeue_until(&shutdown_rx), None);
        assert_eq!(rx.try_dequeue().unwrap(), None);
    }

    #[test]
    fn test_multiple_producers() {
        let (tx, rx, metrics) = queue(16);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for _ in 0..3 {
                        tx.enqueue(Command::PublishLiveness).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(rx.len(), 12);
        assert_eq!(metrics.snapshot().commands_enqueued, 12);
    }
}
