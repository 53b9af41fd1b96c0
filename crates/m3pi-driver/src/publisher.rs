//! 遥测发布
//!
//! 传输句柄与系统中其他发布者共享；每次发布只在传输调用期间持有锁。
//! 发布失败只记录和计数，不返回给调用方。

use crate::metrics::DispatcherMetrics;
use m3pi_hal::SharedTransport;
use m3pi_protocol::{DistanceReading, Message, TelemetryPayload, TopicSet};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{trace, warn};

/// 遥测发布者
pub struct TelemetryPublisher {
    transport: SharedTransport,
    topics: TopicSet,
    metrics: Arc<DispatcherMetrics>,
}

impl TelemetryPublisher {
    pub fn new(transport: SharedTransport, topics: TopicSet, metrics: Arc<DispatcherMetrics>) -> Self {
        Self {
            transport,
            topics,
            metrics,
        }
    }

    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    /// 以 QoS 0 发布一条载荷
    pub fn publish(&self, topic: &str, payload: TelemetryPayload) {
        let message = Message::best_effort(payload);

        // 锁只覆盖传输调用本身
        let result = self.transport.lock().publish(topic, &message);

        match result {
            Ok(()) => {
                self.metrics.publishes_ok.fetch_add(1, Ordering::Relaxed);
                trace!("Published {:?} to {}", payload, topic);
            },
            Err(e) => {
                self.metrics.publish_failures.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to publish {:?} to {}: {}", payload, topic, e);
            },
        }
    }

    /// 向存活主题发布 `hi`
    pub fn publish_liveness(&self) {
        self.publish(&self.topics.liveness, TelemetryPayload::liveness());
    }

    /// 向传感器位置对应的主题发布距离
    pub fn publish_distance(&self, reading: DistanceReading) {
        let topic = self.topics.for_position(reading.position);
        self.publish(topic, TelemetryPayload::distance(reading.centimeters));
    }
}

impl std::fmt::Debug for TelemetryPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryPublisher")
            .field("topics", &self.topics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use m3pi_hal::mock::{EventLog, MockEvent, MockTransport};
    use m3pi_hal::shared_transport;
    use m3pi_protocol::{QoS, SensorPosition};

    fn publisher(log: &EventLog) -> (TelemetryPublisher, Arc<DispatcherMetrics>) {
        let metrics = Arc::new(DispatcherMetrics::new());
        let publisher = TelemetryPublisher::new(
            shared_transport(MockTransport::new(log.clone())),
            TopicSet::default(),
            metrics.clone(),
        );
        (publisher, metrics)
    }

    #[test]
    fn test_liveness_goes_to_liveness_topic() {
        let log = EventLog::new();
        let (publisher, metrics) = publisher(&log);

        publisher.publish_liveness();

        assert_eq!(
            log.snapshot(),
            vec![MockEvent::Publish {
                topic: "m3pi-mqtt-ee250/led-thread".to_string(),
                payload: b"hi".to_vec(),
                qos: QoS::AtMostOnce,
                retained: false,
                dup: false,
            }]
        );
        assert_eq!(metrics.snapshot().publishes_ok, 1);
    }

    #[test]
    fn test_distance_routed_by_position() {
        let log = EventLog::new();
        let (publisher, _) = publisher(&log);

        publisher.publish_distance(DistanceReading::new(SensorPosition::Front, 7));
        publisher.publish_distance(DistanceReading::new(SensorPosition::Rear, 123));

        assert_eq!(
            log.publishes(),
            vec![
                (
                    "m3pi-mqtt-ee250/front-distance".to_string(),
                    b"07 cm ".to_vec()
                ),
                (
                    "m3pi-mqtt-ee250/rear-distance".to_string(),
                    b"123cm".to_vec()
                ),
            ]
        );
    }

    #[test]
    fn test_failure_is_counted_not_surfaced() {
        let log = EventLog::new();
        let transport = MockTransport::new(log.clone());
        transport.faults().set_failing(true);
        let metrics = Arc::new(DispatcherMetrics::new());
        let publisher =
            TelemetryPublisher::new(shared_transport(transport), TopicSet::default(), metrics.clone());

        publisher.publish_liveness();
        publisher.publish_distance(DistanceReading::new(SensorPosition::Front, 50));

        assert!(log.is_empty());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.publish_failures, 2);
        assert_eq!(snapshot.publishes_ok, 0);
    }

    #[test]
    fn test_lock_released_after_publish() {
        let log = EventLog::new();
        let shared = shared_transport(MockTransport::new(log.clone()));
        let publisher = TelemetryPublisher::new(
            shared.clone(),
            TopicSet::default(),
            Arc::new(DispatcherMetrics::new()),
        );

        publisher.publish_liveness();

        // 另一个发布者可以立即拿到锁
        assert!(shared.try_lock().is_some());
    }
}
