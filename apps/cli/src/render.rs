//! mock 硬件事件的文本输出

use m3pi_sdk::hal::mock::MockEvent;

/// 单个事件的一行描述
pub fn describe(event: &MockEvent) -> String {
    match event {
        MockEvent::Drive { direction, duty } => {
            format!("drive {} {}%", direction.as_str(), (duty * 100.0).round() as u32)
        },
        MockEvent::Stop => "stop".to_string(),
        MockEvent::Indicator(on) => format!("led {}", if *on { "on" } else { "off" }),
        MockEvent::Sleep(duration) => format!("wait {}ms", duration.as_millis()),
        MockEvent::SensorRead(position) => format!("read {position}"),
        MockEvent::Publish { topic, payload, .. } => {
            format!("publish {topic} {:?}", String::from_utf8_lossy(payload))
        },
    }
}

/// 默认只输出发布的遥测，`verbose` 时输出全部事件
pub fn is_visible(event: &MockEvent, verbose: bool) -> bool {
    verbose || matches!(event, MockEvent::Publish { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use m3pi_sdk::hal::Direction;
    use m3pi_sdk::protocol::QoS;
    use std::time::Duration;

    fn publish(topic: &str, payload: &[u8]) -> MockEvent {
        MockEvent::Publish {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos: QoS::AtMostOnce,
            retained: false,
            dup: false,
        }
    }

    #[test]
    fn test_describe_events() {
        assert_eq!(
            describe(&MockEvent::Drive {
                direction: Direction::Right,
                duty: 0.25,
            }),
            "drive right 25%"
        );
        assert_eq!(describe(&MockEvent::Sleep(Duration::from_millis(250))), "wait 250ms");
        assert_eq!(describe(&MockEvent::Indicator(true)), "led on");
        assert_eq!(
            describe(&publish("m3pi-mqtt-ee250/front-distance", b"07 cm ")),
            "publish m3pi-mqtt-ee250/front-distance \"07 cm \""
        );
    }

    #[test]
    fn test_only_publishes_visible_by_default() {
        assert!(is_visible(&publish("t", b"hi"), false));
        assert!(!is_visible(&MockEvent::Stop, false));
        assert!(is_visible(&MockEvent::Stop, true));
    }
}
