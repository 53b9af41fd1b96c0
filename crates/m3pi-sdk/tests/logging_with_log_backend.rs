//! 进程中已有 `log` 后端时的日志初始化
//!
//! 全局日志状态按进程隔离，所以单独放在一个测试二进制中。

struct NullLogger;

impl log::Log for NullLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        false
    }

    fn log(&self, _record: &log::Record) {}

    fn flush(&self) {}
}

static NULL_LOGGER: NullLogger = NullLogger;

#[test]
fn test_tracing_subscriber_installed_despite_existing_log_backend() {
    log::set_logger(&NULL_LOGGER).unwrap();
    assert!(!tracing::dispatcher::has_been_set());

    m3pi_sdk::init_logger();

    assert!(tracing::dispatcher::has_been_set());
    tracing::info!("tracing output still reaches the fmt subscriber");
}
