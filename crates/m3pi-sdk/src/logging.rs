//! 日志初始化
//!
//! `tracing` 订阅者 + `log` 桥接。库代码只使用 `tracing` 宏，
//! 依赖 `log` 的第三方库的记录也会经由 `tracing-log` 汇入同一个输出。

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// 默认过滤规则（`RUST_LOG` 未设置时使用）
pub const DEFAULT_FILTER: &str = "info";

/// 初始化全局日志（幂等）
///
/// 读取 `RUST_LOG`，未设置或无法解析时使用 `info`。
///
/// ```rust
/// m3pi_sdk::init_logger();
/// m3pi_sdk::init_logger(); // 第二次调用无效果
/// ```
pub fn init_logger() {
    init_logger_with(DEFAULT_FILTER);
}

/// 以指定默认过滤规则初始化全局日志（幂等）
///
/// 进程中已经有其他全局订阅者时保持原样；已有 `log` 后端时只跳过桥接。
pub fn init_logger_with(default_filter: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
        let _ = tracing::subscriber::set_global_default(subscriber);

        // 已有 log 后端时不覆盖
        let _ = tracing_log::LogTracer::builder()
            .with_max_level(log::LevelFilter::Trace)
            .init();
    });
}
