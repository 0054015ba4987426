//! 可观测性：日志输出到 stderr，stdout 只留给最终状态

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认日志级别，可通过 RUST_LOG 覆盖
const DEFAULT_DIRECTIVE: &str = "info";

pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    // 重复初始化（如测试中）时忽略
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
