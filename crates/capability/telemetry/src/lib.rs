//! 日志、诊断与基础计数器。

mod repeat;
mod reporter;

pub use repeat::{DEFAULT_REPEAT_WINDOW, RepeatLog};
pub use reporter::StateReporter;

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 错误文本最大长度（字符）。
pub const MAX_ERROR_LEN: usize = 300;

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub group_reads: u64,
    pub group_read_failures: u64,
    pub coil_pushes: u64,
    pub coil_push_failures: u64,
    pub coil_push_skipped: u64,
    pub transport_faults: u64,
    pub modbus_requests: u64,
    pub modbus_exceptions: u64,
}

/// 基础指标。
pub struct TelemetryMetrics {
    ticks: AtomicU64,
    connect_attempts: AtomicU64,
    connect_failures: AtomicU64,
    group_reads: AtomicU64,
    group_read_failures: AtomicU64,
    coil_pushes: AtomicU64,
    coil_push_failures: AtomicU64,
    coil_push_skipped: AtomicU64,
    transport_faults: AtomicU64,
    modbus_requests: AtomicU64,
    modbus_exceptions: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            connect_attempts: AtomicU64::new(0),
            connect_failures: AtomicU64::new(0),
            group_reads: AtomicU64::new(0),
            group_read_failures: AtomicU64::new(0),
            coil_pushes: AtomicU64::new(0),
            coil_push_failures: AtomicU64::new(0),
            coil_push_skipped: AtomicU64::new(0),
            transport_faults: AtomicU64::new(0),
            modbus_requests: AtomicU64::new(0),
            modbus_exceptions: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            group_reads: self.group_reads.load(Ordering::Relaxed),
            group_read_failures: self.group_read_failures.load(Ordering::Relaxed),
            coil_pushes: self.coil_pushes.load(Ordering::Relaxed),
            coil_push_failures: self.coil_push_failures.load(Ordering::Relaxed),
            coil_push_skipped: self.coil_push_skipped.load(Ordering::Relaxed),
            transport_faults: self.transport_faults.load(Ordering::Relaxed),
            modbus_requests: self.modbus_requests.load(Ordering::Relaxed),
            modbus_exceptions: self.modbus_exceptions.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成控制器会话标识。
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 将错误及其 source 链渲染为单行文本，超长截断。
pub fn fmt_err(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(" | ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    truncate(&message, MAX_ERROR_LEN)
}

/// 按字符截断，超长时以 `...` 结尾。
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// 记录一次轮询周期。
pub fn record_tick() {
    metrics().ticks.fetch_add(1, Ordering::Relaxed);
}

/// 记录连接尝试次数。
pub fn record_connect_attempt() {
    metrics().connect_attempts.fetch_add(1, Ordering::Relaxed);
}

/// 记录连接失败次数。
pub fn record_connect_failure() {
    metrics().connect_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录批量读成功次数。
pub fn record_group_read() {
    metrics().group_reads.fetch_add(1, Ordering::Relaxed);
}

/// 记录批量读失败次数。
pub fn record_group_read_failure() {
    metrics().group_read_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录写线圈推送成功次数。
pub fn record_coil_push() {
    metrics().coil_pushes.fetch_add(1, Ordering::Relaxed);
}

/// 记录写线圈推送失败次数。
pub fn record_coil_push_failure() {
    metrics().coil_push_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录因标签失效而跳过的推送次数。
pub fn record_coil_push_skipped() {
    metrics().coil_push_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录控制器会话异步故障次数。
pub fn record_transport_fault() {
    metrics().transport_faults.fetch_add(1, Ordering::Relaxed);
}

/// 记录 Modbus 请求次数。
pub fn record_modbus_request() {
    metrics().modbus_requests.fetch_add(1, Ordering::Relaxed);
}

/// 记录 Modbus 异常响应次数。
pub fn record_modbus_exception() {
    metrics().modbus_exceptions.fetch_add(1, Ordering::Relaxed);
}
