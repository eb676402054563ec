//! 重复日志去重与周期汇总。
//!
//! 同一 key 的重复消息不逐条输出，而是累计到桶中；
//! 自首次出现起超过窗口后输出一条汇总并重置该桶。

use domain::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{Level, debug, error, info, warn};

/// 默认汇总窗口（10 分钟）。
pub const DEFAULT_REPEAT_WINDOW: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct Bucket {
    count: u64,
    first: Instant,
    last: Instant,
    sample: String,
    level: Level,
}

impl Bucket {
    fn summary(&self, key: &str) -> String {
        let minutes = (self.last - self.first).as_secs_f64() / 60.0;
        format!(
            "summary \"{}\": occurred {}x in {} min | last: {}",
            key,
            self.count,
            minutes.round() as u64,
            self.sample
        )
    }
}

/// 重复消息去重器。
pub struct RepeatLog {
    window: Duration,
    clock: Arc<dyn Clock>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RepeatLog {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 累计一条重复消息；窗口到期时输出并返回汇总。
    pub fn record(&self, key: &str, line: impl Into<String>, level: Level) -> Option<String> {
        let now = self.clock.now();
        let line = line.into();
        let mut buckets = match self.buckets.lock() {
            Ok(buckets) => buckets,
            Err(poisoned) => poisoned.into_inner(),
        };
        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            count: 0,
            first: now,
            last: now,
            sample: line.clone(),
            level,
        });
        bucket.count += 1;
        bucket.last = now;
        bucket.sample = line;
        bucket.level = level;

        if now.duration_since(bucket.first) < self.window {
            return None;
        }
        let summary = bucket.summary(key);
        emit(level, &summary);
        buckets.remove(key);
        Some(summary)
    }

    /// 输出全部未到期的汇总并清空。
    pub fn flush(&self) -> Vec<String> {
        let mut buckets = match self.buckets.lock() {
            Ok(buckets) => buckets,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut drained: Vec<(String, Bucket)> = buckets.drain().collect();
        drained.sort_by_key(|(_, bucket)| bucket.first);
        drained
            .into_iter()
            .map(|(key, bucket)| {
                let summary = bucket.summary(&key);
                emit(bucket.level, &summary);
                summary
            })
            .collect()
    }

    /// 当前累计中的 key 数量。
    pub fn pending(&self) -> usize {
        self.buckets.lock().map(|b| b.len()).unwrap_or(0)
    }
}

fn emit(level: Level, message: &str) {
    if level == Level::ERROR {
        error!(target: "gateway.diagnostics", "{}", message);
    } else if level == Level::WARN {
        warn!(target: "gateway.diagnostics", "{}", message);
    } else if level == Level::INFO {
        info!(target: "gateway.diagnostics", "{}", message);
    } else {
        debug!(target: "gateway.diagnostics", "{}", message);
    }
}
