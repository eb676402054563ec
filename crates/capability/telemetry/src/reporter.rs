//! 连接状态迁移日志。

use crate::repeat::RepeatLog;
use domain::{ConnectionPhase, LinkEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// 订阅 [`LinkEvent`] 并输出状态迁移日志。
///
/// - 仅在状态真正变化时输出 `STATE: from -> to`
/// - 进入 `CONNECTED` 时刷新重复日志汇总
/// - 每次断开期间 "waiting for reconnect" 只输出一次
pub struct StateReporter {
    current: Option<ConnectionPhase>,
    waiting_notice_printed: bool,
    repeats: Arc<RepeatLog>,
}

impl StateReporter {
    pub fn new(repeats: Arc<RepeatLog>) -> Self {
        Self {
            current: None,
            waiting_notice_printed: false,
            repeats,
        }
    }

    pub fn current(&self) -> Option<ConnectionPhase> {
        self.current
    }

    /// 处理单个事件，返回输出的日志行（无输出时为 None）。
    pub fn observe(&mut self, event: &LinkEvent) -> Option<String> {
        match event {
            LinkEvent::StateChanged { to, detail, .. } => {
                if self.current == Some(*to) {
                    return None;
                }
                let from = self
                    .current
                    .map(|phase| phase.as_str())
                    .unwrap_or("INIT");
                let line = match detail {
                    Some(detail) => format!("STATE: {} -> {} | {}", from, to, detail),
                    None => format!("STATE: {} -> {}", from, to),
                };
                info!(target: "gateway.state", "{}", line);
                self.current = Some(*to);
                if *to == ConnectionPhase::Connected {
                    self.repeats.flush();
                    self.waiting_notice_printed = false;
                }
                Some(line)
            }
            LinkEvent::TagsLoaded {
                numeric,
                coil_read,
                coil_write,
                skipped,
            } => {
                let line = format!(
                    "tags loaded: numeric={} coil_read={} coil_write={} skipped={}",
                    numeric, coil_read, coil_write, skipped
                );
                info!(target: "gateway.state", "{}", line);
                Some(line)
            }
            LinkEvent::WaitingReconnect => {
                if self.waiting_notice_printed {
                    return None;
                }
                self.waiting_notice_printed = true;
                let line = "waiting for reconnect".to_string();
                info!(target: "gateway.state", "{}", line);
                Some(line)
            }
        }
    }

    /// 在后台消费事件通道，通道关闭后退出。
    pub fn spawn(mut self, mut events: mpsc::UnboundedReceiver<LinkEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.observe(&event);
            }
        })
    }
}
