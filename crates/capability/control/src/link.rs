//! 控制器链路状态机
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──ok──▶ Connected
//!      ▲                        │                  │
//!      └────────failure─────────┘◀────I/O error────┘
//! ```
//!
//! - 每次状态迁移同步更新故障位（非 Connected 即置位）
//! - 连接失败后，`reconnect_delay` 内不再发起新的连接尝试
//! - `error_log_window` 只控制连接日志的输出频率，不限制尝试；窗口内的失败
//!   尝试不发出 Connecting/Disconnected 事件，错误计入 `controller.connect` 汇总
//! - 连接断开时丢弃已加载的分组，下次连接成功后重新校验

use crate::catalog::{TagCatalog, TagGroups};
use crate::client::{
    ControllerTarget, FaultClass, FaultReporter, SessionFault, TagClient, TagError, classify_fault,
};
use domain::{Clock, ConnectionPhase, LinkEvent, PointKind, TagValue};
use gw_storage::RegisterStore;
use gw_telemetry::{
    RepeatLog, fmt_err, new_session_id, record_coil_push, record_coil_push_failure,
    record_connect_attempt, record_connect_failure, record_group_read, record_group_read_failure,
    record_transport_fault,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{Level, error, info, warn};

/// 链路错误。
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("controller not connected")]
    NotConnected,
    #[error("connect failed")]
    Connect(#[source] TagError),
    #[error("{kind} group read failed")]
    GroupRead {
        kind: PointKind,
        #[source]
        source: TagError,
    },
    #[error("validation of {tag} failed")]
    Validate {
        tag: String,
        #[source]
        source: TagError,
    },
    #[error("write of {tag} failed")]
    Write {
        tag: String,
        #[source]
        source: TagError,
    },
}

impl LinkError {
    /// 该错误是否导致会话断开。
    pub fn dropped_session(&self) -> bool {
        match self {
            LinkError::NotConnected | LinkError::Connect(_) | LinkError::GroupRead { .. } => true,
            LinkError::Validate { source, .. } | LinkError::Write { source, .. } => {
                source.is_transport()
            }
        }
    }
}

/// 连接尝试结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// 已连接或正在连接，未做任何事
    AlreadyConnected,
    /// 本次尝试成功，分组已重新加载
    Connected,
    /// 处于重连退避窗口内，未尝试
    Deferred,
}

/// 链路参数。
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub target: ControllerTarget,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
    pub error_log_window: Duration,
}

/// 故障位：读线圈中的一个槽位。
#[derive(Clone)]
pub struct FaultSignal {
    store: Arc<RegisterStore>,
    coil: usize,
}

impl FaultSignal {
    pub fn new(store: Arc<RegisterStore>, coil: usize) -> Self {
        Self { store, coil }
    }

    pub fn coil(&self) -> usize {
        self.coil
    }

    pub fn is_set(&self) -> bool {
        self.store.read_coil(self.coil).unwrap_or(true)
    }

    fn set(&self, faulted: bool) {
        if let Err(err) = self.store.set_read_coil(self.coil, faulted) {
            warn!(target: "gateway.link", error = %err, "fault coil not updated");
        }
    }
}

/// 控制器链路。
pub struct ControllerLink {
    client: Arc<dyn TagClient>,
    catalog: TagCatalog,
    settings: LinkSettings,
    clock: Arc<dyn Clock>,
    repeats: Arc<RepeatLog>,
    fault: FaultSignal,
    events: Option<mpsc::UnboundedSender<LinkEvent>>,
    faults_tx: mpsc::UnboundedSender<SessionFault>,
    faults_rx: mpsc::UnboundedReceiver<SessionFault>,
    phase: ConnectionPhase,
    last_error_at: Option<Instant>,
    failure_logged_at: Option<Instant>,
    next_attempt_at: Option<Instant>,
    groups: Option<Arc<TagGroups>>,
    session_id: Option<String>,
    tag_loads: u64,
}

impl ControllerLink {
    /// 创建处于 Disconnected 的链路，故障位立即置位。
    pub fn new(
        client: Arc<dyn TagClient>,
        catalog: TagCatalog,
        settings: LinkSettings,
        fault: FaultSignal,
        repeats: Arc<RepeatLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (faults_tx, faults_rx) = mpsc::unbounded_channel();
        fault.set(true);
        Self {
            client,
            catalog,
            settings,
            clock,
            repeats,
            fault,
            events: None,
            faults_tx,
            faults_rx,
            phase: ConnectionPhase::Disconnected,
            last_error_at: None,
            failure_logged_at: None,
            next_attempt_at: None,
            groups: None,
            session_id: None,
            tag_loads: 0,
        }
    }

    /// 订阅状态事件。
    pub fn with_events(mut self, events: mpsc::UnboundedSender<LinkEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    pub fn tags_loaded(&self) -> bool {
        self.groups.is_some()
    }

    /// 当前连接上的分组（未连接时为 None）。
    pub fn groups(&self) -> Option<Arc<TagGroups>> {
        self.groups.clone()
    }

    /// 成功加载分组的累计次数。
    pub fn tag_loads(&self) -> u64 {
        self.tag_loads
    }

    pub fn last_error_at(&self) -> Option<Instant> {
        self.last_error_at
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn fault(&self) -> &FaultSignal {
        &self.fault
    }

    /// 交给会话实现，用于上报异步故障。
    pub fn fault_reporter(&self) -> FaultReporter {
        FaultReporter::new(self.faults_tx.clone())
    }

    /// 尝试建立连接。
    ///
    /// 已连接时幂等；调用方需保证不并发调用（轮询周期是唯一调用方）。
    pub async fn connect(&mut self) -> Result<ConnectOutcome, LinkError> {
        if self.phase != ConnectionPhase::Disconnected {
            return Ok(ConnectOutcome::AlreadyConnected);
        }
        let now = self.clock.now();
        if let Some(at) = self.next_attempt_at {
            if now < at {
                self.emit(LinkEvent::WaitingReconnect);
                return Ok(ConnectOutcome::Deferred);
            }
        }

        record_connect_attempt();
        let quiet = self.within_error_window(now);
        if !quiet {
            info!(
                target: "gateway.link",
                ip = %self.settings.target.ip,
                slot = self.settings.target.slot,
                "connecting to controller"
            );
        }
        self.set_phase(ConnectionPhase::Connecting, None, !quiet);

        let connected = match tokio::time::timeout(
            self.settings.connect_timeout,
            self.client.connect(&self.settings.target),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TagError::Timeout(format!(
                "connect timed out after {} ms",
                self.settings.connect_timeout.as_millis()
            ))),
        };
        if let Err(err) = connected {
            return Err(self.connect_failed(err, quiet).await);
        }

        let groups = match self.catalog.load(self.client.as_ref()).await {
            Ok(groups) => groups,
            Err(err) => return Err(self.connect_failed(err, quiet).await),
        };

        let session_id = new_session_id();
        self.emit(LinkEvent::TagsLoaded {
            numeric: groups.numeric.len(),
            coil_read: groups.coil_read.len(),
            coil_write: groups.coil_write.len(),
            skipped: groups.skipped.len(),
        });
        self.groups = Some(Arc::new(groups));
        self.tag_loads += 1;
        self.next_attempt_at = None;
        self.failure_logged_at = None;
        let detail = format!(
            "{} slot {} session {}",
            self.settings.target.ip, self.settings.target.slot, session_id
        );
        self.session_id = Some(session_id);
        self.transition(ConnectionPhase::Connected, Some(detail));
        Ok(ConnectOutcome::Connected)
    }

    /// 批量读取一个分组；任何失败都使整组失败并断开会话。
    pub async fn read_group(&mut self, kind: PointKind) -> Result<Vec<TagValue>, LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        let Some(groups) = self.groups.clone() else {
            return Err(LinkError::NotConnected);
        };
        let group = groups.group(kind);
        if group.is_empty() {
            return Ok(Vec::new());
        }

        let result = match self.client.read_tags(group.names()).await {
            Ok(values) if values.len() == group.len() => Ok(values),
            Ok(values) => Err(TagError::Transport(format!(
                "expected {} values, got {}",
                group.len(),
                values.len()
            ))),
            Err(err) => Err(err),
        };

        match result {
            Ok(values) => {
                record_group_read();
                Ok(values)
            }
            Err(source) => {
                record_group_read_failure();
                let err = LinkError::GroupRead { kind, source };
                self.connection_lost(fmt_err(&err)).await;
                Err(err)
            }
        }
    }

    /// 重新确认标签在线；被拒绝返回 `Ok(false)`。
    pub async fn validate_tag(&mut self, name: &str) -> Result<bool, LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        match self.client.read_tag(name).await {
            Ok(_) => Ok(true),
            Err(TagError::Rejected(_)) => Ok(false),
            Err(source) => {
                let err = LinkError::Validate {
                    tag: name.to_string(),
                    source,
                };
                self.connection_lost(fmt_err(&err)).await;
                Err(err)
            }
        }
    }

    /// 写入布尔标签。
    ///
    /// 被拒绝时仅返回错误；传输故障时同时断开会话。
    pub async fn write_tag(&mut self, name: &str, value: bool) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        match self.client.write_tag(name, TagValue::Bool(value)).await {
            Ok(()) => {
                record_coil_push();
                Ok(())
            }
            Err(source) => {
                record_coil_push_failure();
                let err = LinkError::Write {
                    tag: name.to_string(),
                    source,
                };
                if err.dropped_session() {
                    self.connection_lost(fmt_err(&err)).await;
                } else {
                    self.repeats
                        .record(&format!("write:{}", name), fmt_err(&err), Level::WARN);
                }
                Err(err)
            }
        }
    }

    /// 处理会话上报的异步故障，返回处理条数。
    pub async fn drain_faults(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(fault) = self.faults_rx.try_recv() {
            handled += 1;
            record_transport_fault();
            let class = classify_fault(&fault.message);
            if self.phase == ConnectionPhase::Disconnected {
                self.repeats
                    .record("controller.fault", fault.message.clone(), Level::WARN);
                continue;
            }
            match class {
                FaultClass::Transport => {
                    warn!(target: "gateway.link", fault = %fault.message, "controller session fault");
                }
                FaultClass::Fatal => {
                    error!(target: "gateway.link", fault = %fault.message, "fatal controller fault");
                }
            }
            self.connection_lost(format!("session fault: {}", fault.message))
                .await;
        }
        handled
    }

    /// 主动断开（进程退出时）。
    pub async fn shutdown(&mut self) {
        self.client.disconnect().await;
        self.groups = None;
        self.session_id = None;
        if self.phase != ConnectionPhase::Disconnected {
            self.transition(ConnectionPhase::Disconnected, Some("shutdown".to_string()));
        }
    }

    /// `quiet` 为真时失败只计入汇总，不输出日志也不发出状态事件。
    async fn connect_failed(&mut self, source: TagError, quiet: bool) -> LinkError {
        record_connect_failure();
        let err = LinkError::Connect(source);
        let line = fmt_err(&err);
        let now = self.clock.now();
        if quiet {
            self.repeats
                .record("controller.connect", line.clone(), Level::WARN);
        } else {
            warn!(target: "gateway.link", error = %line, "failed to connect to controller");
            self.failure_logged_at = Some(now);
        }
        self.last_error_at = Some(now);
        self.next_attempt_at = Some(now + self.settings.reconnect_delay);
        self.groups = None;
        self.client.disconnect().await;
        self.set_phase(ConnectionPhase::Disconnected, Some(line), !quiet);
        err
    }

    async fn connection_lost(&mut self, reason: String) {
        if self.phase == ConnectionPhase::Disconnected {
            return;
        }
        self.last_error_at = Some(self.clock.now());
        self.groups = None;
        self.session_id = None;
        self.client.disconnect().await;
        self.transition(ConnectionPhase::Disconnected, Some(reason));
    }

    /// 上一条连接失败日志是否仍在抑制窗口内。
    fn within_error_window(&self, now: Instant) -> bool {
        self.failure_logged_at
            .map(|at| now.duration_since(at) < self.settings.error_log_window)
            .unwrap_or(false)
    }

    fn transition(&mut self, to: ConnectionPhase, detail: Option<String>) {
        self.set_phase(to, detail, true);
    }

    fn set_phase(&mut self, to: ConnectionPhase, detail: Option<String>, announce: bool) {
        let from = self.phase;
        self.phase = to;
        self.fault.set(to != ConnectionPhase::Connected);
        if announce {
            self.emit(LinkEvent::StateChanged { from, to, detail });
        }
    }

    fn emit(&self, event: LinkEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
