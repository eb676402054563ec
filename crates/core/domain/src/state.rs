use std::fmt;

/// 控制器连接阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionPhase::Disconnected => "DISCONNECTED",
            ConnectionPhase::Connecting => "CONNECTING",
            ConnectionPhase::Connected => "CONNECTED",
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 控制器链路对外发布的事件，由诊断组件订阅。
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// 状态迁移。
    StateChanged {
        from: ConnectionPhase,
        to: ConnectionPhase,
        detail: Option<String>,
    },
    /// 新连接上的标签校验完成。
    TagsLoaded {
        numeric: usize,
        coil_read: usize,
        coil_write: usize,
        skipped: usize,
    },
    /// 断开状态下，处于重连退避窗口内。
    WaitingReconnect,
}
