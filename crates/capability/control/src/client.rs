use async_trait::async_trait;
use domain::TagValue;
use tokio::sync::mpsc;

/// 控制器地址。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerTarget {
    pub ip: String,
    pub slot: u8,
}

/// 控制器会话错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TagError {
    /// 会话/传输层故障，连接不可再用
    #[error("transport error: {0}")]
    Transport(String),
    /// 控制器拒绝该标签（不存在、类型不符等），会话仍可用
    #[error("tag rejected: {0}")]
    Rejected(String),
    #[error("timeout: {0}")]
    Timeout(String),
}

impl TagError {
    /// 是否意味着会话已失效。
    pub fn is_transport(&self) -> bool {
        !matches!(self, TagError::Rejected(_))
    }
}

/// 控制器会话抽象（标签寻址协议的客户端）。
///
/// 实现方负责会话与传输细节；网关只调用连接、读、写、断开。
#[async_trait]
pub trait TagClient: Send + Sync {
    async fn connect(&self, target: &ControllerTarget) -> Result<(), TagError>;

    async fn read_tag(&self, name: &str) -> Result<TagValue, TagError>;

    /// 批量读取，全部成功或整体失败。
    async fn read_tags(&self, names: &[String]) -> Result<Vec<TagValue>, TagError>;

    async fn write_tag(&self, name: &str, value: TagValue) -> Result<(), TagError>;

    async fn disconnect(&self);
}

/// 未接入会话时的占位客户端：所有调用都返回传输错误，链路保持 Disconnected。
#[derive(Debug, Clone, Default)]
pub struct UnattachedClient;

impl UnattachedClient {
    const REASON: &'static str = "no controller session attached";
}

#[async_trait]
impl TagClient for UnattachedClient {
    async fn connect(&self, target: &ControllerTarget) -> Result<(), TagError> {
        Err(TagError::Transport(format!(
            "{} ({} slot {})",
            Self::REASON,
            target.ip,
            target.slot
        )))
    }

    async fn read_tag(&self, _name: &str) -> Result<TagValue, TagError> {
        Err(TagError::Transport(Self::REASON.to_string()))
    }

    async fn read_tags(&self, _names: &[String]) -> Result<Vec<TagValue>, TagError> {
        Err(TagError::Transport(Self::REASON.to_string()))
    }

    async fn write_tag(&self, _name: &str, _value: TagValue) -> Result<(), TagError> {
        Err(TagError::Transport(Self::REASON.to_string()))
    }

    async fn disconnect(&self) {}
}

/// 会话异步故障通知。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFault {
    pub message: String,
}

/// 会话实现用来上报异步故障的句柄。
#[derive(Debug, Clone)]
pub struct FaultReporter {
    tx: mpsc::UnboundedSender<SessionFault>,
}

impl FaultReporter {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SessionFault>) -> Self {
        Self { tx }
    }

    pub fn report(&self, message: impl Into<String>) {
        let _ = self.tx.send(SessionFault {
            message: message.into(),
        });
    }
}

/// 故障分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// 已知的传输层故障，按断线处理
    Transport,
    /// 未识别的故障
    Fatal,
}

const TRANSPORT_SIGNATURES: &[&str] = &[
    "econnreset",
    "epipe",
    "etimedout",
    "econnrefused",
    "ehostunreach",
    "enetunreach",
    "socket hang up",
    "connection reset",
    "broken pipe",
];

/// 按消息特征对故障分类。
pub fn classify_fault(message: &str) -> FaultClass {
    let message = message.to_ascii_lowercase();
    if TRANSPORT_SIGNATURES
        .iter()
        .any(|signature| message.contains(signature))
    {
        FaultClass::Transport
    } else {
        FaultClass::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_fault() {
        assert_eq!(
            classify_fault("read ECONNRESET 10.0.0.5:44818"),
            FaultClass::Transport
        );
        assert_eq!(classify_fault("Socket hang up"), FaultClass::Transport);
        assert_eq!(
            classify_fault("Cannot read properties of undefined"),
            FaultClass::Fatal
        );
    }

    #[test]
    fn test_rejected_is_not_transport() {
        assert!(!TagError::Rejected("x".to_string()).is_transport());
        assert!(TagError::Timeout("x".to_string()).is_transport());
        assert!(TagError::Transport("x".to_string()).is_transport());
    }
}
