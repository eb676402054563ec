//! # 控制器链路能力模块
//!
//! 面向标签寻址的工业控制器：
//!
//! - [`TagClient`]：控制器会话抽象（连接、读标签、批量读、写标签、断开）
//! - [`TagCatalog`]：将配置点位按在线校验结果分为数值、读线圈、写线圈三组
//! - [`ControllerLink`]：连接状态机、重连退避、故障位与三类读写原语
//! - [`InMemoryController`]：内存实现，用于测试与台架
//! - [`UnattachedClient`]：未接入会话时使用，连接始终失败
//!
//! ## 错误分层
//!
//! ```text
//! TagError (会话层)
//!   ├── Rejected   → 标签级，跳过该点位
//!   └── Transport / Timeout → 会话级，链路转为 Disconnected
//! LinkError (链路层)
//!   └── 携带 TagError 作为 source
//! ```

mod catalog;
mod client;
mod link;
mod memory;

pub use catalog::{TagCatalog, TagGroup, TagGroups};
pub use client::{
    ControllerTarget, FaultClass, FaultReporter, SessionFault, TagClient, TagError,
    UnattachedClient, classify_fault,
};
pub use link::{ConnectOutcome, ControllerLink, FaultSignal, LinkError, LinkSettings};
pub use memory::InMemoryController;
