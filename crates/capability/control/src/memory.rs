//! 内存控制器实现
//!
//! 用于本地测试、台架演示，以及未接入真实会话时的占位。

use crate::client::{ControllerTarget, TagClient, TagError};
use async_trait::async_trait;
use domain::{Clock, TagValue};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

#[derive(Default)]
struct ControllerState {
    tags: HashMap<String, TagValue>,
    connected: bool,
    pending_connect_failures: usize,
    offline: HashSet<String>,
    failing_reads: HashSet<String>,
    failing_writes: HashMap<String, TagError>,
    connect_attempts: Vec<Option<Instant>>,
    group_reads: usize,
    writes: Vec<(String, TagValue)>,
}

/// 内存控制器
pub struct InMemoryController {
    state: RwLock<ControllerState>,
    clock: Option<Arc<dyn Clock>>,
}

impl InMemoryController {
    /// 创建空控制器
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ControllerState::default()),
            clock: None,
        }
    }

    /// 创建带初始标签的控制器
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = (S, TagValue)>,
        S: Into<String>,
    {
        let controller = Self::new();
        {
            let mut state = controller.write();
            for (name, value) in tags {
                state.tags.insert(name.into(), value);
            }
        }
        controller
    }

    /// 使用给定时钟记录连接尝试时间（用于测试）
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn set_tag(&self, name: impl Into<String>, value: TagValue) {
        self.write().tags.insert(name.into(), value);
    }

    pub fn tag(&self, name: &str) -> Option<TagValue> {
        self.read().tags.get(name).copied()
    }

    pub fn is_connected(&self) -> bool {
        self.read().connected
    }

    /// 接下来的 `count` 次连接失败
    pub fn fail_next_connects(&self, count: usize) {
        self.write().pending_connect_failures = count;
    }

    /// 标签下线后读写均被拒绝
    pub fn set_offline(&self, name: &str, offline: bool) {
        let mut state = self.write();
        if offline {
            state.offline.insert(name.to_string());
        } else {
            state.offline.remove(name);
        }
    }

    /// 读取该标签时触发传输故障
    pub fn fail_reads_of(&self, name: &str) {
        self.write().failing_reads.insert(name.to_string());
    }

    /// 写入该标签时返回给定错误
    pub fn fail_writes_of(&self, name: &str, error: TagError) {
        self.write().failing_writes.insert(name.to_string(), error);
    }

    /// 断开当前会话（模拟链路中断）
    pub fn drop_session(&self) {
        self.write().connected = false;
    }

    /// 连接尝试时间（未配置时钟时为 None）
    pub fn connect_attempts(&self) -> Vec<Option<Instant>> {
        self.read().connect_attempts.clone()
    }

    pub fn group_reads(&self) -> usize {
        self.read().group_reads
    }

    pub fn writes(&self) -> Vec<(String, TagValue)> {
        self.read().writes.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, ControllerState> {
        match self.state.read() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, ControllerState> {
        match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for InMemoryController {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerState {
    fn read_one(&self, name: &str) -> Result<TagValue, TagError> {
        if !self.connected {
            return Err(TagError::Transport("not connected".to_string()));
        }
        if self.failing_reads.contains(name) {
            return Err(TagError::Transport(format!("ECONNRESET while reading {}", name)));
        }
        if self.offline.contains(name) {
            return Err(TagError::Rejected(format!("tag {} not available", name)));
        }
        self.tags
            .get(name)
            .copied()
            .ok_or_else(|| TagError::Rejected(format!("unknown tag {}", name)))
    }
}

#[async_trait]
impl TagClient for InMemoryController {
    async fn connect(&self, _target: &ControllerTarget) -> Result<(), TagError> {
        let now = self.clock.as_ref().map(|clock| clock.now());
        let mut state = self.write();
        state.connect_attempts.push(now);
        if state.pending_connect_failures > 0 {
            state.pending_connect_failures -= 1;
            return Err(TagError::Transport("connect ECONNREFUSED".to_string()));
        }
        state.connected = true;
        Ok(())
    }

    async fn read_tag(&self, name: &str) -> Result<TagValue, TagError> {
        self.read().read_one(name)
    }

    async fn read_tags(&self, names: &[String]) -> Result<Vec<TagValue>, TagError> {
        let mut state = self.write();
        state.group_reads += 1;
        names.iter().map(|name| state.read_one(name)).collect()
    }

    async fn write_tag(&self, name: &str, value: TagValue) -> Result<(), TagError> {
        let mut state = self.write();
        if !state.connected {
            return Err(TagError::Transport("not connected".to_string()));
        }
        if let Some(error) = state.failing_writes.get(name) {
            return Err(error.clone());
        }
        if state.offline.contains(name) {
            return Err(TagError::Rejected(format!("tag {} not available", name)));
        }
        state.tags.insert(name.to_string(), value);
        state.writes.push((name.to_string(), value));
        Ok(())
    }

    async fn disconnect(&self) {
        self.write().connected = false;
    }
}
