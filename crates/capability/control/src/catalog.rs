//! 点位分组与在线校验。
//!
//! 每次新连接建立后，逐个读取配置点位确认其在控制器上可用，
//! 按配置顺序组成三个分组。组内序号即寄存器/线圈偏移。

use crate::client::{TagClient, TagError};
use domain::{Point, PointKind};
use tracing::warn;

/// 同类点位的有序分组。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    kind: PointKind,
    names: Vec<String>,
}

impl TagGroup {
    pub fn new(kind: PointKind) -> Self {
        Self {
            kind,
            names: Vec::new(),
        }
    }

    pub fn kind(&self) -> PointKind {
        self.kind
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn push(&mut self, name: String) {
        self.names.push(name);
    }
}

/// 一次连接上校验通过的三个分组。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroups {
    pub numeric: TagGroup,
    pub coil_read: TagGroup,
    pub coil_write: TagGroup,
    /// 校验未通过而跳过的标签
    pub skipped: Vec<String>,
}

impl TagGroups {
    pub fn empty() -> Self {
        Self {
            numeric: TagGroup::new(PointKind::Numeric),
            coil_read: TagGroup::new(PointKind::CoilRead),
            coil_write: TagGroup::new(PointKind::CoilWrite),
            skipped: Vec::new(),
        }
    }

    pub fn group(&self, kind: PointKind) -> &TagGroup {
        match kind {
            PointKind::Numeric => &self.numeric,
            PointKind::CoilRead => &self.coil_read,
            PointKind::CoilWrite => &self.coil_write,
        }
    }

    fn group_mut(&mut self, kind: PointKind) -> &mut TagGroup {
        match kind {
            PointKind::Numeric => &mut self.numeric,
            PointKind::CoilRead => &mut self.coil_read,
            PointKind::CoilWrite => &mut self.coil_write,
        }
    }
}

/// 配置点位目录。
#[derive(Debug, Clone)]
pub struct TagCatalog {
    points: Vec<Point>,
}

impl TagCatalog {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// 在当前会话上校验全部点位并分组。
    ///
    /// 被控制器拒绝的标签跳过；会话级故障直接返回错误。
    pub async fn load(&self, client: &dyn TagClient) -> Result<TagGroups, TagError> {
        let mut groups = TagGroups::empty();
        for point in &self.points {
            match client.read_tag(&point.name).await {
                Ok(_) => groups.group_mut(point.kind).push(point.name.clone()),
                Err(TagError::Rejected(reason)) => {
                    warn!(
                        target: "gateway.catalog",
                        tag = %point.name,
                        kind = %point.kind,
                        reason = %reason,
                        "tag skipped until next reconnect"
                    );
                    groups.skipped.push(point.name.clone());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(groups)
    }
}
