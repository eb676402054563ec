//! 轮询周期
//!
//! 每个 tick 依次执行：
//!
//! 1. 处理会话上报的异步故障
//! 2. 仿真模式：填充随机值后返回，不访问控制器
//! 3. 未连接：尝试连接后返回（连接成功也不在本 tick 轮询）
//! 4. 批量读取数值组、读线圈组、写线圈组；三组都成功后才提交到寄存器
//! 5. 逐个写线圈点位：重新校验后推送 `coils_write` 中的当前值
//!
//! 任何会话级错误都中止本 tick 的剩余步骤，链路转为 Disconnected。

use crate::simulator::Simulator;
use domain::{PointKind, TagValue};
use gw_control::{ConnectOutcome, ControllerLink, LinkError};
use gw_storage::{AddressError, RegisterStore};
use gw_telemetry::{RepeatLog, fmt_err, record_coil_push_skipped, record_tick};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{Level, debug};

/// 轮询映射参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOptions {
    /// 读线圈点位在读线圈数组中的起始偏移
    pub read_coil_offset: usize,
    /// 写线圈点位的回读值是否镜像到读线圈
    pub mirror_write_coils: bool,
    pub simulation: bool,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            read_coil_offset: 0,
            mirror_write_coils: true,
            simulation: false,
        }
    }
}

/// 一次完整轮询的统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub numeric: usize,
    pub coils_read: usize,
    pub coils_write: usize,
    pub pushed: usize,
    pub skipped: usize,
}

/// 单个 tick 的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 本 tick 只处理连接
    Connect(ConnectOutcome),
    ConnectFailed,
    Simulated,
    Polled(PollSummary),
    /// 会话级错误，剩余步骤已跳过
    Aborted,
}

struct GroupReads {
    numeric: Vec<TagValue>,
    coil_read: Vec<TagValue>,
    coil_write: Vec<TagValue>,
}

/// 轮询驱动：控制器 → 寄存器 → 回写。
pub struct PollCycle {
    link: ControllerLink,
    store: Arc<RegisterStore>,
    options: CycleOptions,
    simulator: Simulator,
    repeats: Arc<RepeatLog>,
    ticks: u64,
}

impl PollCycle {
    pub fn new(
        link: ControllerLink,
        store: Arc<RegisterStore>,
        options: CycleOptions,
        repeats: Arc<RepeatLog>,
    ) -> Self {
        Self {
            link,
            store,
            options,
            simulator: Simulator::new(),
            repeats,
            ticks: 0,
        }
    }

    pub fn with_simulator(mut self, simulator: Simulator) -> Self {
        self.simulator = simulator;
        self
    }

    pub fn link(&self) -> &ControllerLink {
        &self.link
    }

    pub fn options(&self) -> CycleOptions {
        self.options
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// 固定周期驱动 tick；上一个 tick 完成前不会开始下一个。
    pub async fn run(&mut self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcome = self.tick().await;
            debug!(target: "gateway.poll", tick = self.ticks, outcome = ?outcome, "tick finished");
        }
    }

    /// 执行一个 tick。
    pub async fn tick(&mut self) -> TickOutcome {
        self.ticks += 1;
        record_tick();
        self.link.drain_faults().await;

        if self.options.simulation {
            if let Err(err) = self.simulator.fill(&self.store) {
                self.store_failed("simulation", &err);
            }
            return TickOutcome::Simulated;
        }

        if !self.link.is_connected() {
            return match self.link.connect().await {
                Ok(outcome) => TickOutcome::Connect(outcome),
                Err(_) => TickOutcome::ConnectFailed,
            };
        }

        let reads = match self.read_groups().await {
            Ok(reads) => reads,
            Err(err) => {
                debug!(target: "gateway.poll", error = %fmt_err(&err), "tick aborted");
                return TickOutcome::Aborted;
            }
        };
        self.commit(&reads);

        let mut summary = PollSummary {
            numeric: reads.numeric.len(),
            coils_read: reads.coil_read.len(),
            coils_write: reads.coil_write.len(),
            ..PollSummary::default()
        };
        match self.push_write_coils(&mut summary).await {
            Ok(()) => TickOutcome::Polled(summary),
            Err(err) => {
                debug!(target: "gateway.poll", error = %fmt_err(&err), "tick aborted");
                TickOutcome::Aborted
            }
        }
    }

    /// 进程退出时断开控制器。
    pub async fn shutdown(&mut self) {
        self.link.shutdown().await;
    }

    async fn read_groups(&mut self) -> Result<GroupReads, LinkError> {
        let numeric = self.link.read_group(PointKind::Numeric).await?;
        let coil_read = self.link.read_group(PointKind::CoilRead).await?;
        let coil_write = self.link.read_group(PointKind::CoilWrite).await?;
        Ok(GroupReads {
            numeric,
            coil_read,
            coil_write,
        })
    }

    /// 数值点位 i → 寄存器 `(2i, 2i+1)`；读线圈点位 k → `offset + k`；
    /// 写线圈点位 j 的回读 → `offset + n_read + j`。
    fn commit(&self, reads: &GroupReads) {
        for (i, value) in reads.numeric.iter().enumerate() {
            if let Err(err) = self.store.write_float_pair(i * 2, value.as_f32()) {
                self.store_failed("numeric", &err);
            }
        }

        let offset = self.options.read_coil_offset;
        for (k, value) in reads.coil_read.iter().enumerate() {
            if let Err(err) = self.store.set_read_coil(offset + k, value.as_bool()) {
                self.store_failed("coil_read", &err);
            }
        }

        if self.options.mirror_write_coils {
            let mirror = offset + reads.coil_read.len();
            for (j, value) in reads.coil_write.iter().enumerate() {
                if let Err(err) = self.store.set_read_coil(mirror + j, value.as_bool()) {
                    self.store_failed("coil_write_mirror", &err);
                }
            }
        }
    }

    async fn push_write_coils(&mut self, summary: &mut PollSummary) -> Result<(), LinkError> {
        let Some(groups) = self.link.groups() else {
            return Err(LinkError::NotConnected);
        };
        for (j, name) in groups.coil_write.names().iter().enumerate() {
            let value = match self.store.write_coil(j) {
                Ok(value) => value,
                Err(err) => {
                    self.store_failed("coil_write", &err);
                    summary.skipped += 1;
                    continue;
                }
            };

            if !self.link.validate_tag(name).await? {
                record_coil_push_skipped();
                self.repeats.record(
                    &format!("offline:{}", name),
                    format!("write tag {} offline, push skipped", name),
                    Level::WARN,
                );
                summary.skipped += 1;
                continue;
            }

            match self.link.write_tag(name, value).await {
                Ok(()) => summary.pushed += 1,
                Err(err) if err.dropped_session() => return Err(err),
                Err(_) => {
                    record_coil_push_skipped();
                    summary.skipped += 1;
                }
            }
        }
        Ok(())
    }

    fn store_failed(&self, what: &str, err: &AddressError) {
        self.repeats
            .record(&format!("store:{}", what), fmt_err(err), Level::ERROR);
    }
}
