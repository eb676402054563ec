//! # 轮询能力模块
//!
//! 固定周期驱动控制器读取与回写：
//!
//! ```text
//! interval ──▶ PollCycle::tick
//!                 ├── ControllerLink::connect        (未连接时)
//!                 ├── ControllerLink::read_group ×3  (数值 / 读线圈 / 写线圈)
//!                 ├── RegisterStore                  (提交编码结果)
//!                 └── ControllerLink::write_tag      (推送写线圈)
//! ```
//!
//! 仿真模式下由 [`Simulator`] 生成数据，不访问控制器。

mod cycle;
mod simulator;

pub use cycle::{CycleOptions, PollCycle, PollSummary, TickOutcome};
pub use simulator::Simulator;
