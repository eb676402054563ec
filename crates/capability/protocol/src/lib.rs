//! # 协议通信能力模块
//!
//! 将寄存器存储以 Modbus TCP 从站的形式对外暴露：
//! - **ModbusFacade**：地址换算与请求处理（tokio-modbus `Service`）
//! - **ModbusServer**：TCP 监听，每个连接一个 facade 克隆
//!
//! ## 架构设计
//!
//! ```text
//! Modbus 主站 (SCADA/HMI)
//!       │  TCP
//!       ▼
//! ModbusServer ── accept ──▶ ModbusFacade
//!                                │
//!                                ▼
//!                          RegisterStore ◀── PollCycle
//! ```
//!
//! ## 配置格式
//!
//! ```json
//! {
//!   "host": "0.0.0.0", "port": 502, "unit_id": 1,
//!   "holding_register_base": 0, "coil_read_base": 0, "coil_write_base": 100
//! }
//! ```

mod error;
mod facade;
mod server;

pub use error::ProtocolError;
pub use facade::{AddressMap, ModbusFacade};
pub use server::ModbusServer;
