//! # 寄存器存储模块
//!
//! 保存网关对 Modbus 侧可见的全部实时状态：
//!
//! - **保持寄存器**（`holding_registers`）：16 位无符号字，数值点位按浮点对编码写入
//! - **读线圈**（`coils_read`）：控制器布尔点位、写线圈反馈与故障位
//! - **写线圈**（`coils_write`）：Modbus 客户端写入、等待推送到控制器的值
//!
//! ## 并发模型
//!
//! 每个槽位都是原子类型，读写互不阻塞：
//!
//! - 轮询周期是保持寄存器与读线圈的唯一写入方
//! - Modbus 请求处理是写线圈的唯一写入方
//!
//! 所有访问都做越界检查，越界返回 [`AddressError`]，不会 panic。

mod encoding;
mod error;
mod registers;

pub use encoding::{decode_f32_pair, encode_f32_pair};
pub use error::{AddressError, Region};
pub use registers::{RegisterLayout, RegisterStore};
