//! 存储层错误类型
//!
//! 寄存器存储只有一种失败：访问越界。

use std::fmt;

/// 寄存器区域。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    HoldingRegisters,
    CoilsRead,
    CoilsWrite,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::HoldingRegisters => "holding register",
            Region::CoilsRead => "read coil",
            Region::CoilsWrite => "write coil",
        };
        f.write_str(name)
    }
}

/// 越界访问错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {region} address: index {index} outside 0..{len}")]
pub struct AddressError {
    pub region: Region,
    pub index: usize,
    pub len: usize,
}
