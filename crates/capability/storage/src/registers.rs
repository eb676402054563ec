use crate::encoding::{decode_f32_pair, encode_f32_pair};
use crate::error::{AddressError, Region};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// 各区域大小。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    pub holding_registers: usize,
    pub coils_read: usize,
    pub coils_write: usize,
}

/// Modbus 可见的寄存器/线圈存储
pub struct RegisterStore {
    holding_registers: Vec<AtomicU16>,
    coils_read: Vec<AtomicBool>,
    coils_write: Vec<AtomicBool>,
}

impl RegisterStore {
    /// 创建全零存储
    pub fn new(layout: RegisterLayout) -> Self {
        Self {
            holding_registers: (0..layout.holding_registers)
                .map(|_| AtomicU16::new(0))
                .collect(),
            coils_read: (0..layout.coils_read)
                .map(|_| AtomicBool::new(false))
                .collect(),
            coils_write: (0..layout.coils_write)
                .map(|_| AtomicBool::new(false))
                .collect(),
        }
    }

    pub fn layout(&self) -> RegisterLayout {
        RegisterLayout {
            holding_registers: self.holding_registers.len(),
            coils_read: self.coils_read.len(),
            coils_write: self.coils_write.len(),
        }
    }

    pub fn read_holding(&self, index: usize) -> Result<u16, AddressError> {
        slot(&self.holding_registers, Region::HoldingRegisters, index)
            .map(|word| word.load(Ordering::Relaxed))
    }

    pub fn write_holding(&self, index: usize, value: u16) -> Result<(), AddressError> {
        slot(&self.holding_registers, Region::HoldingRegisters, index)
            .map(|word| word.store(value, Ordering::Relaxed))
    }

    /// 读取 `base` 与 `base + 1` 两个寄存器
    pub fn read_holding_pair(&self, base: usize) -> Result<(u16, u16), AddressError> {
        let (high, low) = self.pair(base)?;
        Ok((high.load(Ordering::Relaxed), low.load(Ordering::Relaxed)))
    }

    /// 将 f32 以大端寄存器对写入 `base`、`base + 1`
    pub fn write_float_pair(&self, base: usize, value: f32) -> Result<(), AddressError> {
        let (high, low) = self.pair(base)?;
        let [word0, word1] = encode_f32_pair(value);
        high.store(word0, Ordering::Relaxed);
        low.store(word1, Ordering::Relaxed);
        Ok(())
    }

    pub fn read_float_pair(&self, base: usize) -> Result<f32, AddressError> {
        let (word0, word1) = self.read_holding_pair(base)?;
        Ok(decode_f32_pair([word0, word1]))
    }

    pub fn read_coil(&self, index: usize) -> Result<bool, AddressError> {
        slot(&self.coils_read, Region::CoilsRead, index).map(|coil| coil.load(Ordering::Relaxed))
    }

    pub fn set_read_coil(&self, index: usize, value: bool) -> Result<(), AddressError> {
        slot(&self.coils_read, Region::CoilsRead, index)
            .map(|coil| coil.store(value, Ordering::Relaxed))
    }

    pub fn write_coil(&self, index: usize) -> Result<bool, AddressError> {
        slot(&self.coils_write, Region::CoilsWrite, index).map(|coil| coil.load(Ordering::Relaxed))
    }

    pub fn set_write_coil(&self, index: usize, value: bool) -> Result<(), AddressError> {
        slot(&self.coils_write, Region::CoilsWrite, index)
            .map(|coil| coil.store(value, Ordering::Relaxed))
    }

    /// 保持寄存器快照（用于诊断与测试）
    pub fn holding_snapshot(&self) -> Vec<u16> {
        self.holding_registers
            .iter()
            .map(|word| word.load(Ordering::Relaxed))
            .collect()
    }

    pub fn read_coils_snapshot(&self) -> Vec<bool> {
        self.coils_read
            .iter()
            .map(|coil| coil.load(Ordering::Relaxed))
            .collect()
    }

    fn pair(&self, base: usize) -> Result<(&AtomicU16, &AtomicU16), AddressError> {
        let high = slot(&self.holding_registers, Region::HoldingRegisters, base)?;
        let low = slot(
            &self.holding_registers,
            Region::HoldingRegisters,
            base.saturating_add(1),
        )?;
        Ok((high, low))
    }
}

fn slot<T>(slots: &[T], region: Region, index: usize) -> Result<&T, AddressError> {
    slots.get(index).ok_or(AddressError {
        region,
        index,
        len: slots.len(),
    })
}
