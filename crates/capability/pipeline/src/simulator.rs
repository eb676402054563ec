//! 仿真数据源：不访问控制器，用随机浮点值填充保持寄存器。

use gw_storage::{AddressError, RegisterStore};
use rand_core::{OsRng, RngCore};

/// 随机浮点生成器，取值范围 `[0, 100)`。
pub struct Simulator {
    rng: Box<dyn RngCore + Send>,
}

impl Simulator {
    pub fn new() -> Self {
        Self::with_rng(OsRng)
    }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self { rng: Box::new(rng) }
    }

    /// 高 24 位作为尾数，保证结果严格小于 100。
    pub fn sample(&mut self) -> f32 {
        let bits = self.rng.next_u32() >> 8;
        (bits as f32 / 16_777_216.0) * 100.0
    }

    /// 按寄存器对填充全部保持寄存器，返回写入的寄存器对数量。
    pub fn fill(&mut self, store: &RegisterStore) -> Result<usize, AddressError> {
        let pairs = store.layout().holding_registers / 2;
        for pair in 0..pairs {
            let value = self.sample();
            store.write_float_pair(pair * 2, value)?;
        }
        Ok(pairs)
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_storage::RegisterLayout;

    struct Fixed(u32);

    impl RngCore for Fixed {
        fn next_u32(&mut self) -> u32 {
            self.0
        }

        fn next_u64(&mut self) -> u64 {
            u64::from(self.0)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    #[test]
    fn test_sample_bounds() {
        assert_eq!(Simulator::with_rng(Fixed(0)).sample(), 0.0);
        let max = Simulator::with_rng(Fixed(u32::MAX)).sample();
        assert!(max < 100.0);
        assert!(max > 99.99);
    }

    #[test]
    fn test_fill_skips_trailing_odd_register() {
        let store = RegisterStore::new(RegisterLayout {
            holding_registers: 5,
            coils_read: 0,
            coils_write: 0,
        });
        let mut simulator = Simulator::with_rng(Fixed(u32::MAX / 2));
        assert_eq!(simulator.fill(&store).unwrap(), 2);
        let value = store.read_float_pair(2).unwrap();
        assert!((value - 50.0).abs() < 0.001);
        assert_eq!(store.read_holding(4).unwrap(), 0);
    }
}
