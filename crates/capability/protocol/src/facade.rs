//! Modbus 从站请求处理
//!
//! 外部地址减去各区域起始地址得到存储索引：
//!
//! | 功能 | 区域 |
//! |------|------|
//! | 读保持寄存器 (0x03) | `holding_register_base` |
//! | 写单个/多个保持寄存器 (0x06/0x10) | `holding_register_base` |
//! | 读线圈 (0x01) | 先查读线圈区，再查写线圈区 |
//! | 写单个/多个线圈 (0x05/0x0F) | 仅写线圈区 |
//!
//! 越界请求返回 `IllegalDataAddress`，数量为 0 的请求返回 `IllegalDataValue`；
//! 两者都不修改任何存储，也不关闭连接。

use gw_storage::RegisterStore;
use gw_telemetry::{record_modbus_exception, record_modbus_request};
use std::future;
use std::sync::Arc;
use tokio_modbus::prelude::*;
use tracing::debug;

/// 各区域的外部起始地址。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressMap {
    pub holding_register_base: u16,
    pub coil_read_base: u16,
    pub coil_write_base: u16,
}

impl AddressMap {
    fn index(base: u16, addr: u32, len: usize) -> Option<usize> {
        let offset = addr.checked_sub(u32::from(base))? as usize;
        (offset < len).then_some(offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoilSlot {
    Read(usize),
    Write(usize),
}

/// 连续地址区间，u32 避免 `addr + cnt` 溢出。
fn span(addr: u16, count: usize) -> Result<impl Iterator<Item = u32>, ExceptionCode> {
    if count == 0 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let start = u32::from(addr);
    Ok(start..start + count as u32)
}

/// 将寄存器存储暴露为 Modbus 从站。
#[derive(Clone)]
pub struct ModbusFacade {
    store: Arc<RegisterStore>,
    map: AddressMap,
}

impl ModbusFacade {
    pub fn new(store: Arc<RegisterStore>, map: AddressMap) -> Self {
        Self { store, map }
    }

    pub fn map(&self) -> AddressMap {
        self.map
    }

    pub fn read_holding_registers(&self, addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
        span(addr, usize::from(cnt))?
            .map(|address| {
                let index = self.holding_index(address)?;
                self.store
                    .read_holding(index)
                    .map_err(|_| ExceptionCode::IllegalDataAddress)
            })
            .collect()
    }

    /// 先校验整个区间，再写入。
    pub fn write_holding_registers(&self, addr: u16, values: &[u16]) -> Result<(), ExceptionCode> {
        let indices = span(addr, values.len())?
            .map(|address| self.holding_index(address))
            .collect::<Result<Vec<_>, _>>()?;
        for (index, value) in indices.into_iter().zip(values) {
            self.store
                .write_holding(index, *value)
                .map_err(|_| ExceptionCode::IllegalDataAddress)?;
        }
        Ok(())
    }

    pub fn read_coils(&self, addr: u16, cnt: u16) -> Result<Vec<bool>, ExceptionCode> {
        span(addr, usize::from(cnt))?
            .map(|address| {
                let value = match self.coil_slot(address)? {
                    CoilSlot::Read(index) => self.store.read_coil(index),
                    CoilSlot::Write(index) => self.store.write_coil(index),
                };
                value.map_err(|_| ExceptionCode::IllegalDataAddress)
            })
            .collect()
    }

    /// 只接受写线圈区；先校验整个区间，再写入。
    pub fn write_coils(&self, addr: u16, values: &[bool]) -> Result<(), ExceptionCode> {
        let len = self.store.layout().coils_write;
        let indices = span(addr, values.len())?
            .map(|address| {
                AddressMap::index(self.map.coil_write_base, address, len)
                    .ok_or(ExceptionCode::IllegalDataAddress)
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (index, value) in indices.into_iter().zip(values) {
            self.store
                .set_write_coil(index, *value)
                .map_err(|_| ExceptionCode::IllegalDataAddress)?;
        }
        Ok(())
    }

    fn holding_index(&self, address: u32) -> Result<usize, ExceptionCode> {
        AddressMap::index(
            self.map.holding_register_base,
            address,
            self.store.layout().holding_registers,
        )
        .ok_or(ExceptionCode::IllegalDataAddress)
    }

    fn coil_slot(&self, address: u32) -> Result<CoilSlot, ExceptionCode> {
        let layout = self.store.layout();
        if let Some(index) = AddressMap::index(self.map.coil_read_base, address, layout.coils_read)
        {
            return Ok(CoilSlot::Read(index));
        }
        AddressMap::index(self.map.coil_write_base, address, layout.coils_write)
            .map(CoilSlot::Write)
            .ok_or(ExceptionCode::IllegalDataAddress)
    }
}

impl tokio_modbus::server::Service for ModbusFacade {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        record_modbus_request();
        debug!(target: "gateway.modbus", request = ?req, "modbus request");

        let res = match req {
            Request::ReadHoldingRegisters(addr, cnt) => self
                .read_holding_registers(addr, cnt)
                .map(Response::ReadHoldingRegisters),
            Request::WriteSingleRegister(addr, value) => self
                .write_holding_registers(addr, std::slice::from_ref(&value))
                .map(|_| Response::WriteSingleRegister(addr, value)),
            Request::WriteMultipleRegisters(addr, values) => self
                .write_holding_registers(addr, &values)
                .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16)),
            Request::ReadCoils(addr, cnt) => self.read_coils(addr, cnt).map(Response::ReadCoils),
            Request::WriteSingleCoil(addr, value) => self
                .write_coils(addr, std::slice::from_ref(&value))
                .map(|_| Response::WriteSingleCoil(addr, value)),
            Request::WriteMultipleCoils(addr, values) => self
                .write_coils(addr, &values)
                .map(|_| Response::WriteMultipleCoils(addr, values.len() as u16)),
            _ => Err(ExceptionCode::IllegalFunction),
        };

        if let Err(code) = &res {
            record_modbus_exception();
            debug!(target: "gateway.modbus", exception = ?code, "modbus request rejected");
        }

        future::ready(res)
    }
}
