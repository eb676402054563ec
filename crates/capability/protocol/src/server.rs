//! Modbus TCP 从站监听
//!
//! 每个连接获得一个 [`ModbusFacade`] 克隆，共享同一份寄存器存储。
//! 单个连接上的 IO 错误只记录日志，不影响监听和其他连接。

use crate::error::ProtocolError;
use crate::facade::ModbusFacade;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_modbus::server::tcp::{Server, accept_tcp_connection};
use tracing::{debug, info, warn};

/// 已绑定端口的从站。
pub struct ModbusServer {
    listener: TcpListener,
    facade: ModbusFacade,
    unit_id: u8,
}

impl ModbusServer {
    /// 绑定监听地址；`host` 可以是 IP 或主机名
    pub async fn bind(
        host: &str,
        port: u16,
        unit_id: u8,
        facade: ModbusFacade,
    ) -> Result<Self, ProtocolError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| ProtocolError::Bind {
                addr: format!("{}:{}", host, port),
                source,
            })?;
        Ok(Self {
            listener,
            facade,
            unit_id,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        Ok(self.listener.local_addr()?)
    }

    /// 持续接受连接，直到监听本身出错
    pub async fn serve(self) -> Result<(), ProtocolError> {
        let local_addr = self.local_addr()?;
        let map = self.facade.map();
        info!(
            target: "gateway.modbus",
            addr = %local_addr,
            unit_id = self.unit_id,
            hr_base = map.holding_register_base,
            coil_read_base = map.coil_read_base,
            coil_write_base = map.coil_write_base,
            "modbus server listening"
        );

        let facade = self.facade;
        let server = Server::new(self.listener);
        let on_connected = move |stream, socket_addr: SocketAddr| {
            let facade = facade.clone();
            async move {
                debug!(target: "gateway.modbus", peer = %socket_addr, "modbus client connected");
                accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                    Ok(Some(facade.clone()))
                })
            }
        };
        let on_process_error = |err| {
            warn!(target: "gateway.modbus", error = %err, "modbus connection error");
        };

        server.serve(&on_connected, on_process_error).await?;
        Ok(())
    }
}
