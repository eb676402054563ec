//! PLC 标签 → Modbus TCP 从站网关。

mod bench;

use domain::{Clock, SystemClock};
use gw_config::AppConfig;
use gw_control::{ControllerLink, ControllerTarget, FaultSignal, LinkSettings, TagCatalog};
use gw_pipeline::{CycleOptions, PollCycle};
use gw_protocol::{AddressMap, ModbusFacade, ModbusServer};
use gw_storage::{RegisterLayout, RegisterStore};
use gw_telemetry::{RepeatLog, StateReporter, init_tracing, metrics};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量定位配置文件
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();
    install_panic_hook();

    let gateway = config.load_gateway()?;
    info!(target: "gateway", "{}", gateway.welcome_message);
    info!(
        target: "gateway",
        config = %config.config_path.display(),
        points = gateway.points.len(),
        simulation = gateway.simulation,
        bench = gateway.bench_controller,
        "configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(RegisterStore::new(RegisterLayout {
        holding_registers: gateway.modbus.holding_registers,
        coils_read: gateway.modbus.coils_read,
        coils_write: gateway.modbus.coils_write,
    }));
    let repeats = Arc::new(RepeatLog::new(
        gateway.repeat_summary_window(),
        clock.clone(),
    ));

    // 状态迁移日志由独立任务输出
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let reporter = StateReporter::new(repeats.clone()).spawn(events_rx);

    let controller = bench::controller_client(&gateway);
    let link = ControllerLink::new(
        controller,
        TagCatalog::new(gateway.points()),
        LinkSettings {
            target: ControllerTarget {
                ip: gateway.controller.ip.clone(),
                slot: gateway.controller.slot,
            },
            connect_timeout: gateway.connect_timeout(),
            reconnect_delay: gateway.reconnect_delay(),
            error_log_window: gateway.error_log_window(),
        },
        FaultSignal::new(store.clone(), gateway.fault_coil),
        repeats.clone(),
        clock,
    )
    .with_events(events_tx);

    let facade = ModbusFacade::new(
        store.clone(),
        AddressMap {
            holding_register_base: gateway.modbus.holding_register_base,
            coil_read_base: gateway.modbus.coil_read_base,
            coil_write_base: gateway.modbus.coil_write_base,
        },
    );
    let server = ModbusServer::bind(
        &gateway.modbus.host,
        gateway.modbus.port,
        gateway.modbus.unit_id,
        facade,
    )
    .await?;
    let server_task = tokio::spawn(async move {
        if let Err(err) = server.serve().await {
            error!(target: "gateway.modbus", error = %err, "modbus server stopped");
        }
    });

    let mut cycle = PollCycle::new(
        link,
        store,
        CycleOptions {
            read_coil_offset: gateway.read_coil_offset,
            mirror_write_coils: gateway.mirror_write_coils,
            simulation: gateway.simulation,
        },
        repeats.clone(),
    );

    tokio::select! {
        _ = cycle.run(gateway.poll_interval()) => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(target: "gateway", error = %err, "failed to listen for ctrl-c");
            }
            info!(target: "gateway", "shutdown requested");
        }
    }

    server_task.abort();
    cycle.shutdown().await;
    // 关闭事件通道，等待状态日志输出完毕
    drop(cycle);
    let _ = reporter.await;
    repeats.flush();

    let snapshot = metrics().snapshot();
    info!(
        target: "gateway",
        ticks = snapshot.ticks,
        connect_attempts = snapshot.connect_attempts,
        connect_failures = snapshot.connect_failures,
        modbus_requests = snapshot.modbus_requests,
        "gateway stopped"
    );
    Ok(())
}

/// 未捕获的 panic 记为 fatal。
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic| {
        error!(target: "gateway.fatal", panic = %panic, "fatal: unhandled panic");
    }));
}
