//! 控制器会话选择。
//!
//! 未接入真实会话时默认使用 [`UnattachedClient`]：链路保持 Disconnected，
//! 故障位持续置位。只有显式开启 `bench_controller`（或 `GATEWAY_BENCH`）
//! 才会用配置中的全部点位预置内存控制器。

use domain::{PointKind, TagValue};
use gw_config::GatewayConfig;
use gw_control::{InMemoryController, TagClient, UnattachedClient};
use std::sync::Arc;
use tracing::warn;

/// 按配置选择控制器会话。
pub fn controller_client(config: &GatewayConfig) -> Arc<dyn TagClient> {
    if config.bench_controller {
        warn!(
            target: "gateway",
            points = config.points.len(),
            "bench controller enabled: registers carry placeholder values, not plant data"
        );
        Arc::new(bench_controller(config))
    } else {
        warn!(
            target: "gateway",
            ip = %config.controller.ip,
            "no controller session attached, fault bit stays set"
        );
        Arc::new(UnattachedClient)
    }
}

/// 数值点位初值 0.0，布尔点位初值 false。
pub fn bench_controller(config: &GatewayConfig) -> InMemoryController {
    InMemoryController::with_tags(config.points().into_iter().map(|point| {
        let value = match point.kind {
            PointKind::Numeric => TagValue::Numeric(0.0),
            PointKind::CoilRead | PointKind::CoilWrite => TagValue::Bool(false),
        };
        (point.name, value)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_control::{ControllerTarget, TagError};

    fn config(bench: bool) -> GatewayConfig {
        GatewayConfig::from_json(&format!(
            r#"{{
                "controller": {{ "ip": "10.0.0.5" }},
                "modbus": {{ "holding_registers": 2, "coils_read": 3, "coils_write": 1 }},
                "fault_coil": 2,
                "bench_controller": {},
                "points": [
                    {{ "name": "TT_101", "kind": "numeric" }},
                    {{ "name": "XV_OPEN", "kind": "coil_read" }},
                    {{ "name": "XV_CMD", "kind": "coil_write" }}
                ]
            }}"#,
            bench
        ))
        .unwrap()
    }

    fn target() -> ControllerTarget {
        ControllerTarget {
            ip: "10.0.0.5".to_string(),
            slot: 0,
        }
    }

    #[test]
    fn test_every_configured_point_is_seeded() {
        let controller = bench_controller(&config(true));
        assert_eq!(controller.tag("TT_101"), Some(TagValue::Numeric(0.0)));
        assert_eq!(controller.tag("XV_OPEN"), Some(TagValue::Bool(false)));
        assert_eq!(controller.tag("XV_CMD"), Some(TagValue::Bool(false)));
        assert_eq!(controller.tag("missing"), None);
    }

    #[tokio::test]
    async fn test_without_bench_flag_connect_fails() {
        let client = controller_client(&config(false));
        let err = client.connect(&target()).await.unwrap_err();
        assert!(matches!(err, TagError::Transport(_)));
        assert!(client.read_tag("TT_101").await.is_err());
    }

    #[tokio::test]
    async fn test_bench_flag_selects_in_memory_controller() {
        let client = controller_client(&config(true));
        client.connect(&target()).await.unwrap();
        assert_eq!(
            client.read_tag("TT_101").await.unwrap(),
            TagValue::Numeric(0.0)
        );
    }
}
