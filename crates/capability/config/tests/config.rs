use domain::PointKind;
use gw_config::{AppConfig, ConfigError, GatewayConfig, PointKindConfig, first_existing};
use std::path::PathBuf;

const LEGACY: &str = r#"{
    "mensagemInicial": "Gateway Salobo",
    "tempoAtualizacao": 500,
    "tempoEntreErros": 30000,
    "tempoReconecta": 8000,
    "tempoEsperaPLC": 3000,
    "simulacao": false,
    "coilFalha": 0,
    "read_coil_offset": 1,
    "plc": { "ip": "10.0.0.5", "slot": 2 },
    "mbServerConfig": {
        "ip": "0.0.0.0",
        "porta": 5020,
        "id": 3,
        "enderecoInicialHR": 100,
        "enderecoInicialCoilsLeitura": 0,
        "enderecoInicialCoilsEscrita": 500,
        "qntHoldingRegisters": 4,
        "qntCoilsLeitura": 4,
        "qntCoilsEscrita": 1
    },
    "tags": [
        { "name": "TT_101", "kind": "numeric" },
        { "name": "PT_102", "kind": "numeric" },
        { "name": "XV_201_OPEN", "kind": "coil_read" },
        { "name": "XV_201_CMD", "kind": "coil_write" }
    ]
}"#;

fn minimal(points: &str, holding: usize, coils_read: usize, coils_write: usize) -> String {
    format!(
        r#"{{
            "controller": {{ "ip": "127.0.0.1" }},
            "modbus": {{ "holding_registers": {holding}, "coils_read": {coils_read}, "coils_write": {coils_write} }},
            "fault_coil": {fault},
            "points": {points}
        }}"#,
        fault = coils_read.saturating_sub(1),
    )
}

#[test]
fn legacy_keys_are_accepted() {
    let config = GatewayConfig::from_json(LEGACY).expect("config");
    assert_eq!(config.welcome_message, "Gateway Salobo");
    assert_eq!(config.poll_interval_ms, 500);
    assert_eq!(config.reconnect_delay_ms, 8000);
    assert_eq!(config.controller.slot, 2);
    assert_eq!(config.modbus.port, 5020);
    assert_eq!(config.modbus.unit_id, 3);
    assert_eq!(config.modbus.holding_register_base, 100);
    assert_eq!(config.modbus.coil_write_base, 500);
    assert_eq!(config.count(PointKindConfig::Numeric), 2);
    assert_eq!(config.read_coil_span(), (1, 3));

    let points = config.points();
    assert_eq!(points[0].name, "TT_101");
    assert_eq!(points[3].kind, PointKind::CoilWrite);
}

#[test]
fn defaults_apply() {
    let config = GatewayConfig::from_json(&minimal("[]", 0, 1, 0)).expect("config");
    assert_eq!(config.poll_interval_ms, 1000);
    assert_eq!(config.modbus.port, 502);
    assert_eq!(config.repeat_summary_window_ms, 600_000);
    assert!(config.mirror_write_coils);
    assert!(!config.simulation);
    assert!(!config.bench_controller);
}

#[test]
fn too_many_numeric_points_rejected() {
    let points = r#"[{"name":"a","kind":"numeric"},{"name":"b","kind":"numeric"}]"#;
    let err = GatewayConfig::from_json(&minimal(points, 3, 1, 0)).expect_err("invalid");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "modbus.holding_registers"));
}

#[test]
fn fault_coil_overlapping_points_rejected() {
    let json = r#"{
        "controller": { "ip": "127.0.0.1" },
        "modbus": { "holding_registers": 0, "coils_read": 2, "coils_write": 0 },
        "fault_coil": 0,
        "points": [{ "name": "a", "kind": "coil_read" }]
    }"#;
    let err = GatewayConfig::from_json(json).expect_err("invalid");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "fault_coil"));
}

#[test]
fn mirrored_write_coils_need_read_space() {
    let points = r#"[{"name":"a","kind":"coil_read"},{"name":"b","kind":"coil_write"}]"#;
    let err = GatewayConfig::from_json(&minimal(points, 0, 1, 1)).expect_err("invalid");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "modbus.coils_read"));
    assert!(GatewayConfig::from_json(&minimal(points, 0, 3, 1)).is_ok());
}

#[test]
fn malformed_json_is_parse_error() {
    let err = GatewayConfig::from_json("{").expect_err("invalid");
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn first_existing_skips_missing_paths() {
    let dir = std::env::temp_dir().join(format!("gw-config-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("dir");
    let present = dir.join("config.json");
    std::fs::write(&present, LEGACY).expect("write");

    let found = first_existing(&[dir.join("missing.json"), present.clone()]);
    assert_eq!(found, Some(present.clone()));
    assert_eq!(first_existing(&[PathBuf::from("/nonexistent/config.json")]), None);

    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("GATEWAY_CONFIG", &present);
        std::env::set_var("GATEWAY_SIMULATION", "on");
        std::env::set_var("GATEWAY_BENCH", "true");
    }
    let app = AppConfig::from_env().expect("app config");
    let gateway = app.load_gateway().expect("gateway");
    assert!(gateway.simulation);
    assert!(gateway.bench_controller);
    assert_eq!(gateway.controller.ip, "10.0.0.5");

    let _ = std::fs::remove_dir_all(&dir);
}
