//! 网关运行配置加载。
//!
//! - 进程级参数从环境变量读取（[`AppConfig`]）
//! - 点位与地址空间从 JSON 配置文件读取（[`GatewayConfig`]），
//!   兼容现场旧版配置文件的葡语键名

mod gateway;

pub use gateway::{
    ControllerConfig, GatewayConfig, ModbusServerConfig, PointConfig, PointKindConfig,
};

use std::env;
use std::path::{Path, PathBuf};

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("config file not found: {0}")]
    NotFound(String),
    #[error("failed to read {0}: {1}")]
    Io(String, String),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// 进程级运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_path: PathBuf,
    pub simulation_override: Option<bool>,
    pub bench_override: Option<bool>,
}

impl AppConfig {
    /// 从环境变量读取配置。
    ///
    /// `GATEWAY_CONFIG` 未设置时，按顺序查找 `config.json`、`config/config.json`
    /// 与可执行文件同目录下的 `config.json`。
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_path = match read_optional("GATEWAY_CONFIG") {
            Some(path) => PathBuf::from(path),
            None => first_existing(&default_candidates())
                .ok_or_else(|| ConfigError::Missing("GATEWAY_CONFIG".to_string()))?,
        };
        let simulation_override = read_optional_bool("GATEWAY_SIMULATION")?;
        let bench_override = read_optional_bool("GATEWAY_BENCH")?;

        Ok(Self {
            config_path,
            simulation_override,
            bench_override,
        })
    }

    /// 读取并校验 JSON 配置，应用环境变量覆盖项。
    pub fn load_gateway(&self) -> Result<GatewayConfig, ConfigError> {
        let mut gateway = GatewayConfig::load(&self.config_path)?;
        if let Some(simulation) = self.simulation_override {
            gateway.simulation = simulation;
        }
        if let Some(bench) = self.bench_override {
            gateway.bench_controller = bench;
        }
        Ok(gateway)
    }
}

/// 返回候选列表中第一个存在的路径。
pub fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.exists()).cloned()
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![
        PathBuf::from("config.json"),
        Path::new("config").join("config.json"),
    ];
    if let Some(dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join("config.json"));
    }
    candidates
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_optional_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match read_optional(key) {
        None => Ok(None),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" => Ok(Some(true)),
            "0" | "false" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        },
    }
}
