use crate::ConfigError;
use domain::{Point, PointKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 网关配置（JSON）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// 启动欢迎信息
    #[serde(default = "default_welcome_message", alias = "mensagemInicial")]
    pub welcome_message: String,
    /// 轮询间隔（毫秒）
    #[serde(default = "default_poll_interval", alias = "tempoAtualizacao")]
    pub poll_interval_ms: u64,
    /// 连接错误日志抑制窗口（毫秒）
    #[serde(default = "default_error_log_window", alias = "tempoEntreErros")]
    pub error_log_window_ms: u64,
    /// 连接失败后的重连间隔（毫秒）
    #[serde(default = "default_reconnect_delay", alias = "tempoReconecta")]
    pub reconnect_delay_ms: u64,
    /// 连接超时（毫秒）
    #[serde(default = "default_connect_timeout", alias = "tempoEsperaPLC")]
    pub connect_timeout_ms: u64,
    /// 重复日志汇总窗口（毫秒）
    #[serde(default = "default_repeat_window")]
    pub repeat_summary_window_ms: u64,
    /// 仿真模式：不读控制器，保持寄存器填充随机值
    #[serde(default, alias = "simulacao")]
    pub simulation: bool,
    /// 台架模式：用内存控制器代替真实会话，数据不可用于生产
    #[serde(default)]
    pub bench_controller: bool,
    /// 故障位在读线圈中的索引
    #[serde(default, alias = "coilFalha")]
    pub fault_coil: usize,
    /// 读线圈点位在读线圈数组中的起始偏移
    #[serde(default)]
    pub read_coil_offset: usize,
    /// 是否将写线圈点位的回读值镜像到读线圈
    #[serde(default = "default_true")]
    pub mirror_write_coils: bool,
    #[serde(alias = "plc")]
    pub controller: ControllerConfig,
    #[serde(alias = "mbServerConfig")]
    pub modbus: ModbusServerConfig,
    /// 有序点位列表，顺序决定寄存器/线圈偏移
    #[serde(default, alias = "tags")]
    pub points: Vec<PointConfig>,
}

/// 控制器连接参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub ip: String,
    #[serde(default)]
    pub slot: u8,
}

/// Modbus TCP 从站参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusServerConfig {
    #[serde(default = "default_modbus_host", alias = "ip")]
    pub host: String,
    #[serde(default = "default_modbus_port", alias = "porta")]
    pub port: u16,
    #[serde(default = "default_unit_id", alias = "id")]
    pub unit_id: u8,
    #[serde(default, alias = "enderecoInicialHR")]
    pub holding_register_base: u16,
    #[serde(default, alias = "enderecoInicialCoilsLeitura")]
    pub coil_read_base: u16,
    #[serde(default, alias = "enderecoInicialCoilsEscrita")]
    pub coil_write_base: u16,
    #[serde(alias = "qntHoldingRegisters")]
    pub holding_registers: usize,
    #[serde(alias = "qntCoilsLeitura")]
    pub coils_read: usize,
    #[serde(alias = "qntCoilsEscrita")]
    pub coils_write: usize,
}

/// 点位配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointConfig {
    pub name: String,
    pub kind: PointKindConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKindConfig {
    Numeric,
    CoilRead,
    CoilWrite,
}

impl From<PointKindConfig> for PointKind {
    fn from(kind: PointKindConfig) -> Self {
        match kind {
            PointKindConfig::Numeric => PointKind::Numeric,
            PointKindConfig::CoilRead => PointKind::CoilRead,
            PointKindConfig::CoilWrite => PointKind::CoilWrite,
        }
    }
}

fn default_welcome_message() -> String {
    "PLC gateway starting".to_string()
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_error_log_window() -> u64 {
    60_000
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_repeat_window() -> u64 {
    10 * 60 * 1000
}

fn default_true() -> bool {
    true
}

fn default_modbus_host() -> String {
    "0.0.0.0".to_string()
}

fn default_modbus_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

impl GatewayConfig {
    /// 从 JSON 字符串解析并校验
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件读取
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        Self::from_json(&json)
    }

    /// 按配置顺序返回领域点位
    pub fn points(&self) -> Vec<Point> {
        self.points
            .iter()
            .map(|point| Point::new(point.name.clone(), point.kind.into()))
            .collect()
    }

    pub fn count(&self, kind: PointKindConfig) -> usize {
        self.points.iter().filter(|point| point.kind == kind).count()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_log_window(&self) -> Duration {
        Duration::from_millis(self.error_log_window_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn repeat_summary_window(&self) -> Duration {
        Duration::from_millis(self.repeat_summary_window_ms)
    }

    /// 读线圈占用区间 `[read_coil_offset, end)`：读点位 + 写点位镜像
    pub fn read_coil_span(&self) -> (usize, usize) {
        let mirrored = if self.mirror_write_coils {
            self.count(PointKindConfig::CoilWrite)
        } else {
            0
        };
        let end = self.read_coil_offset + self.count(PointKindConfig::CoilRead) + mirrored;
        (self.read_coil_offset, end)
    }

    /// 校验点位数量与地址空间是否匹配
    ///
    /// 运行期校验只会减少分组成员，因此按配置数量校验即可覆盖运行期。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be greater than zero"));
        }
        if let Some(point) = self.points.iter().find(|point| point.name.trim().is_empty()) {
            return Err(invalid("points", format!("empty tag name ({:?})", point.kind)));
        }

        let numeric = self.count(PointKindConfig::Numeric);
        if numeric * 2 > self.modbus.holding_registers {
            return Err(invalid(
                "modbus.holding_registers",
                format!(
                    "{} numeric points need {} registers, only {} configured",
                    numeric,
                    numeric * 2,
                    self.modbus.holding_registers
                ),
            ));
        }

        let writes = self.count(PointKindConfig::CoilWrite);
        if writes > self.modbus.coils_write {
            return Err(invalid(
                "modbus.coils_write",
                format!(
                    "{} write points, only {} write coils configured",
                    writes, self.modbus.coils_write
                ),
            ));
        }

        let (start, end) = self.read_coil_span();
        if end > self.modbus.coils_read {
            return Err(invalid(
                "modbus.coils_read",
                format!(
                    "read coil layout needs {} coils, only {} configured",
                    end, self.modbus.coils_read
                ),
            ));
        }
        if self.fault_coil >= self.modbus.coils_read {
            return Err(invalid(
                "fault_coil",
                format!(
                    "{} outside 0..{}",
                    self.fault_coil, self.modbus.coils_read
                ),
            ));
        }
        if (start..end).contains(&self.fault_coil) {
            return Err(invalid(
                "fault_coil",
                format!("{} overlaps point coils {}..{}", self.fault_coil, start, end),
            ));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(key.to_string(), reason.into())
}
