use std::fmt;

/// 点位所属的轮询分组。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointKind {
    /// 数值点位，映射到一对保持寄存器。
    Numeric,
    /// 只读布尔点位，映射到读线圈。
    CoilRead,
    /// 回写布尔点位，Modbus 写线圈的值会推送到控制器。
    CoilWrite,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Numeric => "numeric",
            PointKind::CoilRead => "coil_read",
            PointKind::CoilWrite => "coil_write",
        }
    }
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 配置声明的点位，加载后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    /// 控制器标签名。
    pub name: String,
    pub kind: PointKind,
}

impl Point {
    pub fn new(name: impl Into<String>, kind: PointKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// 控制器返回的标签值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagValue {
    Numeric(f64),
    Bool(bool),
}

impl TagValue {
    /// 按数值解释（布尔值取 1.0 / 0.0）。
    pub fn as_f32(&self) -> f32 {
        match *self {
            TagValue::Numeric(value) => value as f32,
            TagValue::Bool(value) => {
                if value {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// 按布尔解释（数值非零为真）。
    pub fn as_bool(&self) -> bool {
        match *self {
            TagValue::Numeric(value) => value != 0.0,
            TagValue::Bool(value) => value,
        }
    }
}
