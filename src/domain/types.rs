// ==========================================
// 商品目录导入 - 通用类型
// ==========================================

use crate::domain::catalog::slugify;
use crate::domain::import::RowRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// LogSeverity - 导入日志级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogSeverity::Info => "Info",
            LogSeverity::Warn => "Warn",
            LogSeverity::Error => "Error",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// CellEncoding - 单元格重编码策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellEncoding {
    /// 兼容模式：把每个单元格的字节按 Latin-1 解读后转为 UTF-8
    /// 注意: 源文件本身是 UTF-8 时会把非 ASCII 字符变成乱码
    #[default]
    LegacyLatin1,
    /// 原样保留
    Passthrough,
}

// ==========================================
// ComparatorField - 判定"商品已存在"的比较字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparatorField {
    Name,
    Slug,
    Sku,
}

impl ComparatorField {
    /// 配置字符串 → 比较字段（permalink 为 slug 的别名）
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => Some(ComparatorField::Name),
            "slug" | "permalink" => Some(ComparatorField::Slug),
            "sku" => Some(ComparatorField::Sku),
            _ => None,
        }
    }

    /// 行记录中对应的语义字段名（按优先级）
    pub fn field_keys(&self) -> &'static [&'static str] {
        match self {
            ComparatorField::Name => &["name"],
            ComparatorField::Slug => &["slug", "permalink"],
            ComparatorField::Sku => &["sku"],
        }
    }

    /// 取行内比较值；slug 先规范化再比较，规范化后为空视为缺失
    pub fn lookup_value(&self, record: &RowRecord) -> Option<String> {
        let raw = self.field_keys().iter().find_map(|key| record.get(key))?;
        match self {
            ComparatorField::Slug => Some(slugify(raw)).filter(|s| !s.is_empty()),
            _ => Some(raw.to_string()),
        }
    }
}
