// ==========================================
// 商品目录导入 - 导入领域模型
// ==========================================
// 职责: 列映射 / 行记录 / 行结果 / 批次汇总 / 上传记录
// 生命周期: ColumnMapping 每次导入构建一次；RowRecord 逐行构建、用完即弃
// ==========================================

use crate::domain::types::LogSeverity;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ==========================================
// ColumnMapping - 语义字段 → 列位置
// ==========================================
// 不变量: 键唯一；未映射的语义字段直接缺省（不报错）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    columns: BTreeMap<String, usize>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入映射；同名键后写覆盖前写
    pub fn insert(&mut self, field: impl Into<String>, index: usize) {
        self.columns.insert(field.into(), index);
    }

    pub fn get(&self, field: &str) -> Option<usize> {
        self.columns.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl From<BTreeMap<String, usize>> for ColumnMapping {
    fn from(columns: BTreeMap<String, usize>) -> Self {
        Self { columns }
    }
}

// ==========================================
// RowRecord - 单行语义字段集
// ==========================================
// 只保存有值的字段：空单元格 / 越界列均视为缺省
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub row_number: usize, // 源文件行号（1 起）
    fields: BTreeMap<String, String>,
}

impl RowRecord {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// 写入字段；None 或空串等同于删除
    pub fn set(&mut self, field: impl Into<String>, value: Option<String>) {
        let field = field.into();
        match value.filter(|v| !v.is_empty()) {
            Some(v) => {
                self.fields.insert(field, v);
            }
            None => {
                self.fields.remove(&field);
            }
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.fields.remove(field)
    }

    /// 重命名字段：源字段不存在时目标字段也被清除
    pub fn rename(&mut self, from: &str, to: &str) {
        let value = self.fields.remove(from);
        self.set(to, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for RowRecord {
    /// 字段全量转储（错误日志用）
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for (k, v) in &self.fields {
            writeln!(f, "  {}: {:?},", k, v)?;
        }
        write!(f, "}}")
    }
}

// ==========================================
// ImportSource - 待导入数据源
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportSource {
    /// 本地文件路径
    Path(PathBuf),
    /// HTTP(S) 可下载地址
    Url(String),
}

impl ImportSource {
    /// 按字面判断：http:// 或 https:// 开头视为 URL
    pub fn parse(locator: &str) -> Self {
        let trimmed = locator.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            ImportSource::Url(trimmed.to_string())
        } else {
            ImportSource::Path(PathBuf::from(trimmed))
        }
    }

    /// 文件名（用于日志和格式判定）
    pub fn file_name(&self) -> String {
        match self {
            ImportSource::Path(p) => p
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string(),
            ImportSource::Url(u) => u
                .split(['?', '#'])
                .next()
                .and_then(|s| s.rsplit('/').next())
                .filter(|s| !s.is_empty())
                .unwrap_or("unknown")
                .to_string(),
        }
    }

    /// 小写扩展名
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportSource::Path(p) => write!(f, "{}", p.display()),
            ImportSource::Url(u) => write!(f, "{}", u),
        }
    }
}

// ==========================================
// RowOutcome - 单行导入结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowOutcome {
    /// 新建商品
    ProductCreated { product_id: i64, slug: String },
    /// slug 已在导入前快照中（视为成功的空操作）
    AlreadyPresent { slug: String },
    /// 变体新建或更新
    VariantImported { product_id: i64, variant_id: i64, sku: Option<String> },
    /// 行级校验失败（已记录，跳过该行）
    Failed { reasons: Vec<String> },
}

// ==========================================
// LogLine - 导入日志行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub severity: LogSeverity,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.severity,
            self.message
        )
    }
}

// ==========================================
// ImportReport - 批次汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch_id: String,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub rows_seen: usize,
    pub products_created: usize,
    pub variants_imported: usize,
    pub duplicates: usize,
    pub failed_rows: usize,
    pub products_destroyed: usize,
    pub outcomes: Vec<(usize, RowOutcome)>, // (行号, 结果)
    pub log: Vec<LogLine>,
    pub notice: String,
}

impl ImportReport {
    /// 按严重级别筛选日志
    pub fn log_messages(&self, severity: LogSeverity) -> Vec<&str> {
        self.log
            .iter()
            .filter(|l| l.severity == severity)
            .map(|l| l.message.as_str())
            .collect()
    }
}

// ==========================================
// UploadRecord - 上传记录
// ==========================================
// 对齐: product_imports 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: i64,
    pub file_name: String,
    pub content_type: Option<String>,
    pub file_size: Option<i64>,
    pub file_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
