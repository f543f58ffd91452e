// ==========================================
// 商品目录导入 - 配置管理器
// ==========================================
// 职责: 导入配置的持久化加载 / 保存
// 存储: config_kv 表 (key-value + scope)
// 规则: 整体配置以 JSON 存于 import/settings；单项覆写键优先于整体配置
// ==========================================

use crate::config::import_settings::ImportSettings;
use crate::db::open_sqlite_connection;
use crate::domain::types::CellEncoding;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 加载导入配置
    ///
    /// # 规则
    /// 1. import/settings 存在则解析为整体配置，否则使用默认值
    /// 2. 再逐项应用 import.* 单项覆写（格式错误的覆写值告警后忽略）
    pub fn load_import_settings(&self) -> ImportResult<ImportSettings> {
        let mut settings = match self.get_global_config_value(config_keys::IMPORT_SETTINGS)? {
            Some(raw) => serde_json::from_str::<ImportSettings>(&raw).map_err(|e| {
                ImportError::ConfigReadError {
                    key: config_keys::IMPORT_SETTINGS.to_string(),
                    message: e.to_string(),
                }
            })?,
            None => ImportSettings::default(),
        };

        if let Some(v) = self.get_bool(config_keys::CREATE_VARIANTS)? {
            settings.create_variants = v;
        }
        if let Some(v) = self.get_bool(config_keys::DESTROY_ORIGINAL_PRODUCTS)? {
            settings.destroy_original_products = v;
        }
        if let Some(v) = self.get_bool(config_keys::FIRST_ROW_IS_HEADINGS)? {
            settings.first_row_is_headings = v;
        }
        if let Some(v) = self.get_bool(config_keys::CREATE_MISSING_TAXONOMIES)? {
            settings.create_missing_taxonomies = v;
        }
        if let Some(v) = self.get_bool(config_keys::MULTI_DOMAIN_IMPORTING)? {
            settings.multi_domain_importing = v;
        }
        if let Some(raw) = self.get_global_config_value(config_keys::ROWS_TO_SKIP)? {
            match raw.trim().parse::<usize>() {
                Ok(v) => settings.rows_to_skip = v,
                Err(_) => tracing::warn!(
                    config_key = config_keys::ROWS_TO_SKIP,
                    raw_value = %raw,
                    "跳过行数配置格式错误，保持原值"
                ),
            }
        }
        if let Some(raw) = self.get_global_config_value(config_keys::VARIANT_COMPARATOR_FIELD)? {
            settings.variant_comparator_field = raw.trim().to_string();
        }
        if let Some(raw) = self.get_global_config_value(config_keys::PRODUCT_IMAGE_PATH)? {
            settings.product_image_path = PathBuf::from(raw.trim());
        }
        if let Some(raw) = self.get_global_config_value(config_keys::CELL_ENCODING)? {
            match raw.trim().to_ascii_lowercase().as_str() {
                "legacy_latin1" => settings.cell_encoding = CellEncoding::LegacyLatin1,
                "passthrough" => settings.cell_encoding = CellEncoding::Passthrough,
                _ => tracing::warn!(
                    config_key = config_keys::CELL_ENCODING,
                    raw_value = %raw,
                    "单元格编码配置无法识别，保持原值"
                ),
            }
        }
        if let Some(raw) = self.get_global_config_value(config_keys::COLUMN_MAPPINGS)? {
            match serde_json::from_str::<BTreeMap<String, usize>>(&raw) {
                Ok(v) => settings.column_mappings = v,
                Err(e) => tracing::warn!(
                    config_key = config_keys::COLUMN_MAPPINGS,
                    error = %e,
                    "列映射配置格式错误，保持原值"
                ),
            }
        }

        Ok(settings)
    }

    /// 保存整体导入配置
    pub fn save_import_settings(&self, settings: &ImportSettings) -> ImportResult<()> {
        let raw = serde_json::to_string(settings)?;
        self.set_global_config_value(config_keys::IMPORT_SETTINGS, &raw)?;
        Ok(())
    }

    fn get_bool(&self, key: &str) -> RepositoryResult<Option<bool>> {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(None),
        };
        let parsed = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Some(true),
            "0" | "false" | "no" | "n" => Some(false),
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, "布尔配置格式错误，忽略");
                None
            }
        };
        Ok(parsed)
    }
}

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    // 整体配置 (JSON)
    pub const IMPORT_SETTINGS: &str = "import/settings";

    // 单项覆写
    pub const COLUMN_MAPPINGS: &str = "import.column_mappings"; // JSON 对象
    pub const FIRST_ROW_IS_HEADINGS: &str = "import.first_row_is_headings";
    pub const ROWS_TO_SKIP: &str = "import.rows_to_skip";
    pub const CREATE_VARIANTS: &str = "import.create_variants";
    pub const VARIANT_COMPARATOR_FIELD: &str = "import.variant_comparator_field";
    pub const DESTROY_ORIGINAL_PRODUCTS: &str = "import.destroy_original_products";
    pub const CREATE_MISSING_TAXONOMIES: &str = "import.create_missing_taxonomies";
    pub const PRODUCT_IMAGE_PATH: &str = "import.product_image_path";
    pub const MULTI_DOMAIN_IMPORTING: &str = "import.multi_domain_importing";
    pub const CELL_ENCODING: &str = "import.cell_encoding";
}
