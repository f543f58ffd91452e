// ==========================================
// 商品目录导入 - 配置层
// ==========================================
// 职责: 导入配置定义、默认值、持久化加载
// 存储: config_kv 表 / JSON 文件
// ==========================================

pub mod config_manager;
pub mod import_settings;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use import_settings::{default_column_mappings, ImportSettings};
