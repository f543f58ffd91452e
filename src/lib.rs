// ==========================================
// 商品目录导入 - 核心库
// ==========================================
// 职责: 表格数据（CSV / XLSX，本地或远程）批量导入为商品 / 变体
// 技术栈: Rust + SQLite + tokio
// 处理模型: 逐行尽力而为（行级失败记日志后继续，基础设施故障中止）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 应用层 - 状态装配与任务派发
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CellEncoding, ComparatorField, LogSeverity};

// 领域实体
pub use domain::{
    ImportReport, ImportSource, Product, RowOutcome, RowRecord, Taxon, UploadRecord, Variant,
};

// 配置
pub use config::{ConfigManager, ImportSettings};

// 导入器
pub use importer::{ImportError, ImportResult, ProductImporter, ProductImporterImpl};

// 应用
pub use app::{AppState, ImportJobDispatcher};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "catalog-import";
