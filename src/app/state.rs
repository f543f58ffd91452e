// ==========================================
// 商品目录导入 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、仓储与任务派发器
// ==========================================

use std::sync::{Arc, Mutex};

use crate::app::import_job::ImportJobDispatcher;
use crate::config::ConfigManager;
use crate::db::{init_catalog_schema, open_sqlite_connection};
use crate::repository::{CatalogRepositoryImpl, UploadRepository};

/// 应用状态
///
/// 所有仓储共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 目录仓储
    pub catalog_repo: Arc<CatalogRepositoryImpl>,

    /// 上传记录仓储
    pub upload_repo: Arc<UploadRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 导入任务派发器
    pub dispatcher: ImportJobDispatcher,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时创建并建表）
    ///
    /// # 返回
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_catalog_schema(&conn).map_err(|e| format!("目录表结构初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let catalog_repo = Arc::new(CatalogRepositoryImpl::from_connection(conn.clone()));
        let upload_repo = Arc::new(UploadRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn));
        let dispatcher = ImportJobDispatcher::new(catalog_repo.clone(), upload_repo.clone());

        Ok(Self {
            db_path,
            catalog_repo,
            upload_repo,
            config_manager,
            dispatcher,
        })
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 CATALOG_IMPORT_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("CATALOG_IMPORT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./catalog_import.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("catalog-import");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("catalog_import.db");
        }
    }

    path.to_string_lossy().to_string()
}
