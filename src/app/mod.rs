// ==========================================
// 商品目录导入 - 应用层
// ==========================================
// 职责: 共享状态装配，上传记录与导入任务派发
// ==========================================

pub mod import_job;
pub mod state;

// 重导出
pub use import_job::{ImportJobDispatcher, SubmittedImport};
pub use state::{get_default_db_path, AppState};
