// ==========================================
// 商品目录导入 - 上传记录 Repository
// ==========================================
// 职责: product_imports 表的读写（上传文件元数据）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::UploadRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// 新建上传记录的入参
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub file_size: Option<i64>,
    pub file_updated_at: Option<DateTime<Utc>>,
}

pub struct UploadRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UploadRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建上传记录
    pub fn create(&self, upload: &NewUpload) -> RepositoryResult<UploadRecord> {
        if upload.file_name.trim().is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "data_file_file_name".to_string(),
                message: "文件名不能为空".to_string(),
            });
        }

        let conn = self.get_conn()?;
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO product_imports (
                data_file_file_name, data_file_content_type, data_file_file_size,
                data_file_updated_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![
                upload.file_name,
                upload.content_type,
                upload.file_size,
                upload.file_updated_at,
                now,
            ],
        )?;

        Ok(UploadRecord {
            id: conn.last_insert_rowid(),
            file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            file_size: upload.file_size,
            file_updated_at: upload.file_updated_at,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<UploadRecord>> {
        let conn = self.get_conn()?;
        let record = conn
            .query_row(
                r#"
                SELECT id, data_file_file_name, data_file_content_type, data_file_file_size,
                       data_file_updated_at, created_at, updated_at
                FROM product_imports WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok(UploadRecord {
                        id: row.get(0)?,
                        file_name: row.get(1)?,
                        content_type: row.get(2)?,
                        file_size: row.get(3)?,
                        file_updated_at: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}
