// ==========================================
// 商品目录导入 - 导入任务派发
// ==========================================
// 职责: 上传记录落库 + 把一次导入运行派发到 tokio 运行时（即发即走）
// 约定: 派发后立即返回处理中提示；运行结果经 JoinHandle 取回
//       运行一旦开始不可取消
// ==========================================

use crate::config::ImportSettings;
use crate::domain::import::{ImportReport, ImportSource, UploadRecord};
use crate::i18n::t;
use crate::importer::{ImportResult, ProductImporter, ProductImporterImpl};
use crate::repository::{CatalogRepository, NewUpload, UploadRepository};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

/// 已派发的导入
pub struct SubmittedImport {
    pub upload: UploadRecord,
    pub notice: String,
    pub handle: JoinHandle<ImportResult<ImportReport>>,
}

#[derive(Clone)]
pub struct ImportJobDispatcher {
    repo: Arc<dyn CatalogRepository>,
    uploads: Arc<UploadRepository>,
}

impl ImportJobDispatcher {
    pub fn new(repo: Arc<dyn CatalogRepository>, uploads: Arc<UploadRepository>) -> Self {
        Self { repo, uploads }
    }

    /// 派发一次导入运行
    ///
    /// 配置在派发前校验（配置错误同步返回，不会派发）。
    /// 必须在 tokio 运行时内调用。
    pub fn enqueue(
        &self,
        source: ImportSource,
        settings: ImportSettings,
    ) -> ImportResult<JoinHandle<ImportResult<ImportReport>>> {
        let importer = ProductImporterImpl::with_defaults(self.repo.clone(), settings)?;
        info!(source = %source, "导入任务已派发");

        Ok(tokio::spawn(async move {
            importer.import_source(&source).await
        }))
    }

    /// 记录上传文件并派发导入
    #[instrument(skip(self, settings))]
    pub async fn submit_upload(
        &self,
        source: ImportSource,
        settings: ImportSettings,
    ) -> ImportResult<SubmittedImport> {
        let upload = self.uploads.create(&describe_upload(&source).await)?;
        let handle = self.enqueue(source, settings)?;

        Ok(SubmittedImport {
            upload,
            notice: t("job.processing"),
            handle,
        })
    }
}

/// 上传元数据（本地文件取大小与修改时间）
async fn describe_upload(source: &ImportSource) -> NewUpload {
    let file_name = source.file_name();
    let content_type = mime_guess::from_path(&file_name)
        .first()
        .map(|m| m.to_string());

    let (file_size, file_updated_at) = match source {
        ImportSource::Path(path) => match tokio::fs::metadata(path).await {
            Ok(meta) => (
                Some(meta.len() as i64),
                meta.modified().ok().map(DateTime::<Utc>::from),
            ),
            Err(_) => (None, None),
        },
        ImportSource::Url(_) => (None, None),
    };

    NewUpload {
        file_name,
        content_type,
        file_size,
        file_updated_at,
    }
}
