// ==========================================
// 商品目录导入 - 商品导入器实现
// ==========================================
// 职责: 整合导入流程，从数据源到目录存储
// 流程: 快照 → 读取 → 解析 → 列映射 → 逐行{清洗 → 路由 → 构建 → 记录} → 清理
// 约束:
// - 行严格按源顺序串行处理（后续变体行依赖前面行创建的商品）
// - 快照只在开始时取一次，运行中新建的商品不进入快照
// - 行级校验失败记日志后继续；基础设施故障记日志后中止并返回 Err
// - 每行独立提交，中止时不回滚已提交的行
// ==========================================

use crate::config::ImportSettings;
use crate::domain::catalog::Product;
use crate::domain::import::{ImportReport, ImportSource, RowOutcome, RowRecord};
use crate::domain::types::ComparatorField;
use crate::i18n::{t, t_with_args};
use crate::importer::asset_fetcher::DefaultAssetFetcher;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{read_source, CsvParser, UniversalFileParser};
use crate::importer::product_importer_trait::{
    AssetFetcher, NoopBuildHook, ProductBuildHook, ProductImporter,
};
use crate::importer::record_builder::{BuildOutcome, RecordBuilder};
use crate::logging::ImportLog;
use crate::repository::CatalogRepository;
use async_trait::async_trait;
use chrono::{Local, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 运行计数
#[derive(Debug, Default)]
struct RunTally {
    rows_seen: usize,
    products_created: usize,
    variants_imported: usize,
    duplicates: usize,
    failed_rows: usize,
    outcomes: Vec<(usize, RowOutcome)>,
}

impl RunTally {
    fn record(&mut self, row_number: usize, outcome: BuildOutcome) {
        match &outcome {
            BuildOutcome::ProductCreated { .. } => self.products_created += 1,
            BuildOutcome::AlreadyPresent { .. } => self.duplicates += 1,
            BuildOutcome::VariantSaved { .. } => self.variants_imported += 1,
            BuildOutcome::Invalid { .. } => self.failed_rows += 1,
        }
        self.outcomes.push((row_number, outcome.into()));
    }
}

// ==========================================
// ProductImporterImpl - 商品导入器实现
// ==========================================
pub struct ProductImporterImpl {
    repo: Arc<dyn CatalogRepository>,
    settings: Arc<ImportSettings>,
    comparator: Option<ComparatorField>, // None = 未启用变体路由
    parser: UniversalFileParser,
    cleaner: DataCleaner,
    builder: RecordBuilder,
}

impl ProductImporterImpl {
    /// 创建新的 ProductImporter 实例
    ///
    /// # 参数
    /// - repo: 目录仓储
    /// - settings: 导入配置（构造时校验）
    /// - fetcher: 图片获取器
    /// - hook: 商品构建扩展点
    pub fn new(
        repo: Arc<dyn CatalogRepository>,
        settings: ImportSettings,
        fetcher: Arc<dyn AssetFetcher>,
        hook: Arc<dyn ProductBuildHook>,
    ) -> ImportResult<Self> {
        settings.validate()?;

        let comparator = if settings.create_variants {
            Some(settings.comparator_field()?)
        } else {
            None
        };
        let parser = UniversalFileParser::new(CsvParser::new(
            settings.delimiter_byte()?,
            settings.source_encoding()?,
        ));
        let cleaner = DataCleaner::new(settings.cell_encoding);

        let settings = Arc::new(settings);
        let builder = RecordBuilder::new(repo.clone(), fetcher, hook, settings.clone());

        Ok(Self {
            repo,
            settings,
            comparator,
            parser,
            cleaner,
            builder,
        })
    }

    /// 使用默认图片获取器与空扩展点
    pub fn with_defaults(
        repo: Arc<dyn CatalogRepository>,
        settings: ImportSettings,
    ) -> ImportResult<Self> {
        let fetcher = DefaultAssetFetcher::new(
            settings.product_image_path.clone(),
            settings.remote_fetch_timeout_secs.map(Duration::from_secs),
        )?;
        Self::new(repo, settings, Arc::new(fetcher), Arc::new(NoopBuildHook))
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    async fn run(
        &self,
        source: &ImportSource,
        batch_id: &str,
        log: &ImportLog,
    ) -> ImportResult<ImportReport> {
        let started_at = Utc::now();
        let file_name = source.file_name();

        // === 步骤 1: 导入前快照 ===
        debug!("步骤 1: 导入前快照");
        let snapshot = self.repo.snapshot_product_slugs().await?;
        let snapshot_slugs: HashSet<String> = snapshot.iter().map(|(_, s)| s.clone()).collect();
        let snapshot_ids: Vec<i64> = snapshot.iter().map(|(id, _)| *id).collect();
        info!(existing_products = snapshot_ids.len(), "导入前快照完成");

        // === 步骤 2: 读取与解析 ===
        debug!("步骤 2: 读取与解析");
        let timeout = self.settings.remote_fetch_timeout_secs.map(Duration::from_secs);
        let bytes = read_source(source, timeout).await?;
        let rows = self.parser.parse(source.extension().as_deref(), &bytes)?;
        info!(total_rows = rows.len(), "数据源解析完成");

        // === 步骤 3: 列映射 ===
        let mapping = if self.settings.first_row_is_headings {
            rows.first()
                .map(|headers| FieldMapper::mapping_from_headers(headers))
                .unwrap_or_default()
        } else {
            FieldMapper::mapping_from_static(&self.settings.column_mappings)
        };
        debug!(mapped_fields = mapping.len(), "列映射完成");

        log.info(t_with_args(
            "import.began",
            &[
                ("file", &file_name),
                ("at", &Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            ],
        ));

        // === 步骤 4: 逐行处理 ===
        let mut tally = RunTally::default();
        for (index, cells) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            if index < self.settings.rows_to_skip {
                continue;
            }
            tally.rows_seen += 1;

            let cells = self.cleaner.clean_row(cells);
            if DataCleaner::is_blank_row(&cells) {
                debug!(row_number, "空白行，跳过");
                continue;
            }

            let mut record = FieldMapper::map_row(&mapping, &cells, row_number);
            self.builder.apply_row_defaults(&mut record).await?;

            let outcome = match self.route(&record).await? {
                Some(product) => self.builder.build_variant(&product, &record, log).await?,
                None => {
                    self.builder
                        .build_product(&record, &snapshot_slugs, log)
                        .await?
                }
            };

            if let BuildOutcome::Invalid { reasons } = &outcome {
                warn!(row_number, reasons = ?reasons, "行校验失败，已跳过");
            }
            tally.record(row_number, outcome);
        }

        // === 步骤 5: 清理 ===
        let mut products_destroyed = 0;
        if self.settings.destroy_original_products {
            products_destroyed = self.repo.destroy_products(&snapshot_ids).await?;
            log.info(t_with_args(
                "import.cleanup",
                &[("count", &products_destroyed.to_string())],
            ));
        }

        log.info(t_with_args(
            "import.completed",
            &[
                ("file", &file_name),
                ("at", &Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            ],
        ));

        info!(
            rows_seen = tally.rows_seen,
            products_created = tally.products_created,
            variants_imported = tally.variants_imported,
            duplicates = tally.duplicates,
            failed_rows = tally.failed_rows,
            products_destroyed,
            "导入完成"
        );

        Ok(ImportReport {
            batch_id: batch_id.to_string(),
            source: source.to_string(),
            started_at,
            completed_at: Utc::now(),
            rows_seen: tally.rows_seen,
            products_created: tally.products_created,
            variants_imported: tally.variants_imported,
            duplicates: tally.duplicates,
            failed_rows: tally.failed_rows,
            products_destroyed,
            outcomes: tally.outcomes,
            log: log.lines(),
            notice: t("import.notice"),
        })
    }

    /// 路由：启用变体时按比较字段查找已有商品（含已软删除）
    async fn route(&self, record: &RowRecord) -> ImportResult<Option<Product>> {
        let Some(comparator) = self.comparator else {
            return Ok(None);
        };
        let Some(value) = comparator.lookup_value(record) else {
            return Ok(None);
        };
        Ok(self.repo.find_product_by(comparator, &value).await?)
    }
}

/// 错误链（最外层在前）
fn error_trace(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join("\n  caused by: ")
}

#[async_trait]
impl ProductImporter for ProductImporterImpl {
    #[instrument(skip(self), fields(batch_id))]
    async fn import_source(&self, source: &ImportSource) -> ImportResult<ImportReport> {
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        info!(source = %source, "开始导入商品数据");

        let log = ImportLog::open(self.settings.log_to.as_deref()).map_err(|e| {
            error!(error = %e, "导入日志无法打开");
            ImportError::from(e)
        })?;

        match self.run(source, &batch_id, &log).await {
            Ok(report) => Ok(report),
            Err(e) => {
                log.error(t_with_args("import.fatal", &[("message", &e.to_string())]));
                log.error(error_trace(&e));
                error!(error = %e, "导入中止");
                Err(e)
            }
        }
    }
}
