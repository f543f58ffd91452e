// ==========================================
// 商品目录导入 - 记录构建器
// ==========================================
// 职责: 单行字段集 → 新商品 / 已有商品的变体
// 流程（商品）: master_price→price → 白名单赋值 → 扩展点 → 校验
//              → 快照去重 → 落库 → 分类 → 图片（主变体）→ 店铺
// 流程（变体）: 按 SKU 查找或新建 → 白名单赋值 + 规格匹配 → 校验
//              → 清空旧规格值与图片 → 落库 → 分类 → 图片 → 日志
// 约定: 校验失败是行级结果（BuildOutcome::Invalid），不写库；只有存储故障返回 Err
// ==========================================

use crate::config::ImportSettings;
use crate::domain::catalog::{NewImage, Product, ProductDraft, VariantDraft};
use crate::domain::import::{RowOutcome, RowRecord};
use crate::i18n::t_with_args;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_schema::{ProductField, VariantField};
use crate::importer::product_importer_trait::{AssetFetch, AssetFetcher, ProductBuildHook};
use crate::importer::taxonomy_resolver::TaxonomyResolver;
use crate::logging::ImportLog;
use crate::repository::CatalogRepository;
use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// 单行构建结果
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    ProductCreated {
        product_id: i64,
        master_variant_id: i64,
        slug: String,
    },
    /// slug 在导入前快照中，未做任何写入
    AlreadyPresent { slug: String },
    VariantSaved {
        product_id: i64,
        variant_id: i64,
        sku: Option<String>,
    },
    /// 校验失败，未做任何写入
    Invalid { reasons: Vec<String> },
}

impl From<BuildOutcome> for RowOutcome {
    fn from(outcome: BuildOutcome) -> Self {
        match outcome {
            BuildOutcome::ProductCreated {
                product_id, slug, ..
            } => RowOutcome::ProductCreated { product_id, slug },
            BuildOutcome::AlreadyPresent { slug } => RowOutcome::AlreadyPresent { slug },
            BuildOutcome::VariantSaved {
                product_id,
                variant_id,
                sku,
            } => RowOutcome::VariantImported {
                product_id,
                variant_id,
                sku,
            },
            BuildOutcome::Invalid { reasons } => RowOutcome::Failed { reasons },
        }
    }
}

/// 店铺关联结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLink {
    Linked { store_id: i64 },
    /// 店铺字段缺失或按 id / code 找不到店铺
    NotFound { reference: Option<String> },
    /// 存储不支持店铺关联
    Unsupported,
}

pub struct RecordBuilder {
    repo: Arc<dyn CatalogRepository>,
    fetcher: Arc<dyn AssetFetcher>,
    hook: Arc<dyn ProductBuildHook>,
    taxonomy: TaxonomyResolver,
    settings: Arc<ImportSettings>,
}

impl RecordBuilder {
    pub fn new(
        repo: Arc<dyn CatalogRepository>,
        fetcher: Arc<dyn AssetFetcher>,
        hook: Arc<dyn ProductBuildHook>,
        settings: Arc<ImportSettings>,
    ) -> Self {
        let taxonomy = TaxonomyResolver::new(repo.clone(), settings.create_missing_taxonomies);
        Self {
            repo,
            fetcher,
            hook,
            taxonomy,
            settings,
        }
    }

    /// 行默认值
    ///
    /// - available_on 缺省 → 当前时间前一天
    /// - shipping_category（名称）→ 查找或创建后写入 shipping_category_id，并移除原字段
    pub async fn apply_row_defaults(&self, row: &mut RowRecord) -> ImportResult<()> {
        if !row.contains("available_on") {
            let yesterday = Utc::now() - Duration::days(1);
            row.set("available_on", Some(yesterday.to_rfc3339()));
        }

        if let Some(name) = row.remove("shipping_category") {
            let id = self.repo.find_or_create_shipping_category(&name).await?;
            row.set("shipping_category_id", Some(id.to_string()));
        }

        Ok(())
    }

    // ==========================================
    // 商品
    // ==========================================

    #[instrument(skip_all, fields(row_number = row.row_number))]
    pub async fn build_product(
        &self,
        row: &RowRecord,
        snapshot: &HashSet<String>,
        log: &ImportLog,
    ) -> ImportResult<BuildOutcome> {
        let mut fields = row.clone();
        fields.rename("master_price", "price");

        let mut draft = ProductDraft::default();
        let mut reasons = Vec::new();
        for (key, value) in fields.iter() {
            match ProductField::from_key(key) {
                Some(field) => {
                    if let Err(e) = field.apply(&mut draft, key, value) {
                        reasons.push(e);
                    }
                }
                None => self.note_dropped("product", key),
            }
        }

        self.hook.after_product_built(&mut draft, &fields).await;

        reasons.extend(draft.validate());
        if !reasons.is_empty() {
            log.error(t_with_args(
                "product.invalid",
                &[
                    ("fields", &fields.to_string()),
                    ("errors", &reasons.join("; ")),
                ],
            ));
            return Ok(BuildOutcome::Invalid { reasons });
        }

        let name = draft.name.clone().unwrap_or_default();
        let slug = draft
            .resolved_slug()
            .ok_or_else(|| ImportError::InternalError("校验通过但 slug 为空".to_string()))?;

        if snapshot.contains(&slug) {
            log.info(t_with_args("product.already_present", &[("name", &name)]));
            return Ok(BuildOutcome::AlreadyPresent { slug });
        }

        let created = match self.repo.insert_product(&draft, &slug).await {
            Ok(c) => c,
            Err(e) if e.is_unique_violation() => {
                let reason = format!("slug: {} 已被占用", slug);
                log.error(t_with_args(
                    "product.slug_taken",
                    &[("name", &name), ("slug", &slug)],
                ));
                return Ok(BuildOutcome::Invalid {
                    reasons: vec![reason],
                });
            }
            Err(e) => return Err(e.into()),
        };
        debug!(product_id = created.product_id, slug = %slug, "商品已写入");

        self.associate_taxons(created.product_id, &fields, log).await?;
        self.attach_images(created.master_variant_id, &fields, log).await?;

        if self.settings.multi_domain_importing {
            let link = self.link_store(created.product_id, &fields).await?;
            if let StoreLink::NotFound { .. } = link {
                log.warn(t_with_args("product.store_unlinked", &[("name", &name)]));
            }
        }

        log.info(t_with_args("product.imported", &[("name", &name)]));
        Ok(BuildOutcome::ProductCreated {
            product_id: created.product_id,
            master_variant_id: created.master_variant_id,
            slug,
        })
    }

    // ==========================================
    // 变体
    // ==========================================

    #[instrument(skip_all, fields(row_number = row.row_number, product_id = product.id))]
    pub async fn build_variant(
        &self,
        product: &Product,
        row: &RowRecord,
        log: &ImportLog,
    ) -> ImportResult<BuildOutcome> {
        let sku = row.get("sku");
        let mut draft = match self.repo.find_variant_by_sku(product.id, sku).await? {
            Some(existing) => VariantDraft::from_existing(&existing),
            None => VariantDraft::new(product.id),
        };

        let mut fields = row.clone();
        fields.rename("master_price", "price");

        let mut reasons = Vec::new();
        for (key, value) in fields.iter() {
            let settable = VariantField::from_key(key);
            if let Some(field) = settable {
                if let Err(e) = field.apply(&mut draft.attributes, key, value) {
                    reasons.push(e);
                }
            }

            // 同一字段可以既是变体属性又是规格类型
            let option_type = self.repo.find_option_type(key).await?;
            if let Some(option_type) = &option_type {
                if !draft.option_type_ids.contains(&option_type.id) {
                    draft.option_type_ids.push(option_type.id);
                }
                for option_value in self.repo.find_option_values(option_type.id, value).await? {
                    if !draft.option_value_ids.contains(&option_value.id) {
                        draft.option_value_ids.push(option_value.id);
                    }
                }
            }

            if settable.is_none() && option_type.is_none() {
                self.note_dropped("variant", key);
            }
        }

        // 未给价格的变体沿用主变体价格
        if draft.attributes.price.is_none() {
            if let Some(master) = self.repo.find_master_variant(product.id).await? {
                draft.attributes.price = master.price;
            }
        }

        reasons.extend(draft.validate());
        if !reasons.is_empty() {
            log.error(t_with_args(
                "variant.invalid",
                &[
                    ("fields", &fields.to_string()),
                    ("errors", &reasons.join("; ")),
                ],
            ));
            return Ok(BuildOutcome::Invalid { reasons });
        }

        if product.is_deleted() {
            self.repo.restore_product(product.id).await?;
            log.info(t_with_args("product.restored", &[("name", &product.name)]));
        }

        // 整体替换：校验通过后才清除旧规格值与旧图片
        if let Some(existing_id) = draft.id {
            self.repo.clear_variant_option_values(existing_id).await?;
            let removed = self.repo.destroy_variant_images(existing_id).await?;
            debug!(variant_id = existing_id, removed, "已清除变体旧规格值与图片");
        }
        for option_type_id in &draft.option_type_ids {
            self.repo
                .link_product_option_type(product.id, *option_type_id)
                .await?;
        }

        let variant_id = self.repo.save_variant(&draft).await?;
        self.repo
            .link_variant_option_values(variant_id, &draft.option_value_ids)
            .await?;

        self.associate_taxons(product.id, &fields, log).await?;
        self.attach_images(variant_id, &fields, log).await?;

        let sku = draft.attributes.sku.clone();
        log.info(t_with_args(
            "variant.imported",
            &[("sku", sku.as_deref().unwrap_or_default())],
        ));
        Ok(BuildOutcome::VariantSaved {
            product_id: product.id,
            variant_id,
            sku,
        })
    }

    // ==========================================
    // 关联
    // ==========================================

    async fn associate_taxons(
        &self,
        product_id: i64,
        fields: &RowRecord,
        log: &ImportLog,
    ) -> ImportResult<()> {
        for field in &self.settings.taxonomy_fields {
            self.taxonomy
                .associate(product_id, Some(field.as_str()), fields.get(field), log)
                .await?;
        }
        Ok(())
    }

    /// 按配置顺序获取图片并挂到变体上（获取失败记日志后跳过）
    async fn attach_images(
        &self,
        variant_id: i64,
        fields: &RowRecord,
        log: &ImportLog,
    ) -> ImportResult<usize> {
        let mut attached = 0;
        for field in &self.settings.image_fields {
            let Some(locator) = fields.get(field) else {
                continue;
            };

            match self.fetcher.fetch(locator).await {
                AssetFetch::Fetched {
                    file_name,
                    content_type,
                    data,
                } => {
                    // 位置从 0 起，等于已有图片数
                    let position = self.repo.count_variant_images(variant_id).await? as i32;
                    self.repo
                        .insert_image(NewImage {
                            variant_id,
                            position,
                            file_name,
                            content_type,
                            data,
                        })
                        .await?;
                    attached += 1;
                }
                AssetFetch::Missing { path, reason } => {
                    debug!(path = %path, reason = %reason, "本地图片不可用");
                    log.warn(t_with_args("image.missing", &[("path", &path)]));
                }
                AssetFetch::HttpStatus { url, status } => {
                    log.warn(t_with_args(
                        "image.http_status",
                        &[("url", &url), ("status", &status.to_string())],
                    ));
                }
                AssetFetch::Transport { url, message } => {
                    log.warn(t_with_args(
                        "image.transport",
                        &[("url", &url), ("message", &message)],
                    ));
                }
            }
        }
        Ok(attached)
    }

    /// 按 id 或 code 查找店铺并关联
    pub async fn link_store(&self, product_id: i64, fields: &RowRecord) -> ImportResult<StoreLink> {
        if !self.repo.supports_stores() {
            return Ok(StoreLink::Unsupported);
        }

        let Some(reference) = fields.get(&self.settings.store_field) else {
            return Ok(StoreLink::NotFound { reference: None });
        };

        match self.repo.find_store(reference).await? {
            Some(store) => {
                self.repo.link_product_store(product_id, store.id).await?;
                Ok(StoreLink::Linked { store_id: store.id })
            }
            None => {
                warn!(product_id, store = %reference, "店铺不存在");
                Ok(StoreLink::NotFound {
                    reference: Some(reference.to_string()),
                })
            }
        }
    }

    /// 不可赋值字段：分类 / 图片 / 店铺字段属于预期，其余记 debug
    fn note_dropped(&self, entity: &str, key: &str) {
        let settings = &self.settings;
        let expected = settings.taxonomy_fields.iter().any(|f| f == key)
            || settings.image_fields.iter().any(|f| f == key)
            || settings.store_field == key;
        if !expected {
            debug!(entity, field = key, "字段不在可写白名单内，忽略");
        }
    }
}
