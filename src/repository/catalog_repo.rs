// ==========================================
// 商品目录导入 - 目录 Repository Trait
// ==========================================
// 职责: 定义导入流程所需的目录数据访问接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::catalog::{
    NewImage, OptionType, OptionValue, Product, ProductDraft, Store, Taxon, Taxonomy, Variant,
    VariantDraft,
};
use crate::domain::types::ComparatorField;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

/// 新建商品的落库结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedProduct {
    pub product_id: i64,
    pub master_variant_id: i64,
}

// ==========================================
// CatalogRepository Trait
// ==========================================
// 用途: 导入器访问目录存储的唯一通道
// 实现者: CatalogRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    // ===== 商品 =====

    /// 有效商品（未软删除）的 (id, slug) 快照
    async fn snapshot_product_slugs(&self) -> RepositoryResult<Vec<(i64, String)>>;

    /// 按比较字段查找商品（取第一条，包含已软删除的商品）
    async fn find_product_by(
        &self,
        field: ComparatorField,
        value: &str,
    ) -> RepositoryResult<Option<Product>>;

    async fn find_product(&self, product_id: i64) -> RepositoryResult<Option<Product>>;

    /// 插入商品及其主变体（单事务）
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): slug 已被占用
    async fn insert_product(
        &self,
        draft: &ProductDraft,
        slug: &str,
    ) -> RepositoryResult<CreatedProduct>;

    /// 取消商品及其全部变体的软删除（原 slug 空闲时归还）
    async fn restore_product(&self, product_id: i64) -> RepositoryResult<()>;

    /// 软删除商品及其全部变体，返回受影响商品数
    ///
    /// 商品 slug 改写为 `{slug}-deleted-{时间戳}`，原 slug 可被后续导入重新使用
    async fn destroy_products(&self, product_ids: &[i64]) -> RepositoryResult<usize>;

    // ===== 变体 =====

    async fn find_master_variant(&self, product_id: i64) -> RepositoryResult<Option<Variant>>;

    /// 按 SKU 查找商品下的非主变体（sku 为 None 时匹配 SKU 为空的变体）
    async fn find_variant_by_sku(
        &self,
        product_id: i64,
        sku: Option<&str>,
    ) -> RepositoryResult<Option<Variant>>;

    /// 商品全部变体（含主变体，按 id 排序）
    async fn list_variants(&self, product_id: i64) -> RepositoryResult<Vec<Variant>>;

    /// 保存变体（id 为 None 时插入），返回变体 id
    async fn save_variant(&self, draft: &VariantDraft) -> RepositoryResult<i64>;

    async fn clear_variant_option_values(&self, variant_id: i64) -> RepositoryResult<()>;

    async fn link_variant_option_values(
        &self,
        variant_id: i64,
        option_value_ids: &[i64],
    ) -> RepositoryResult<()>;

    async fn destroy_variant_images(&self, variant_id: i64) -> RepositoryResult<usize>;

    // ===== 图片 =====

    async fn count_variant_images(&self, variant_id: i64) -> RepositoryResult<i64>;

    async fn insert_image(&self, image: NewImage) -> RepositoryResult<i64>;

    // ===== 分类树 =====

    /// 按名称（忽略大小写）查找分类树
    async fn find_taxonomy_by_name(&self, name: &str) -> RepositoryResult<Option<Taxonomy>>;

    /// 创建分类树及其同名根节点
    async fn create_taxonomy(&self, name: &str) -> RepositoryResult<Taxonomy>;

    /// 在 parent 下按名称（精确匹配）查找或创建子节点
    async fn find_or_create_child_taxon(
        &self,
        taxonomy_id: i64,
        parent_id: i64,
        name: &str,
    ) -> RepositoryResult<Taxon>;

    /// 关联商品与分类节点；已关联时返回 false
    async fn link_product_taxon(&self, product_id: i64, taxon_id: i64) -> RepositoryResult<bool>;

    // ===== 规格 =====

    /// 按 name 或 presentation（忽略大小写）查找规格类型
    async fn find_option_type(&self, field: &str) -> RepositoryResult<Option<OptionType>>;

    async fn link_product_option_type(
        &self,
        product_id: i64,
        option_type_id: i64,
    ) -> RepositoryResult<()>;

    /// 按 presentation 或 name（区分大小写）查找规格值
    async fn find_option_values(
        &self,
        option_type_id: i64,
        value: &str,
    ) -> RepositoryResult<Vec<OptionValue>>;

    // ===== 店铺 / 物流类别 =====

    /// 存储是否支持店铺关联
    fn supports_stores(&self) -> bool;

    /// 按 id 或 code 查找店铺
    async fn find_store(&self, id_or_code: &str) -> RepositoryResult<Option<Store>>;

    async fn link_product_store(&self, product_id: i64, store_id: i64) -> RepositoryResult<()>;

    async fn find_or_create_shipping_category(&self, name: &str) -> RepositoryResult<i64>;
}
