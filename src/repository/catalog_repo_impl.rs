// ==========================================
// 商品目录导入 - 目录 Repository 实现
// ==========================================
// 职责: 实现目录数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约定: 每个写操作独立提交（行级提交，导入运行整体不做事务）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::catalog::{
    ImageAsset, NewImage, OptionType, OptionValue, Product, ProductDraft, Store, Taxon, Taxonomy,
    Variant, VariantDraft,
};
use crate::domain::types::ComparatorField;
use crate::repository::catalog_repo::{CatalogRepository, CreatedProduct};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const PRODUCT_COLUMNS: &str = "id, name, slug, description, available_on, meta_title, \
     meta_keywords, meta_description, shipping_category_id, deleted_at, created_at, updated_at";

const VARIANT_COLUMNS: &str =
    "id, product_id, sku, is_master, price, cost_price, weight, height, width, depth, deleted_at";

const DELETED_SLUG_MARKER: &str = "-deleted-";

/// 软删除 slug → 原 slug
fn original_slug(punched: &str) -> Option<&str> {
    let (original, stamp) = punched.rsplit_once(DELETED_SLUG_MARKER)?;
    (!original.is_empty() && stamp.parse::<i64>().is_ok()).then_some(original)
}

fn map_product(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        available_on: row.get(4)?,
        meta_title: row.get(5)?,
        meta_keywords: row.get(6)?,
        meta_description: row.get(7)?,
        shipping_category_id: row.get(8)?,
        deleted_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn map_variant(row: &Row<'_>) -> rusqlite::Result<Variant> {
    Ok(Variant {
        id: row.get(0)?,
        product_id: row.get(1)?,
        sku: row.get(2)?,
        is_master: row.get::<_, i32>(3)? != 0,
        price: row.get(4)?,
        cost_price: row.get(5)?,
        weight: row.get(6)?,
        height: row.get(7)?,
        width: row.get(8)?,
        depth: row.get(9)?,
        deleted_at: row.get(10)?,
    })
}

// ==========================================
// CatalogRepositoryImpl
// ==========================================
pub struct CatalogRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 查询辅助（非导入主流程）=====

    /// 有效商品列表（按 id 排序）
    pub fn list_active_products(&self) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM products WHERE deleted_at IS NULL ORDER BY id",
            PRODUCT_COLUMNS
        ))?;
        let products = stmt
            .query_map([], map_product)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    pub fn find_product_by_slug(&self, slug: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                &format!("SELECT {} FROM products WHERE slug = ?1", PRODUCT_COLUMNS),
                params![slug],
                map_product,
            )
            .optional()?;
        Ok(product)
    }

    /// 商品关联的分类节点（按 id 排序）
    pub fn list_product_taxons(&self, product_id: i64) -> RepositoryResult<Vec<Taxon>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.taxonomy_id, t.parent_id, t.name
            FROM products_taxons pt
            JOIN taxons t ON t.id = pt.taxon_id
            WHERE pt.product_id = ?1
            ORDER BY t.id
            "#,
        )?;
        let taxons = stmt
            .query_map(params![product_id], |row| {
                Ok(Taxon {
                    id: row.get(0)?,
                    taxonomy_id: row.get(1)?,
                    parent_id: row.get(2)?,
                    name: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(taxons)
    }

    /// 变体图片（按 position 排序）
    pub fn list_variant_images(&self, variant_id: i64) -> RepositoryResult<Vec<ImageAsset>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, variant_id, position, file_name, content_type, data
            FROM images WHERE variant_id = ?1 ORDER BY position, id
            "#,
        )?;
        let images = stmt
            .query_map(params![variant_id], |row| {
                Ok(ImageAsset {
                    id: row.get(0)?,
                    variant_id: row.get(1)?,
                    position: row.get(2)?,
                    file_name: row.get(3)?,
                    content_type: row.get(4)?,
                    data: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(images)
    }

    /// 变体关联的规格值
    pub fn list_variant_option_values(&self, variant_id: i64) -> RepositoryResult<Vec<OptionValue>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT ov.id, ov.option_type_id, ov.name, ov.presentation
            FROM option_values_variants ovv
            JOIN option_values ov ON ov.id = ovv.option_value_id
            WHERE ovv.variant_id = ?1
            ORDER BY ov.id
            "#,
        )?;
        let values = stmt
            .query_map(params![variant_id], map_option_value)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    /// 商品关联的规格类型 id
    pub fn list_product_option_type_ids(&self, product_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT option_type_id FROM product_option_types WHERE product_id = ?1 ORDER BY option_type_id",
        )?;
        let ids = stmt
            .query_map(params![product_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// 商品关联的店铺 id
    pub fn list_product_store_ids(&self, product_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT store_id FROM products_stores WHERE product_id = ?1 ORDER BY store_id",
        )?;
        let ids = stmt
            .query_map(params![product_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }
}

fn map_option_value(row: &Row<'_>) -> rusqlite::Result<OptionValue> {
    Ok(OptionValue {
        id: row.get(0)?,
        option_type_id: row.get(1)?,
        name: row.get(2)?,
        presentation: row.get(3)?,
    })
}

#[async_trait]
impl CatalogRepository for CatalogRepositoryImpl {
    async fn snapshot_product_slugs(&self) -> RepositoryResult<Vec<(i64, String)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT id, slug FROM products WHERE deleted_at IS NULL ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(i64, String)>, _>>()?;
        Ok(rows)
    }

    async fn find_product_by(
        &self,
        field: ComparatorField,
        value: &str,
    ) -> RepositoryResult<Option<Product>> {
        let sql = match field {
            ComparatorField::Name => format!(
                "SELECT {} FROM products WHERE name = ?1 ORDER BY id LIMIT 1",
                PRODUCT_COLUMNS
            ),
            ComparatorField::Slug => format!(
                "SELECT {} FROM products WHERE slug = ?1 ORDER BY id LIMIT 1",
                PRODUCT_COLUMNS
            ),
            ComparatorField::Sku => format!(
                "SELECT {} FROM products WHERE id = (
                    SELECT product_id FROM variants WHERE is_master = 1 AND sku = ?1 ORDER BY id LIMIT 1
                 )",
                PRODUCT_COLUMNS
            ),
        };

        let conn = self.get_conn()?;
        let product = conn.query_row(&sql, params![value], map_product).optional()?;
        Ok(product)
    }

    async fn find_product(&self, product_id: i64) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS),
                params![product_id],
                map_product,
            )
            .optional()?;
        Ok(product)
    }

    async fn insert_product(
        &self,
        draft: &ProductDraft,
        slug: &str,
    ) -> RepositoryResult<CreatedProduct> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();

        tx.execute(
            r#"
            INSERT INTO products (
                name, slug, description, available_on, meta_title, meta_keywords,
                meta_description, shipping_category_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                draft.name.as_deref().unwrap_or_default(),
                slug,
                draft.description,
                draft.available_on,
                draft.meta_title,
                draft.meta_keywords,
                draft.meta_description,
                draft.shipping_category_id,
                now,
            ],
        )?;
        let product_id = tx.last_insert_rowid();

        let master = &draft.master;
        tx.execute(
            r#"
            INSERT INTO variants (
                product_id, sku, is_master, price, cost_price, weight, height, width, depth,
                created_at, updated_at
            ) VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                product_id,
                master.sku,
                master.price,
                master.cost_price,
                master.weight,
                master.height,
                master.width,
                master.depth,
                now,
            ],
        )?;
        let master_variant_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(CreatedProduct {
            product_id,
            master_variant_id,
        })
    }

    async fn restore_product(&self, product_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let punched: Option<String> = tx
            .query_row(
                "SELECT slug FROM products WHERE id = ?1 AND deleted_at IS NOT NULL",
                params![product_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(punched) = punched else {
            return Ok(());
        };

        // 原 slug 仍空闲时归还，否则保留删除后的 slug
        let slug = match original_slug(&punched) {
            Some(original) => {
                let taken: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM products WHERE slug = ?1)",
                    params![original],
                    |row| row.get(0),
                )?;
                if taken {
                    punched.clone()
                } else {
                    original.to_string()
                }
            }
            None => punched.clone(),
        };

        tx.execute(
            "UPDATE products SET deleted_at = NULL, slug = ?2, updated_at = ?3 WHERE id = ?1",
            params![product_id, slug, Utc::now()],
        )?;
        tx.execute(
            "UPDATE variants SET deleted_at = NULL WHERE product_id = ?1 AND deleted_at IS NOT NULL",
            params![product_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn destroy_products(&self, product_ids: &[i64]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();
        let suffix = format!("{}{}", DELETED_SLUG_MARKER, now.timestamp());

        let mut count = 0;
        for product_id in product_ids {
            count += tx.execute(
                "UPDATE products SET deleted_at = ?2, updated_at = ?2, slug = slug || ?3
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![product_id, now, suffix],
            )?;
            tx.execute(
                "UPDATE variants SET deleted_at = ?2, updated_at = ?2 WHERE product_id = ?1 AND deleted_at IS NULL",
                params![product_id, now],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    async fn find_master_variant(&self, product_id: i64) -> RepositoryResult<Option<Variant>> {
        let conn = self.get_conn()?;
        let variant = conn
            .query_row(
                &format!(
                    "SELECT {} FROM variants WHERE product_id = ?1 AND is_master = 1 ORDER BY id LIMIT 1",
                    VARIANT_COLUMNS
                ),
                params![product_id],
                map_variant,
            )
            .optional()?;
        Ok(variant)
    }

    async fn find_variant_by_sku(
        &self,
        product_id: i64,
        sku: Option<&str>,
    ) -> RepositoryResult<Option<Variant>> {
        let conn = self.get_conn()?;
        let variant = match sku {
            Some(sku) => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM variants WHERE product_id = ?1 AND is_master = 0 AND sku = ?2 ORDER BY id LIMIT 1",
                        VARIANT_COLUMNS
                    ),
                    params![product_id, sku],
                    map_variant,
                )
                .optional()?,
            None => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM variants WHERE product_id = ?1 AND is_master = 0 AND sku IS NULL ORDER BY id LIMIT 1",
                        VARIANT_COLUMNS
                    ),
                    params![product_id],
                    map_variant,
                )
                .optional()?,
        };
        Ok(variant)
    }

    async fn list_variants(&self, product_id: i64) -> RepositoryResult<Vec<Variant>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM variants WHERE product_id = ?1 ORDER BY id",
            VARIANT_COLUMNS
        ))?;
        let variants = stmt
            .query_map(params![product_id], map_variant)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(variants)
    }

    async fn save_variant(&self, draft: &VariantDraft) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let now = Utc::now();
        let attrs = &draft.attributes;

        match draft.id {
            Some(id) => {
                let affected = conn.execute(
                    r#"
                    UPDATE variants SET
                        sku = ?2, price = ?3, cost_price = ?4, weight = ?5, height = ?6,
                        width = ?7, depth = ?8, updated_at = ?9
                    WHERE id = ?1
                    "#,
                    params![
                        id,
                        attrs.sku,
                        attrs.price,
                        attrs.cost_price,
                        attrs.weight,
                        attrs.height,
                        attrs.width,
                        attrs.depth,
                        now,
                    ],
                )?;
                if affected == 0 {
                    return Err(RepositoryError::NotFound {
                        entity: "Variant".to_string(),
                        id: id.to_string(),
                    });
                }
                Ok(id)
            }
            None => {
                conn.execute(
                    r#"
                    INSERT INTO variants (
                        product_id, sku, is_master, price, cost_price, weight, height, width, depth,
                        created_at, updated_at
                    ) VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                    "#,
                    params![
                        draft.product_id,
                        attrs.sku,
                        attrs.price,
                        attrs.cost_price,
                        attrs.weight,
                        attrs.height,
                        attrs.width,
                        attrs.depth,
                        now,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }
        }
    }

    async fn clear_variant_option_values(&self, variant_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM option_values_variants WHERE variant_id = ?1",
            params![variant_id],
        )?;
        Ok(())
    }

    async fn link_variant_option_values(
        &self,
        variant_id: i64,
        option_value_ids: &[i64],
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO option_values_variants (variant_id, option_value_id) VALUES (?1, ?2)",
        )?;
        for option_value_id in option_value_ids {
            stmt.execute(params![variant_id, option_value_id])?;
        }
        Ok(())
    }

    async fn destroy_variant_images(&self, variant_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count = conn.execute("DELETE FROM images WHERE variant_id = ?1", params![variant_id])?;
        Ok(count)
    }

    async fn count_variant_images(&self, variant_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM images WHERE variant_id = ?1",
            params![variant_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn insert_image(&self, image: NewImage) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO images (variant_id, position, file_name, content_type, data)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                image.variant_id,
                image.position,
                image.file_name,
                image.content_type,
                image.data,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn find_taxonomy_by_name(&self, name: &str) -> RepositoryResult<Option<Taxonomy>> {
        let conn = self.get_conn()?;
        let found: Option<(i64, String, Option<i64>)> = conn
            .query_row(
                r#"
                SELECT t.id, t.name,
                       (SELECT r.id FROM taxons r
                        WHERE r.taxonomy_id = t.id AND r.parent_id IS NULL
                        ORDER BY r.id LIMIT 1)
                FROM taxonomies t
                WHERE lower(t.name) = lower(?1)
                ORDER BY t.id LIMIT 1
                "#,
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((id, name, root)) = found else {
            return Ok(None);
        };

        // 外部创建的分类树可能缺根节点，补建
        let root_taxon_id = match root {
            Some(root_id) => root_id,
            None => {
                conn.execute(
                    "INSERT INTO taxons (taxonomy_id, parent_id, name) VALUES (?1, NULL, ?2)",
                    params![id, name],
                )?;
                conn.last_insert_rowid()
            }
        };

        Ok(Some(Taxonomy {
            id,
            name,
            root_taxon_id,
        }))
    }

    async fn create_taxonomy(&self, name: &str) -> RepositoryResult<Taxonomy> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute("INSERT INTO taxonomies (name) VALUES (?1)", params![name])?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO taxons (taxonomy_id, parent_id, name) VALUES (?1, NULL, ?2)",
            params![id, name],
        )?;
        let root_taxon_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(Taxonomy {
            id,
            name: name.to_string(),
            root_taxon_id,
        })
    }

    async fn find_or_create_child_taxon(
        &self,
        taxonomy_id: i64,
        parent_id: i64,
        name: &str,
    ) -> RepositoryResult<Taxon> {
        let conn = self.get_conn()?;
        let existing: Option<i64> = conn
            .query_row(
                r#"
                SELECT id FROM taxons
                WHERE taxonomy_id = ?1 AND parent_id = ?2 AND name = ?3
                ORDER BY id LIMIT 1
                "#,
                params![taxonomy_id, parent_id, name],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => {
                conn.execute(
                    "INSERT INTO taxons (taxonomy_id, parent_id, name) VALUES (?1, ?2, ?3)",
                    params![taxonomy_id, parent_id, name],
                )?;
                conn.last_insert_rowid()
            }
        };

        Ok(Taxon {
            id,
            taxonomy_id,
            parent_id: Some(parent_id),
            name: name.to_string(),
        })
    }

    async fn link_product_taxon(&self, product_id: i64, taxon_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO products_taxons (product_id, taxon_id) VALUES (?1, ?2)",
            params![product_id, taxon_id],
        )?;
        Ok(inserted > 0)
    }

    async fn find_option_type(&self, field: &str) -> RepositoryResult<Option<OptionType>> {
        let conn = self.get_conn()?;
        let option_type = conn
            .query_row(
                r#"
                SELECT id, name, presentation FROM option_types
                WHERE lower(presentation) = lower(?1) OR lower(name) = lower(?1)
                ORDER BY id LIMIT 1
                "#,
                params![field],
                |row| {
                    Ok(OptionType {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        presentation: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(option_type)
    }

    async fn link_product_option_type(
        &self,
        product_id: i64,
        option_type_id: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO product_option_types (product_id, option_type_id) VALUES (?1, ?2)",
            params![product_id, option_type_id],
        )?;
        Ok(())
    }

    async fn find_option_values(
        &self,
        option_type_id: i64,
        value: &str,
    ) -> RepositoryResult<Vec<OptionValue>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, option_type_id, name, presentation FROM option_values
            WHERE option_type_id = ?1 AND (presentation = ?2 OR name = ?2)
            ORDER BY id
            "#,
        )?;
        let values = stmt
            .query_map(params![option_type_id, value], map_option_value)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    fn supports_stores(&self) -> bool {
        true
    }

    async fn find_store(&self, id_or_code: &str) -> RepositoryResult<Option<Store>> {
        let conn = self.get_conn()?;
        let store = conn
            .query_row(
                r#"
                SELECT id, code, name FROM stores
                WHERE CAST(id AS TEXT) = ?1 OR code = ?1
                ORDER BY id LIMIT 1
                "#,
                params![id_or_code],
                |row| {
                    Ok(Store {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(store)
    }

    async fn link_product_store(&self, product_id: i64, store_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO products_stores (product_id, store_id) VALUES (?1, ?2)",
            params![product_id, store_id],
        )?;
        Ok(())
    }

    async fn find_or_create_shipping_category(&self, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO shipping_categories (name) VALUES (?1)",
            params![name],
        )?;
        let id = conn.query_row(
            "SELECT id FROM shipping_categories WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}
