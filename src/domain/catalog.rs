// ==========================================
// 商品目录导入 - 目录领域模型
// ==========================================
// 职责: 商品 / 变体 / 分类树 / 规格 / 图片 / 店铺 实体
// 对齐: db::init_catalog_schema 建表语句
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Product - 商品
// ==========================================
// 唯一标识: slug（目录内唯一，软删除后仍占用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub available_on: Option<DateTime<Utc>>,
    pub meta_title: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
    pub shipping_category_id: Option<i64>,
    pub deleted_at: Option<DateTime<Utc>>, // 软删除时间（NULL=有效）
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// ==========================================
// Variant - 商品变体
// ==========================================
// is_master=true 为主变体：随商品创建，承载商品级 SKU/价格/尺寸，商品图片挂在主变体上
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub sku: Option<String>,
    pub is_master: bool,
    pub price: Option<f64>,
    pub cost_price: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// 变体可写属性（主变体与普通变体共用）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantAttributes {
    pub sku: Option<String>,
    pub price: Option<f64>,
    pub cost_price: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub depth: Option<f64>,
}

impl VariantAttributes {
    /// 价格校验（价格必填且非负，成本价若有则非负）
    pub fn validate_prices(&self, errors: &mut Vec<String>) {
        match self.price {
            None => errors.push("price: 不能为空".to_string()),
            Some(p) if p < 0.0 => errors.push(format!("price: 不能为负数 ({})", p)),
            Some(_) => {}
        }
        if let Some(c) = self.cost_price {
            if c < 0.0 {
                errors.push(format!("cost_price: 不能为负数 ({})", c));
            }
        }
    }
}

// ==========================================
// ProductDraft - 待落库商品
// ==========================================
// 用途: Record Builder 在内存中组装，校验通过后才写库
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub available_on: Option<DateTime<Utc>>,
    pub meta_title: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
    pub shipping_category_id: Option<i64>,
    pub master: VariantAttributes,
}

impl ProductDraft {
    /// 最终 slug：显式 slug 优先，否则由名称派生
    pub fn resolved_slug(&self) -> Option<String> {
        self.slug
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
            .or_else(|| self.name.as_deref().map(slugify).filter(|s| !s.is_empty()))
    }

    /// 字段校验，返回全部错误（空 = 通过）
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.as_deref().map(str::trim).unwrap_or("").is_empty() {
            errors.push("name: 不能为空".to_string());
        }
        if self.resolved_slug().is_none() {
            errors.push("slug: 无法生成".to_string());
        }
        self.master.validate_prices(&mut errors);

        errors
    }
}

// ==========================================
// VariantDraft - 待落库变体
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantDraft {
    pub id: Option<i64>, // None = 新建
    pub product_id: i64,
    pub attributes: VariantAttributes,
    pub option_type_ids: Vec<i64>, // 保存时关联到商品
    pub option_value_ids: Vec<i64>,
}

impl VariantDraft {
    pub fn new(product_id: i64) -> Self {
        Self {
            product_id,
            ..Default::default()
        }
    }

    pub fn from_existing(variant: &Variant) -> Self {
        Self {
            id: Some(variant.id),
            product_id: variant.product_id,
            attributes: VariantAttributes {
                sku: variant.sku.clone(),
                price: variant.price,
                cost_price: variant.cost_price,
                weight: variant.weight,
                height: variant.height,
                width: variant.width,
                depth: variant.depth,
            },
            option_type_ids: Vec::new(),
            option_value_ids: Vec::new(),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        self.attributes.validate_prices(&mut errors);
        errors
    }
}

// ==========================================
// 分类树
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    pub id: i64,
    pub name: String,
    pub root_taxon_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxon {
    pub id: i64,
    pub taxonomy_id: i64,
    pub parent_id: Option<i64>, // 根节点为 None
    pub name: String,
}

// ==========================================
// 规格（OptionType / OptionValue）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionType {
    pub id: i64,
    pub name: String,
    pub presentation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionValue {
    pub id: i64,
    pub option_type_id: i64,
    pub name: String,
    pub presentation: String,
}

// ==========================================
// 图片
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    pub id: i64,
    pub variant_id: i64,
    pub position: i32,
    pub file_name: String,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// 待写入图片
#[derive(Debug, Clone)]
pub struct NewImage {
    pub variant_id: i64,
    pub position: i32,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

// ==========================================
// 店铺 / 物流类别
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingCategory {
    pub id: i64,
    pub name: String,
}

/// 名称 → slug（小写，非字母数字折叠为单个 '-'，去首尾 '-'）
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for ch in value.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    slug
}
