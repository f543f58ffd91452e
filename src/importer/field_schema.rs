// ==========================================
// 商品目录导入 - 可写字段白名单
// ==========================================
// 职责: 枚举商品 / 变体可被导入赋值的字段，并给出类型转换
// 规则: 不在白名单内的字段不赋值（debug 记录）
//       转换失败作为行级校验错误返回，不中止导入
// ==========================================

use crate::domain::catalog::{ProductDraft, VariantAttributes};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// 字段值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Decimal,
    Integer,
    Timestamp,
}

// ===== 类型转换 =====

pub fn coerce_decimal(field: &str, raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("{}: 无法解析为数值 ({})", field, raw))
}

pub fn coerce_integer(field: &str, raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| format!("{}: 无法解析为整数 ({})", field, raw))
}

/// 时间戳：RFC3339 / "YYYY-MM-DD HH:MM:SS" / "YYYY-MM-DD"（无时区按 UTC）
pub fn coerce_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, String> {
    let value = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Some(naive) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }
    Err(format!("{}: 无法解析为时间 ({})", field, raw))
}

// ==========================================
// VariantField - 变体可写字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantField {
    Sku,
    Price,
    CostPrice,
    Weight,
    Height,
    Width,
    Depth,
}

impl VariantField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "sku" => Some(VariantField::Sku),
            "price" => Some(VariantField::Price),
            "cost_price" => Some(VariantField::CostPrice),
            "weight" => Some(VariantField::Weight),
            "height" => Some(VariantField::Height),
            "width" => Some(VariantField::Width),
            "depth" => Some(VariantField::Depth),
            _ => None,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            VariantField::Sku => FieldKind::Text,
            _ => FieldKind::Decimal,
        }
    }

    pub fn apply(self, attrs: &mut VariantAttributes, key: &str, raw: &str) -> Result<(), String> {
        match self {
            VariantField::Sku => attrs.sku = Some(raw.to_string()),
            VariantField::Price => attrs.price = Some(coerce_decimal(key, raw)?),
            VariantField::CostPrice => attrs.cost_price = Some(coerce_decimal(key, raw)?),
            VariantField::Weight => attrs.weight = Some(coerce_decimal(key, raw)?),
            VariantField::Height => attrs.height = Some(coerce_decimal(key, raw)?),
            VariantField::Width => attrs.width = Some(coerce_decimal(key, raw)?),
            VariantField::Depth => attrs.depth = Some(coerce_decimal(key, raw)?),
        }
        Ok(())
    }
}

// ==========================================
// ProductField - 商品可写字段
// ==========================================
// 主变体字段（sku/价格/尺寸）经 Master 转发到主变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    Name,
    Slug,
    Description,
    AvailableOn,
    MetaTitle,
    MetaKeywords,
    MetaDescription,
    ShippingCategoryId,
    Master(VariantField),
}

impl ProductField {
    /// 语义字段名 → 商品字段（permalink 为 slug 的别名）
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(ProductField::Name),
            "slug" | "permalink" => Some(ProductField::Slug),
            "description" => Some(ProductField::Description),
            "available_on" => Some(ProductField::AvailableOn),
            "meta_title" => Some(ProductField::MetaTitle),
            "meta_keywords" => Some(ProductField::MetaKeywords),
            "meta_description" => Some(ProductField::MetaDescription),
            "shipping_category_id" => Some(ProductField::ShippingCategoryId),
            _ => VariantField::from_key(key).map(ProductField::Master),
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            ProductField::AvailableOn => FieldKind::Timestamp,
            ProductField::ShippingCategoryId => FieldKind::Integer,
            ProductField::Master(field) => field.kind(),
            _ => FieldKind::Text,
        }
    }

    pub fn apply(self, draft: &mut ProductDraft, key: &str, raw: &str) -> Result<(), String> {
        match self {
            ProductField::Name => draft.name = Some(raw.to_string()),
            ProductField::Slug => draft.slug = Some(raw.to_string()),
            ProductField::Description => draft.description = Some(raw.to_string()),
            ProductField::AvailableOn => draft.available_on = Some(coerce_timestamp(key, raw)?),
            ProductField::MetaTitle => draft.meta_title = Some(raw.to_string()),
            ProductField::MetaKeywords => draft.meta_keywords = Some(raw.to_string()),
            ProductField::MetaDescription => draft.meta_description = Some(raw.to_string()),
            ProductField::ShippingCategoryId => {
                draft.shipping_category_id = Some(coerce_integer(key, raw)?)
            }
            ProductField::Master(field) => field.apply(&mut draft.master, key, raw)?,
        }
        Ok(())
    }
}
