// ==========================================
// 商品目录导入 - 领域模型层
// ==========================================
// 职责: 定义目录实体、导入中间结构、通用类型
// 红线: 不含数据访问逻辑，不含导入流程逻辑
// ==========================================

pub mod catalog;
pub mod import;
pub mod types;

// 重导出核心类型
pub use catalog::{
    slugify, ImageAsset, NewImage, OptionType, OptionValue, Product, ProductDraft,
    ShippingCategory, Store, Taxon, Taxonomy, Variant, VariantAttributes, VariantDraft,
};
pub use import::{
    ColumnMapping, ImportReport, ImportSource, LogLine, RowOutcome, RowRecord, UploadRecord,
};
pub use types::{CellEncoding, ComparatorField, LogSeverity};
