// ==========================================
// 商品目录导入 - 导入层
// ==========================================
// 职责: 表格数据源 → 商品 / 变体 / 分类 / 图片
// 支持: CSV（可配分隔符与源编码）, XLSX, 本地路径, HTTP(S) 地址
// ==========================================

// 模块声明
pub mod asset_fetcher;
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod field_schema;
pub mod file_parser;
pub mod product_importer_impl;
pub mod product_importer_trait;
pub mod record_builder;
pub mod taxonomy_resolver;

// 重导出核心类型
pub use asset_fetcher::DefaultAssetFetcher;
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{read_source, CsvParser, ExcelParser, UniversalFileParser};
pub use product_importer_impl::ProductImporterImpl;
pub use record_builder::{BuildOutcome, RecordBuilder, StoreLink};
pub use taxonomy_resolver::TaxonomyResolver;

// 重导出 Trait 接口
pub use product_importer_trait::{
    AssetFetch, AssetFetcher, FileParser, NoopBuildHook, ProductBuildHook, ProductImporter,
};
