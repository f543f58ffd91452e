// ==========================================
// 商品目录导入 - 导入配置
// ==========================================
// 职责: 一次导入运行所需的全部配置项（显式传入导入器，不使用进程级全局量）
// 默认值: 与历史导入脚本的初始化配置保持一致
// ==========================================

use crate::domain::types::{CellEncoding, ComparatorField};
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 默认静态列映射（无表头模式使用）
pub fn default_column_mappings() -> BTreeMap<String, usize> {
    [
        "sku",
        "name",
        "master_price",
        "cost_price",
        "shipping_category",
        "weight",
        "height",
        "width",
        "depth",
        "image_main",
        "image_2",
        "image_3",
        "image_4",
        "description",
        "category",
    ]
    .iter()
    .enumerate()
    .map(|(idx, key)| (key.to_string(), idx))
    .collect()
}

/// 默认本地图片根目录
pub fn default_image_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catalog-import")
        .join("product-images")
}

/// 默认导入日志文件
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catalog-import")
        .join("log")
        .join("import_products.log")
}

// ==========================================
// ImportSettings - 导入配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    // ===== 列映射 =====
    pub column_mappings: BTreeMap<String, usize>, // 无表头时使用的 字段 → 列号
    pub first_row_is_headings: bool,              // 首行为表头（解析表头生成映射）
    pub rows_to_skip: usize,                      // 无条件跳过的前 N 行

    // ===== 变体 / 去重 =====
    pub create_variants: bool,            // 启用 商品/变体 路由
    pub variant_comparator_field: String, // 判定已存在商品的字段（name/slug/sku）

    // ===== 全量替换 =====
    pub destroy_original_products: bool, // 导入后删除导入前已存在的全部商品

    // ===== 分类 / 图片 =====
    pub create_missing_taxonomies: bool,
    pub taxonomy_fields: Vec<String>, // 按层级串解析的字段（有序）
    pub image_fields: Vec<String>,    // 按图片地址解析的字段（有序）
    pub product_image_path: PathBuf,  // 非 URL 图片的本地根目录

    // ===== 多店铺 =====
    pub multi_domain_importing: bool,
    pub store_field: String, // 存放店铺 id 或 code 的字段

    // ===== 日志 =====
    pub log_to: Option<PathBuf>, // None = 仅内存 + tracing

    // ===== 编码 / 解析 =====
    pub cell_encoding: CellEncoding,
    pub source_encoding: Option<String>, // WHATWG 编码标签（如 windows-1252 / gbk）
    pub delimiter: char,

    // ===== 远程获取 =====
    pub remote_fetch_timeout_secs: Option<u64>, // None = 不设超时
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            column_mappings: default_column_mappings(),
            first_row_is_headings: true,
            rows_to_skip: 1,
            create_variants: true,
            variant_comparator_field: "name".to_string(),
            destroy_original_products: false,
            create_missing_taxonomies: true,
            taxonomy_fields: vec!["category".to_string(), "brand".to_string()],
            image_fields: vec![
                "image_main".to_string(),
                "image_2".to_string(),
                "image_3".to_string(),
                "image_4".to_string(),
            ],
            product_image_path: default_image_root(),
            multi_domain_importing: true,
            store_field: "store_code".to_string(),
            log_to: Some(default_log_path()),
            cell_encoding: CellEncoding::default(),
            source_encoding: None,
            delimiter: ',',
            remote_fetch_timeout_secs: None,
        }
    }
}

impl ImportSettings {
    /// 从 JSON 文件加载（缺省字段取默认值）
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let settings: ImportSettings =
            serde_json::from_str(&raw).map_err(|e| ImportError::ConfigReadError {
                key: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(settings)
    }

    /// 解析比较字段
    pub fn comparator_field(&self) -> ImportResult<ComparatorField> {
        ComparatorField::parse(&self.variant_comparator_field).ok_or_else(|| {
            ImportError::ConfigValueError {
                key: "variant_comparator_field".to_string(),
                value: self.variant_comparator_field.clone(),
                message: "仅支持 name / slug / sku".to_string(),
            }
        })
    }

    /// 分隔符字节（必须为单字节 ASCII）
    pub fn delimiter_byte(&self) -> ImportResult<u8> {
        if self.delimiter.is_ascii() && self.delimiter != '\n' && self.delimiter != '"' {
            Ok(self.delimiter as u8)
        } else {
            Err(ImportError::ConfigValueError {
                key: "delimiter".to_string(),
                value: self.delimiter.to_string(),
                message: "分隔符必须是单字节 ASCII 字符".to_string(),
            })
        }
    }

    /// 源文件编码
    pub fn source_encoding(&self) -> ImportResult<Option<&'static encoding_rs::Encoding>> {
        match self.source_encoding.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(label) => encoding_rs::Encoding::for_label(label.as_bytes())
                .map(Some)
                .ok_or_else(|| ImportError::ConfigValueError {
                    key: "source_encoding".to_string(),
                    value: label.to_string(),
                    message: "未知的字符集标签".to_string(),
                }),
        }
    }

    /// 运行前的结构性校验
    pub fn validate(&self) -> ImportResult<()> {
        if self.create_variants {
            self.comparator_field()?;
        }
        self.delimiter_byte()?;
        self.source_encoding()?;

        if self.multi_domain_importing && self.store_field.trim().is_empty() {
            return Err(ImportError::ConfigValueError {
                key: "store_field".to_string(),
                value: self.store_field.clone(),
                message: "启用多店铺导入时必须指定店铺字段".to_string(),
            });
        }
        if !self.first_row_is_headings && self.column_mappings.is_empty() {
            tracing::warn!("未使用表头且静态列映射为空，所有行都将因缺少字段而失败");
        }

        Ok(())
    }
}
