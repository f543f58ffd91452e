// ==========================================
// 商品目录导入 - 导入器 Trait
// ==========================================
// 职责: 定义商品导入管道的各接缝接口（不包含实现）
// 管道: 读取 → 解析 → 列映射 → 清洗 → 路由 → 构建 → 日志 → 清理
// ==========================================

use crate::domain::catalog::ProductDraft;
use crate::domain::import::{ImportReport, ImportSource, RowRecord};
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// ProductImporter Trait
// ==========================================
// 用途: 商品导入主接口
// 实现者: ProductImporterImpl
#[async_trait]
pub trait ProductImporter: Send + Sync {
    /// 导入一个表格数据源
    ///
    /// # 参数
    /// - source: 本地路径或 HTTP(S) 地址
    ///
    /// # 返回
    /// - Ok(ImportReport): 运行汇总（行级失败已计入，不会变成 Err）
    /// - Err: 致命错误（读取失败、存储不可用等），已写入导入日志
    async fn import_source(&self, source: &ImportSource) -> ImportResult<ImportReport>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 原始字节 → 按位置排列的单元格行
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析为行列表（保留全部行，包含表头行与空白行）
    fn parse_rows(&self, bytes: &[u8]) -> ImportResult<Vec<Vec<String>>>;
}

// ==========================================
// AssetFetcher Trait
// ==========================================
// 用途: 图片定位符 → 图片字节
// 实现者: DefaultAssetFetcher
// 约定: 永不返回 Err；获取失败以 AssetFetch 的非 Fetched 分支表达
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> AssetFetch;
}

/// 图片获取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetFetch {
    /// 获取成功
    Fetched {
        file_name: String,
        content_type: Option<String>,
        data: Vec<u8>,
    },
    /// 本地文件不存在或不可读
    Missing { path: String, reason: String },
    /// 远程返回非 2xx 状态
    HttpStatus { url: String, status: u16 },
    /// 远程连接 / 读取失败
    Transport { url: String, message: String },
}

impl AssetFetch {
    pub fn is_fetched(&self) -> bool {
        matches!(self, AssetFetch::Fetched { .. })
    }
}

// ==========================================
// ProductBuildHook Trait
// ==========================================
// 用途: 商品字段赋值完成后、校验之前的扩展点
#[async_trait]
pub trait ProductBuildHook: Send + Sync {
    async fn after_product_built(&self, draft: &mut ProductDraft, row: &RowRecord);
}

/// 默认扩展点：不做任何处理
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBuildHook;

#[async_trait]
impl ProductBuildHook for NoopBuildHook {
    async fn after_product_built(&self, _draft: &mut ProductDraft, _row: &RowRecord) {}
}
