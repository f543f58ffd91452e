// ==========================================
// 商品目录导入 - 命令行入口
// ==========================================
// 用法: catalog-import <数据源路径或URL> [数据库路径] [配置JSON]
// 配置: 未给出 JSON 时从数据库 config_kv 加载（缺省取默认值）
// ==========================================

use anyhow::{Context, Result};
use catalog_import::app::{get_default_db_path, AppState};
use catalog_import::{ImportSettings, ImportSource, ProductImporter, ProductImporterImpl};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统
    catalog_import::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let Some(locator) = args.get(1) else {
        eprintln!("用法: {} <source> [db_path] [settings.json]", catalog_import::APP_NAME);
        std::process::exit(2);
    };

    tracing::info!("==================================================");
    tracing::info!("商品目录导入 - 版本: {}", catalog_import::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = args.get(2).cloned().unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    let settings = match args.get(3) {
        Some(path) => ImportSettings::from_json_file(path)
            .with_context(|| format!("无法加载导入配置: {}", path))?,
        None => state.config_manager.load_import_settings()?,
    };

    let importer = ProductImporterImpl::with_defaults(state.catalog_repo.clone(), settings)?;
    let source = ImportSource::parse(locator);
    let report = importer
        .import_source(&source)
        .await
        .with_context(|| format!("导入失败: {}", source))?;

    println!("{}", report.notice);
    println!(
        "rows={} created={} variants={} duplicates={} failed={} destroyed={}",
        report.rows_seen,
        report.products_created,
        report.variants_imported,
        report.duplicates,
        report.failed_rows,
        report.products_destroyed
    );

    Ok(())
}
