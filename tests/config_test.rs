// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证导入配置的持久化与单项覆写
// ==========================================


use catalog_import::config::{config_keys, ConfigManager};
use catalog_import::domain::types::CellEncoding;
use catalog_import::importer::ImportError;
use catalog_import::ImportSettings;
use std::path::PathBuf;
use test_helpers::create_test_db;

#[tokio::test]
async fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[tokio::test]
async fn test_load_defaults_when_nothing_stored() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config_manager = ConfigManager::new(&db_path).unwrap();

    let settings = config_manager.load_import_settings().unwrap();
    assert_eq!(settings, ImportSettings::default());
}

#[tokio::test]
async fn test_save_and_reload_settings() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config_manager = ConfigManager::new(&db_path).unwrap();

    let settings = ImportSettings {
        create_variants: false,
        variant_comparator_field: "sku".to_string(),
        product_image_path: PathBuf::from("/srv/images"),
        log_to: None,
        cell_encoding: CellEncoding::Passthrough,
        delimiter: ';',
        ..Default::default()
    };
    config_manager.save_import_settings(&settings).unwrap();

    // 新实例读取同一数据库
    let reloaded = ConfigManager::new(&db_path)
        .unwrap()
        .load_import_settings()
        .unwrap();
    assert_eq!(reloaded, settings);
}

#[tokio::test]
async fn test_single_key_overrides() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config_manager = ConfigManager::new(&db_path).unwrap();

    config_manager
        .set_global_config_value(config_keys::DESTROY_ORIGINAL_PRODUCTS, "yes")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::ROWS_TO_SKIP, "3")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::CELL_ENCODING, "passthrough")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::COLUMN_MAPPINGS, r#"{"name": 0, "sku": 2}"#)
        .unwrap();
    // 格式错误的覆写值被忽略
    config_manager
        .set_global_config_value(config_keys::CREATE_VARIANTS, "maybe")
        .unwrap();

    let settings = config_manager.load_import_settings().unwrap();
    assert!(settings.destroy_original_products);
    assert_eq!(settings.rows_to_skip, 3);
    assert_eq!(settings.cell_encoding, CellEncoding::Passthrough);
    assert_eq!(settings.column_mappings.len(), 2);
    assert_eq!(settings.column_mappings.get("sku"), Some(&2));
    assert!(settings.create_variants);
}

#[tokio::test]
async fn test_corrupt_settings_blob_is_reported() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config_manager = ConfigManager::new(&db_path).unwrap();

    config_manager
        .set_global_config_value(config_keys::IMPORT_SETTINGS, "{not json")
        .unwrap();

    let result = config_manager.load_import_settings();
    assert!(matches!(result, Err(ImportError::ConfigReadError { .. })));
}
