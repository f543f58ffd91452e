// ==========================================
// ProductImporter 集成测试
// ==========================================
// 测试目标: 验证完整的商品导入流程（真实 SQLite 目录库）
// ==========================================


use async_trait::async_trait;
use catalog_import::domain::types::{CellEncoding, LogSeverity};
use catalog_import::domain::{ImportSource, ProductDraft, RowOutcome, RowRecord};
use catalog_import::importer::{
    DefaultAssetFetcher, ImportError, ProductBuildHook, ProductImporter, ProductImporterImpl,
};
use catalog_import::logging;
use catalog_import::repository::{CatalogRepository, CatalogRepositoryImpl};
use catalog_import::ImportSettings;
use std::sync::Arc;
use tempfile::TempDir;
use test_helpers::{
    create_test_db, create_test_repo, open_test_connection, product_taxon_names, seed_option_type,
    seed_product, seed_store, spawn_http_responder, test_settings, write_csv,
};

/// 创建测试用的 ProductImporter 实例
fn create_test_importer(
    repo: &Arc<CatalogRepositoryImpl>,
    settings: ImportSettings,
) -> ProductImporterImpl {
    ProductImporterImpl::with_defaults(repo.clone(), settings)
        .expect("Failed to create ProductImporter")
}

#[tokio::test]
async fn test_import_csv_basic() {
    // 初始化日志系统
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let csv = write_csv(
        dir.path(),
        "products.csv",
        "SKU,Name,Master Price,Cost Price,Description\n\
         W1,Blue Widget,9.99,4.5,A widget\n\
         G1,Gadget,19.00,,\n",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .expect("Import should succeed");

    assert_eq!(report.rows_seen, 2);
    assert_eq!(report.products_created, 2);
    assert_eq!(report.failed_rows, 0);
    assert_eq!(report.notice, "Product data was successfully imported.");

    let widget = repo
        .find_product_by_slug("blue-widget")
        .unwrap()
        .expect("widget should exist");
    assert_eq!(widget.name, "Blue Widget");
    assert_eq!(widget.description.as_deref(), Some("A widget"));

    // 未给 available_on → 默认前一天（已上架）
    let available_on = widget.available_on.expect("available_on defaulted");
    assert!(available_on < chrono::Utc::now());

    let master = repo
        .find_master_variant(widget.id)
        .await
        .unwrap()
        .expect("master variant");
    assert_eq!(master.sku.as_deref(), Some("W1"));
    assert_eq!(master.price, Some(9.99));
    assert_eq!(master.cost_price, Some(4.5));

    let infos = report.log_messages(LogSeverity::Info);
    assert!(infos.iter().any(|m| m.contains("Blue Widget successfully imported.")));
    assert!(infos.iter().any(|m| m.contains("products.csv began")));
    assert!(infos.iter().any(|m| m.contains("products.csv completed")));
}

#[tokio::test]
async fn test_hierarchy_links_leaf_taxons_only() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let csv = write_csv(
        dir.path(),
        "tree.csv",
        "name,master_price,sku,category\n\
         Shirt,10,S1,Clothing > Shirts & Sale > Summer\n",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    let shirt = repo.find_product_by_slug("shirt").unwrap().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    assert_eq!(product_taxon_names(&conn, shirt.id), vec!["Shirts", "Summer"]);

    // 分类树以首字母大写名创建
    let taxonomy = repo
        .find_taxonomy_by_name("category")
        .await
        .unwrap()
        .expect("taxonomy created");
    assert_eq!(taxonomy.name, "Category");

    // "Shirts" 挂在 "Clothing" 之下
    let taxons = repo.list_product_taxons(shirt.id).unwrap();
    let shirts = taxons.iter().find(|t| t.name == "Shirts").unwrap();
    let clothing_id: i64 = conn
        .query_row(
            "SELECT id FROM taxons WHERE name = 'Clothing'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(shirts.parent_id, Some(clothing_id));
}

#[tokio::test]
async fn test_invalid_row_does_not_abort_run() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let csv = write_csv(
        dir.path(),
        "mixed.csv",
        "name,master_price,sku\n\
         Alpha,5,A1\n\
         Broken,abc,B1\n\
         Gamma,7,C1\n",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .expect("Row failures must not abort the run");

    assert_eq!(report.products_created, 2);
    assert_eq!(report.failed_rows, 1);
    assert!(repo.find_product_by_slug("alpha").unwrap().is_some());
    assert!(repo.find_product_by_slug("broken").unwrap().is_none());
    assert!(repo.find_product_by_slug("gamma").unwrap().is_some());

    // 行号从 1 起（第 1 行为表头）
    let (row_number, outcome) = &report.outcomes[1];
    assert_eq!(*row_number, 3);
    assert!(matches!(outcome, RowOutcome::Failed { .. }));

    let errors = report.log_messages(LogSeverity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Broken"));
    assert!(errors[0].contains("price"));
}

#[tokio::test]
async fn test_second_row_with_same_name_becomes_variant() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let csv = write_csv(
        dir.path(),
        "variants.csv",
        "name,master_price,sku\n\
         Widget,10,W1\n\
         Widget,12,W2\n\
         Widget,,W3\n",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.products_created, 1);
    assert_eq!(report.variants_imported, 2);
    assert_eq!(repo.list_active_products().unwrap().len(), 1);

    let widget = repo.find_product_by_slug("widget").unwrap().unwrap();
    let variants = repo.list_variants(widget.id).await.unwrap();
    assert_eq!(variants.len(), 3);

    assert!(variants[0].is_master);
    assert_eq!(variants[0].sku.as_deref(), Some("W1"));
    assert_eq!(variants[1].sku.as_deref(), Some("W2"));
    assert_eq!(variants[1].price, Some(12.0));
    // 未给价格 → 沿用主变体价格
    assert_eq!(variants[2].sku.as_deref(), Some("W3"));
    assert_eq!(variants[2].price, Some(10.0));

    let infos = report.log_messages(LogSeverity::Info);
    assert!(infos
        .iter()
        .any(|m| m.contains("Variant of SKU W2 successfully imported.")));
}

#[tokio::test]
async fn test_variant_with_missing_local_image_is_saved() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let csv = write_csv(
        dir.path(),
        "images.csv",
        "name,master_price,sku,image_main\n\
         Widget,10,W1,\n\
         Widget,12,W2,missing/photo.jpg\n",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.variants_imported, 1);
    let variant_id = match &report.outcomes[1].1 {
        RowOutcome::VariantImported { variant_id, .. } => *variant_id,
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert!(repo.list_variant_images(variant_id).unwrap().is_empty());

    let warnings = report.log_messages(LogSeverity::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("photo.jpg"));
}

#[tokio::test]
async fn test_local_images_attach_to_master_in_field_order() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    std::fs::write(dir.path().join("front.jpg"), b"front-bytes").unwrap();
    std::fs::create_dir_all(dir.path().join("extra")).unwrap();
    std::fs::write(dir.path().join("extra").join("side.png"), b"side-bytes").unwrap();

    let csv = write_csv(
        dir.path(),
        "images.csv",
        "name,master_price,sku,image_2,image_main\n\
         Lamp,30,L1,extra/side.png,/front.jpg\n",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    let master_variant_id = match &report.outcomes[0].1 {
        RowOutcome::ProductCreated { product_id, .. } => repo
            .find_master_variant(*product_id)
            .await
            .unwrap()
            .unwrap()
            .id,
        other => panic!("unexpected outcome: {:?}", other),
    };

    let images = repo.list_variant_images(master_variant_id).unwrap();
    assert_eq!(images.len(), 2);
    // image_main 在 image_2 之前
    assert_eq!(images[0].file_name, "front.jpg");
    assert_eq!(images[0].position, 0);
    assert_eq!(images[0].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(images[0].data, b"front-bytes");
    assert_eq!(images[1].file_name, "side.png");
    assert_eq!(images[1].position, 1);
}

#[tokio::test]
async fn test_remote_images_success_and_http_error() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let base = spawn_http_responder(vec![("/img/a.png", "image/png", b"png-bytes".to_vec())]).await;

    let csv = write_csv(
        dir.path(),
        "remote.csv",
        &format!(
            "name,master_price,sku,image_main,image_2\n\
             Mug,8,M1,{base}/img/a.png,{base}/img/gone.png\n"
        ),
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.products_created, 1);
    let mug = repo.find_product_by_slug("mug").unwrap().unwrap();
    let master = repo.find_master_variant(mug.id).await.unwrap().unwrap();
    let images = repo.list_variant_images(master.id).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].file_name, "a.png");
    assert_eq!(images[0].content_type.as_deref(), Some("image/png"));

    let warnings = report.log_messages(LogSeverity::Warn);
    assert!(warnings.iter().any(|m| m.contains("HTTP 404")));
}

#[tokio::test]
async fn test_remote_source_url() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let body = b"name,master_price,sku\nKite,14,K1\n".to_vec();
    let base = spawn_http_responder(vec![("/feeds/products.csv", "text/csv", body)]).await;

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::parse(&format!("{}/feeds/products.csv", base)))
        .await
        .unwrap();

    assert_eq!(report.products_created, 1);
    assert!(repo.find_product_by_slug("kite").unwrap().is_some());

    // 远程源 404 → 致命错误
    let result = importer
        .import_source(&ImportSource::parse(&format!("{}/feeds/none.csv", base)))
        .await;
    assert!(matches!(result, Err(ImportError::RemoteSourceError { .. })));
}

#[tokio::test]
async fn test_snapshot_duplicate_is_logged_not_recreated() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    seed_product(&repo, "Widget", "W1", 10.0).await;

    let csv = write_csv(
        dir.path(),
        "dupes.csv",
        "name,master_price,sku\n\
         Widget,11,W9\n\
         Widget,oops,W9\n",
    );

    let settings = ImportSettings {
        create_variants: false,
        ..test_settings(dir.path())
    };
    let importer = create_test_importer(&repo, settings);
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.products_created, 0);
    assert_eq!(report.duplicates, 1);
    // 第二行校验失败，先于快照判断
    assert_eq!(report.failed_rows, 1);
    assert_eq!(repo.list_active_products().unwrap().len(), 1);

    let widget = repo.find_product_by_slug("widget").unwrap().unwrap();
    let master = repo.find_master_variant(widget.id).await.unwrap().unwrap();
    assert_eq!(master.price, Some(10.0));

    let infos = report.log_messages(LogSeverity::Info);
    assert!(infos
        .iter()
        .any(|m| m.contains("Widget is already in the system.")));
}

#[tokio::test]
async fn test_new_slug_repeated_within_run_fails_second_row() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let csv = write_csv(
        dir.path(),
        "repeat.csv",
        "name,master_price,sku\n\
         Gadget,5,G1\n\
         Gadget,6,G2\n\
         Gizmo,7,Z1\n",
    );

    let settings = ImportSettings {
        create_variants: false,
        ..test_settings(dir.path())
    };
    let importer = create_test_importer(&repo, settings);
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    // 运行中新建的 slug 不进入快照；重复创建在写库时失败，运行继续
    assert_eq!(report.products_created, 2);
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.failed_rows, 1);

    let errors = report.log_messages(LogSeverity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("gadget"));
}

#[tokio::test]
async fn test_destroy_original_products_uses_stale_snapshot() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    let x = seed_product(&repo, "X", "X1", 1.0).await;
    seed_product(&repo, "Y", "Y1", 1.0).await;

    let csv = write_csv(
        dir.path(),
        "replace.csv",
        "name,master_price,sku\n\
         X,2,X1\n\
         Z,3,Z1\n",
    );

    let settings = ImportSettings {
        create_variants: false,
        destroy_original_products: true,
        ..test_settings(dir.path())
    };
    let importer = create_test_importer(&repo, settings);
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    // X 在本次导入中出现，但属于导入前快照，同样被删除
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.products_created, 1);
    assert_eq!(report.products_destroyed, 2);

    let active: Vec<String> = repo
        .list_active_products()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(active, vec!["Z"]);

    let x = repo.find_product(x.product_id).await.unwrap().unwrap();
    assert!(x.is_deleted());
    assert!(repo.find_product_by_slug("x").unwrap().is_none());
    assert!(report
        .log_messages(LogSeverity::Info)
        .iter()
        .any(|m| m.contains("Removed 2 products")));
}

#[tokio::test]
async fn test_deleted_product_is_restored_by_variant_row() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    let x = seed_product(&repo, "Lantern", "LN1", 20.0).await;
    repo.destroy_products(&[x.product_id]).await.unwrap();

    let csv = write_csv(
        dir.path(),
        "restore.csv",
        "name,master_price,sku\n\
         Lantern,25,LN2\n",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.variants_imported, 1);
    let lantern = repo.find_product(x.product_id).await.unwrap().unwrap();
    assert!(!lantern.is_deleted());
    assert_eq!(lantern.slug, "lantern");

    let variants = repo.list_variants(x.product_id).await.unwrap();
    assert_eq!(variants.len(), 2);
    assert!(variants.iter().all(|v| v.deleted_at.is_none()));
    assert!(report
        .log_messages(LogSeverity::Info)
        .iter()
        .any(|m| m.contains("Lantern was deleted and has been restored.")));
}

#[tokio::test]
async fn test_option_values_replaced_on_reimport() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    let conn = open_test_connection(&db_path).unwrap();
    let (color_id, color_values) =
        seed_option_type(&conn, "color", "Color", &["Red", "Blue"]).unwrap();

    let csv = write_csv(
        dir.path(),
        "options.csv",
        "name,master_price,sku,Color\n\
         Shirt,10,S1,Red\n\
         Shirt,10,S2,Blue\n\
         Shirt,11,S2,Red\n",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.products_created, 1);
    assert_eq!(report.variants_imported, 2);

    let shirt = repo.find_product_by_slug("shirt").unwrap().unwrap();
    assert_eq!(
        repo.list_product_option_type_ids(shirt.id).unwrap(),
        vec![color_id]
    );

    // 第三行按 SKU 更新 S2：规格值整体替换
    let variants = repo.list_variants(shirt.id).await.unwrap();
    assert_eq!(variants.len(), 2);
    let s2 = variants
        .iter()
        .find(|v| v.sku.as_deref() == Some("S2"))
        .unwrap();
    assert_eq!(s2.price, Some(11.0));

    let values = repo.list_variant_option_values(s2.id).unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].id, color_values[0]);
}

#[tokio::test]
async fn test_destroyed_product_can_be_recreated_with_same_slug() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    let old = seed_product(&repo, "X", "X1", 1.0).await;
    repo.destroy_products(&[old.product_id]).await.unwrap();

    let csv = write_csv(
        dir.path(),
        "recreate.csv",
        "name,master_price,sku
         X,2,X1
",
    );

    let settings = ImportSettings {
        create_variants: false,
        ..test_settings(dir.path())
    };
    let importer = create_test_importer(&repo, settings);
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.products_created, 1);
    assert_eq!(report.failed_rows, 0);

    let x = repo.find_product_by_slug("x").unwrap().unwrap();
    assert_ne!(x.id, old.product_id);
    assert!(!x.is_deleted());
    assert_eq!(repo.list_active_products().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_variant_row_leaves_existing_variant_untouched() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    let conn = open_test_connection(&db_path).unwrap();
    let (_color_id, color_values) =
        seed_option_type(&conn, "color", "Color", &["Red", "Blue"]).unwrap();
    std::fs::write(dir.path().join("red.jpg"), b"red-bytes").unwrap();
    std::fs::write(dir.path().join("blue.jpg"), b"blue-bytes").unwrap();

    let csv = write_csv(
        dir.path(),
        "invalid_update.csv",
        "name,master_price,sku,Color,image_main
         Shirt,10,S1,,
         Shirt,10,S2,Red,red.jpg
         Shirt,-5,S2,Blue,blue.jpg
",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.variants_imported, 1);
    assert_eq!(report.failed_rows, 1);

    let shirt = repo.find_product_by_slug("shirt").unwrap().unwrap();
    let s2 = repo
        .list_variants(shirt.id)
        .await
        .unwrap()
        .into_iter()
        .find(|v| v.sku.as_deref() == Some("S2"))
        .unwrap();
    assert_eq!(s2.price, Some(10.0));

    // 校验失败的行不清除旧规格值与旧图片
    let values = repo.list_variant_option_values(s2.id).unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].id, color_values[0]);

    let images = repo.list_variant_images(s2.id).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].file_name, "red.jpg");
}

#[tokio::test]
async fn test_variant_images_replaced_on_reimport() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    std::fs::write(dir.path().join("old.jpg"), b"old-bytes").unwrap();
    std::fs::write(dir.path().join("new.png"), b"new-bytes").unwrap();

    let csv = write_csv(
        dir.path(),
        "image_update.csv",
        "name,master_price,sku,image_main
         Mug,5,M1,
         Mug,5,M2,old.jpg
         Mug,6,M2,new.png
",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.variants_imported, 2);

    let mug = repo.find_product_by_slug("mug").unwrap().unwrap();
    let m2 = repo
        .list_variants(mug.id)
        .await
        .unwrap()
        .into_iter()
        .find(|v| v.sku.as_deref() == Some("M2"))
        .unwrap();

    let images = repo.list_variant_images(m2.id).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].file_name, "new.png");
    assert_eq!(images[0].position, 0);
    assert_eq!(images[0].data, b"new-bytes");
}

#[tokio::test]
async fn test_variant_attribute_field_also_matches_option_type() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    let conn = open_test_connection(&db_path).unwrap();
    let (weight_id, weight_values) =
        seed_option_type(&conn, "weight", "Weight", &["1", "2.5"]).unwrap();

    let csv = write_csv(
        dir.path(),
        "weights.csv",
        "name,master_price,sku,weight
         Crate,10,C1,1
         Crate,12,C2,2.5
",
    );

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.products_created, 1);
    assert_eq!(report.variants_imported, 1);

    let crate_product = repo.find_product_by_slug("crate").unwrap().unwrap();
    let c2 = repo
        .list_variants(crate_product.id)
        .await
        .unwrap()
        .into_iter()
        .find(|v| v.sku.as_deref() == Some("C2"))
        .unwrap();

    // weight 同时写入变体属性与规格值
    assert_eq!(c2.weight, Some(2.5));
    let values = repo.list_variant_option_values(c2.id).unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].id, weight_values[1]);
    assert_eq!(
        repo.list_product_option_type_ids(crate_product.id).unwrap(),
        vec![weight_id]
    );
}

#[tokio::test]
async fn test_store_linking() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    let conn = open_test_connection(&db_path).unwrap();
    let main_id = seed_store(&conn, "main", "Main Street").unwrap();
    let outlet_id = seed_store(&conn, "outlet", "Outlet").unwrap();

    let csv = write_csv(
        dir.path(),
        "stores.csv",
        &format!(
            "name,master_price,sku,store_code\n\
             Lamp,5,L1,main\n\
             Chair,5,C1,{outlet_id}\n\
             Desk,5,D1,nowhere\n"
        ),
    );

    let settings = ImportSettings {
        multi_domain_importing: true,
        ..test_settings(dir.path())
    };
    let importer = create_test_importer(&repo, settings);
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    // 店铺关联失败不影响商品创建
    assert_eq!(report.products_created, 3);

    let lamp = repo.find_product_by_slug("lamp").unwrap().unwrap();
    assert_eq!(repo.list_product_store_ids(lamp.id).unwrap(), vec![main_id]);
    let chair = repo.find_product_by_slug("chair").unwrap().unwrap();
    assert_eq!(repo.list_product_store_ids(chair.id).unwrap(), vec![outlet_id]);
    let desk = repo.find_product_by_slug("desk").unwrap().unwrap();
    assert!(repo.list_product_store_ids(desk.id).unwrap().is_empty());

    let warnings = report.log_messages(LogSeverity::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Desk could not be associated with a store"));
}

#[tokio::test]
async fn test_missing_taxonomy_not_created_when_disabled() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    repo.create_taxonomy("Brand").await.unwrap();

    let csv = write_csv(
        dir.path(),
        "taxa.csv",
        "name,master_price,sku,category,brand\n\
         Hammer,12,H1,Tools > Hand,ACME\n",
    );

    let settings = ImportSettings {
        create_missing_taxonomies: false,
        ..test_settings(dir.path())
    };
    let importer = create_test_importer(&repo, settings);
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    assert_eq!(report.products_created, 1);
    assert!(repo.find_taxonomy_by_name("category").await.unwrap().is_none());

    // 已存在的分类树（名称忽略大小写）照常关联
    let hammer = repo.find_product_by_slug("hammer").unwrap().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    assert_eq!(product_taxon_names(&conn, hammer.id), vec!["ACME"]);

    let warnings = report.log_messages(LogSeverity::Warn);
    assert!(warnings.iter().any(|m| m.contains("Tools > Hand")));
}

#[tokio::test]
async fn test_static_mapping_and_shipping_category() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    // 默认静态映射: sku, name, master_price, cost_price, shipping_category, ...
    let csv = write_csv(
        dir.path(),
        "static.csv",
        "K1,Kettle,20,8,Heavy\n\
         ,,,,\n\
         T1,Toaster,30,,Heavy\n",
    );

    let settings = ImportSettings {
        first_row_is_headings: false,
        rows_to_skip: 0,
        ..test_settings(dir.path())
    };
    let importer = create_test_importer(&repo, settings);
    let report = importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    // 空白行计入 rows_seen，但不产生结果
    assert_eq!(report.rows_seen, 3);
    assert_eq!(report.products_created, 2);
    assert_eq!(report.outcomes.len(), 2);

    let kettle = repo.find_product_by_slug("kettle").unwrap().unwrap();
    let toaster = repo.find_product_by_slug("toaster").unwrap().unwrap();
    assert!(kettle.shipping_category_id.is_some());
    assert_eq!(kettle.shipping_category_id, toaster.shipping_category_id);

    let master = repo.find_master_variant(kettle.id).await.unwrap().unwrap();
    assert_eq!(master.sku.as_deref(), Some("K1"));
    assert_eq!(master.cost_price, Some(8.0));
}

#[tokio::test]
async fn test_cell_encoding_and_source_encoding() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    // UTF-8 源 + 兼容重编码 → 非 ASCII 字符被二次解读
    let utf8 = write_csv(dir.path(), "utf8.csv", "name,master_price\nCafé,3\n");
    let settings = ImportSettings {
        cell_encoding: CellEncoding::LegacyLatin1,
        ..test_settings(dir.path())
    };
    create_test_importer(&repo, settings)
        .import_source(&ImportSource::Path(utf8))
        .await
        .unwrap();

    // windows-1252 源 + 显式源编码 + 原样保留
    let latin = dir.path().join("latin.csv");
    std::fs::write(&latin, b"name;master_price\nCr\xE8me;4\n").unwrap();
    let settings = ImportSettings {
        source_encoding: Some("windows-1252".to_string()),
        delimiter: ';',
        ..test_settings(dir.path())
    };
    create_test_importer(&repo, settings)
        .import_source(&ImportSource::Path(latin))
        .await
        .unwrap();

    let names: Vec<String> = repo
        .list_active_products()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["CafÃ©", "Crème"]);
}

#[tokio::test]
async fn test_missing_source_is_fatal() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let importer = create_test_importer(&repo, test_settings(dir.path()));
    let result = importer
        .import_source(&ImportSource::Path(dir.path().join("nope.csv")))
        .await;
    assert!(matches!(result, Err(ImportError::FileNotFound(_))));

    let xls = write_csv(dir.path(), "legacy.xls", "not really excel");
    let result = importer.import_source(&ImportSource::Path(xls)).await;
    assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn test_log_file_written() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);
    let log_path = dir.path().join("log").join("import_products.log");

    let csv = write_csv(dir.path(), "one.csv", "name,master_price\nBroom,2\nMop,x\n");
    let settings = ImportSettings {
        log_to: Some(log_path.clone()),
        ..test_settings(dir.path())
    };
    create_test_importer(&repo, settings)
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    let content = std::fs::read_to_string(&log_path).expect("log file created");
    assert!(content.contains("[Info] Importing products for one.csv began"));
    assert!(content.contains("[Info] Broom successfully imported."));
    assert!(content.contains("[Error] A product could not be imported"));
}

#[tokio::test]
async fn test_invalid_settings_rejected_before_run() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let settings = ImportSettings {
        variant_comparator_field: "colour".to_string(),
        ..test_settings(dir.path())
    };
    let result = ProductImporterImpl::with_defaults(repo.clone(), settings);
    assert!(matches!(result, Err(ImportError::ConfigValueError { .. })));
}

/// 用 brand 字段补全 SEO 标题
struct MetaTitleHook;

#[async_trait]
impl ProductBuildHook for MetaTitleHook {
    async fn after_product_built(&self, draft: &mut ProductDraft, row: &RowRecord) {
        if let (Some(name), Some(brand)) = (draft.name.as_deref(), row.get("brand")) {
            draft.meta_title = Some(format!("{} by {}", name, brand));
        }
    }
}

#[tokio::test]
async fn test_build_hook_runs_before_validation() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let repo = create_test_repo(&db_path);

    let csv = write_csv(
        dir.path(),
        "hook.csv",
        "name,master_price,sku,brand\n\
         Teapot,18,T1,Stoneware Co\n",
    );

    let settings = test_settings(dir.path());
    let fetcher = DefaultAssetFetcher::new(dir.path(), None).unwrap();
    let importer = ProductImporterImpl::new(
        repo.clone(),
        settings,
        Arc::new(fetcher),
        Arc::new(MetaTitleHook),
    )
    .unwrap();
    importer
        .import_source(&ImportSource::Path(csv))
        .await
        .unwrap();

    let teapot = repo.find_product_by_slug("teapot").unwrap().unwrap();
    assert_eq!(teapot.meta_title.as_deref(), Some("Teapot by Stoneware Co"));
}
