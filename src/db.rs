// ==========================================
// 商品目录导入 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 + busy_timeout）
// - 提供目录表结构的幂等建表
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化目录 schema（幂等）
///
/// 说明：
/// - products.slug 唯一；软删除的商品仍占用 slug
/// - 图片以 BLOB 存储，挂在变体上（商品图片挂主变体）
pub fn init_catalog_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS shipping_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT,
            available_on TEXT,
            meta_title TEXT,
            meta_keywords TEXT,
            meta_description TEXT,
            shipping_category_id INTEGER REFERENCES shipping_categories(id),
            deleted_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS variants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            sku TEXT,
            is_master INTEGER NOT NULL DEFAULT 0,
            price REAL,
            cost_price REAL,
            weight REAL,
            height REAL,
            width REAL,
            depth REAL,
            deleted_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_variants_product ON variants(product_id);
        CREATE INDEX IF NOT EXISTS idx_variants_sku ON variants(sku);

        CREATE TABLE IF NOT EXISTS taxonomies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS taxons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            taxonomy_id INTEGER NOT NULL REFERENCES taxonomies(id) ON DELETE CASCADE,
            parent_id INTEGER REFERENCES taxons(id) ON DELETE CASCADE,
            name TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_taxons_parent ON taxons(parent_id);

        CREATE TABLE IF NOT EXISTS products_taxons (
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            taxon_id INTEGER NOT NULL REFERENCES taxons(id) ON DELETE CASCADE,
            PRIMARY KEY (product_id, taxon_id)
        );

        CREATE TABLE IF NOT EXISTS option_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            presentation TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS option_values (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            option_type_id INTEGER NOT NULL REFERENCES option_types(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            presentation TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_option_types (
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            option_type_id INTEGER NOT NULL REFERENCES option_types(id) ON DELETE CASCADE,
            PRIMARY KEY (product_id, option_type_id)
        );

        CREATE TABLE IF NOT EXISTS option_values_variants (
            variant_id INTEGER NOT NULL REFERENCES variants(id) ON DELETE CASCADE,
            option_value_id INTEGER NOT NULL REFERENCES option_values(id) ON DELETE CASCADE,
            PRIMARY KEY (variant_id, option_value_id)
        );

        CREATE TABLE IF NOT EXISTS images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            variant_id INTEGER NOT NULL REFERENCES variants(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            file_name TEXT NOT NULL,
            content_type TEXT,
            data BLOB NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS stores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS products_stores (
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            store_id INTEGER NOT NULL REFERENCES stores(id) ON DELETE CASCADE,
            PRIMARY KEY (product_id, store_id)
        );

        CREATE TABLE IF NOT EXISTS product_imports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            data_file_file_name TEXT NOT NULL,
            data_file_content_type TEXT,
            data_file_file_size INTEGER,
            data_file_updated_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
