//! Catalog versioning using PRAGMA user_version.
//!
//! - Each version bump is a const SQL string in `schema.rs`
//! - Each step runs in its own transaction together with its version bump
//! - Catalogs written before versioning existed (user_version 0 but
//!   `table_meta` present) are adopted as v1 after patching missing columns

mod schema;

use rusqlite::Connection;
use tracing::info;

use gridstore_core::errors::{GridResult, StorageContext};

pub use schema::{CATALOG_V1, CATALOG_V2};

/// Current catalog version. Bump this when adding new migrations.
pub const CURRENT_VERSION: u32 = 2;

pub fn current_version(conn: &Connection) -> GridResult<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .ctx("read user_version", "catalog")
}

fn set_version(conn: &Connection, version: u32) -> GridResult<()> {
    conn.pragma_update(None, "user_version", version)
        .ctx("set user_version", "catalog")
}

fn table_exists(conn: &Connection, name: &str) -> GridResult<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )
    .ctx("inspect sqlite_master", name)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> GridResult<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .ctx("inspect columns", table)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .ctx("inspect columns", table)?
        .collect::<Result<Vec<_>, _>>()
        .ctx("inspect columns", table)?;
    Ok(names.iter().any(|n| n.eq_ignore_ascii_case(column)))
}

/// Bring an unversioned catalog up to the v1 layout.
fn adopt_legacy_catalog(conn: &Connection) -> GridResult<()> {
    if !column_exists(conn, "column_meta", "allow_null")? {
        info!("Backfilling column_meta.allow_null on legacy catalog");
        conn.execute_batch(
            "ALTER TABLE column_meta ADD COLUMN allow_null INTEGER NOT NULL DEFAULT 1;",
        )
        .ctx("backfill allow_null", "column_meta")?;
    }
    Ok(())
}

fn step(conn: &Connection, to: u32, sql: &str) -> GridResult<()> {
    let tx = conn
        .unchecked_transaction()
        .ctx("begin migration", "catalog")?;
    tx.execute_batch(sql).ctx("migrate catalog", "catalog")?;
    set_version(&tx, to)?;
    tx.commit().ctx("commit migration", "catalog")
}

/// Run all pending migrations. Returns the version the catalog ends at.
pub fn run_migrations(conn: &Connection) -> GridResult<u32> {
    let mut current = current_version(conn)?;

    if current >= CURRENT_VERSION {
        return Ok(current);
    }
    let from = current;

    if current == 0 && table_exists(conn, "column_meta")? {
        adopt_legacy_catalog(conn)?;
    }

    if current < 1 {
        info!("Migrating catalog: 0 → 1 (table_meta, column_meta)");
        step(conn, 1, CATALOG_V1)?;
        current = 1;
    }

    if current < 2 {
        info!("Migrating catalog: 1 → 2 (default_value, unique column key)");
        step(conn, 2, CATALOG_V2)?;
        current = 2;
    }

    info!(from, to = current, "Catalog migration complete");
    Ok(current)
}
