//! Physical schema introspection and catalog cross-checks.

use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

use gridstore_core::constants::is_housekeeping;
use gridstore_core::errors::{GridError, GridResult, StorageContext};
use gridstore_core::traits::CatalogDrift;
use gridstore_core::types::identifier::quote;
use gridstore_core::types::ColumnDefinition;

use crate::catalog;

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalColumn {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    /// Default as SQL text, e.g. `'abc'` or `CURRENT_TIMESTAMP`.
    pub default_sql: Option<String>,
}

/// Physical table name matched case-insensitively.
pub fn physical_table(conn: &Connection, table: &str) -> GridResult<Option<String>> {
    conn.query_row(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        [table],
        |row| row.get(0),
    )
    .optional()
    .ctx("inspect sqlite_master", table)
}

/// All physical columns including housekeeping ones. Empty for a missing table.
pub fn physical_columns(conn: &Connection, table: &str) -> GridResult<Vec<PhysicalColumn>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote(table)))
        .ctx("table_info", table)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PhysicalColumn {
                name: row.get(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                not_null: row.get::<_, i64>(3)? != 0,
                default_sql: row.get(4)?,
            })
        })
        .ctx("table_info", table)?;
    rows.collect::<Result<Vec<_>, _>>().ctx("table_info", table)
}

/// Physical columns minus `id`, `created_at`, `updated_at`.
pub fn logical_columns(conn: &Connection, table: &str) -> GridResult<Vec<PhysicalColumn>> {
    Ok(physical_columns(conn, table)?
        .into_iter()
        .filter(|c| !is_housekeeping(&c.name))
        .collect())
}

/// Catalog columns that are physically present, in display order.
///
/// Fails with `UnknownTable` when `table` is not cataloged. Returns the
/// canonical table name alongside.
pub fn known_columns(
    conn: &Connection,
    table: &str,
) -> GridResult<(String, Vec<ColumnDefinition>)> {
    let name = catalog::find_table(conn, table)?.ok_or_else(|| GridError::UnknownTable {
        table: table.to_string(),
    })?;
    let physical = physical_columns(conn, &name)?;
    let (present, stale): (Vec<_>, Vec<_>) = catalog::load_columns(conn, &name)?
        .into_iter()
        .partition(|c| physical.iter().any(|p| p.name.eq_ignore_ascii_case(&c.name)));
    if !stale.is_empty() {
        let names: Vec<&str> = stale.iter().map(|c| c.name.as_str()).collect();
        warn!(table = %name, columns = ?names, "catalog columns missing from physical table");
    }
    Ok((name, present))
}

/// Every disagreement between the catalog and the physical store.
pub fn detect_drift(conn: &Connection) -> GridResult<Vec<CatalogDrift>> {
    let mut drift = Vec::new();
    for table in catalog::table_names(conn)? {
        if physical_table(conn, &table)?.is_none() {
            drift.push(CatalogDrift::MissingTable { table });
            continue;
        }
        let physical = logical_columns(conn, &table)?;
        let cataloged = catalog::load_columns(conn, &table)?;
        for column in &cataloged {
            if !physical.iter().any(|p| p.name.eq_ignore_ascii_case(&column.name)) {
                drift.push(CatalogDrift::MissingColumn {
                    table: table.clone(),
                    column: column.name.clone(),
                });
            }
        }
        for column in &physical {
            if !cataloged.iter().any(|c| c.name.eq_ignore_ascii_case(&column.name)) {
                drift.push(CatalogDrift::UncatalogedColumn {
                    table: table.clone(),
                    column: column.name.clone(),
                });
            }
        }
    }
    Ok(drift)
}
