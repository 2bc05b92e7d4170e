//! Column add/drop/rename and table rename.
//!
//! Drops rebuild the table, since SQLite's own DROP COLUMN refuses columns
//! with constraints and older engines lack it entirely.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use gridstore_core::constants::{CREATED_AT_COLUMN, UPDATED_AT_COLUMN};
use gridstore_core::errors::{GridError, GridResult, StorageContext};
use gridstore_core::types::identifier::{quote, validate_column_name, validate_table_name};
use gridstore_core::types::{ColumnDefinition, StorageType};

use super::ddl::{column_ddl, create_table_sql};
use super::validate::{check_added_field, check_unique, CheckedField};
use crate::introspect::{self, PhysicalColumn};
use crate::catalog;

fn require_table(conn: &Connection, table: &str) -> GridResult<String> {
    catalog::find_table(conn, table)?.ok_or_else(|| GridError::UnknownTable {
        table: table.to_string(),
    })
}

fn contains_ignore_case<'a>(mut names: impl Iterator<Item = &'a str>, name: &str) -> bool {
    names.any(|n| n.eq_ignore_ascii_case(name))
}

/// Validate new columns against the table's current columns.
pub fn check_additions(
    conn: &Connection,
    table: &str,
    fields: &[ColumnDefinition],
) -> GridResult<Vec<CheckedField>> {
    let checked = fields
        .iter()
        .map(check_added_field)
        .collect::<GridResult<Vec<_>>>()?;
    check_unique(checked.iter().map(|c| c.def.name.as_str()))?;
    let physical = introspect::logical_columns(conn, table)?;
    let cataloged = catalog::load_columns(conn, table)?;
    for field in &checked {
        let name = field.def.name.as_str();
        if contains_ignore_case(physical.iter().map(|p| p.name.as_str()), name)
            || contains_ignore_case(cataloged.iter().map(|c| c.name.as_str()), name)
        {
            return Err(GridError::DuplicateField {
                name: name.to_string(),
            });
        }
    }
    Ok(checked)
}

/// One ALTER per field; the catalog is appended for every ALTER that ran,
/// even if a later one fails.
pub(super) fn add_checked(conn: &Connection, table: &str, checked: &[CheckedField]) -> GridResult<()> {
    let mut added: Vec<ColumnDefinition> = Vec::with_capacity(checked.len());
    let mut failure = None;
    for field in checked {
        let sql = format!("ALTER TABLE {} ADD COLUMN {}", quote(table), field.ddl());
        match conn.execute_batch(&sql).ctx("add column", table) {
            Ok(()) => added.push(field.def.clone()),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    catalog::append_columns(conn, table, &added)?;
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

pub fn add_columns(
    conn: &Connection,
    table: &str,
    fields: &[ColumnDefinition],
) -> GridResult<Vec<ColumnDefinition>> {
    let table = require_table(conn, table)?;
    if fields.is_empty() {
        return Ok(Vec::new());
    }
    let checked = check_additions(conn, &table, fields)?;
    add_checked(conn, &table, &checked)?;
    info!(table = %table, count = checked.len(), "columns added");
    Ok(checked.into_iter().map(|c| c.def).collect())
}

fn surviving_ddl(column: &PhysicalColumn) -> String {
    column_ddl(
        &column.name,
        StorageType::from_declared(&column.declared_type),
        column.not_null,
        column.default_sql.as_deref(),
    )
}

/// Recreate `table` with `survivors` plus `extra` column DDL, copying rows.
///
/// Runs in one transaction: create temp → copy → drop → rename. The
/// AUTOINCREMENT high-water mark carries over, so ids freed by deletes
/// are never handed out again.
pub fn rebuild_table(
    conn: &Connection,
    table: &str,
    survivors: &[PhysicalColumn],
    extra: &[String],
) -> GridResult<()> {
    if survivors.is_empty() && extra.is_empty() {
        return Err(GridError::EmptyFieldSet);
    }
    let physical = introspect::physical_columns(conn, table)?;
    let has = |name: &str| physical.iter().any(|p| p.name.eq_ignore_ascii_case(name));

    let temp = format!("{table}__rebuild");
    let mut columns: Vec<String> = survivors.iter().map(surviving_ddl).collect();
    columns.extend(extra.iter().cloned());

    let mut copied = vec![quote("id")];
    copied.extend(survivors.iter().map(|c| quote(&c.name)));
    for housekeeping in [CREATED_AT_COLUMN, UPDATED_AT_COLUMN] {
        if has(housekeeping) {
            copied.push(quote(housekeeping));
        }
    }
    let copied = copied.join(", ");

    let tx = conn.unchecked_transaction().ctx("begin rebuild", table)?;
    let high_water = id_sequence(&tx, table)?;
    tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote(&temp)))
        .ctx("rebuild", table)?;
    tx.execute_batch(&create_table_sql(&temp, &columns))
        .ctx("rebuild", table)?;
    tx.execute_batch(&format!(
        "INSERT INTO {} ({copied}) SELECT {copied} FROM {}",
        quote(&temp),
        quote(table)
    ))
    .ctx("rebuild copy", table)?;
    tx.execute_batch(&format!("DROP TABLE {}", quote(table)))
        .ctx("rebuild", table)?;
    tx.execute_batch(&format!(
        "ALTER TABLE {} RENAME TO {}",
        quote(&temp),
        quote(table)
    ))
    .ctx("rebuild", table)?;
    if let Some(seq) = high_water {
        restore_id_sequence(&tx, table, seq)?;
    }
    tx.commit().ctx("commit rebuild", table)?;
    debug!(table, kept = survivors.len(), added = extra.len(), "table rebuilt");
    Ok(())
}

fn id_sequence(conn: &Connection, table: &str) -> GridResult<Option<i64>> {
    conn.query_row(
        "SELECT seq FROM sqlite_sequence WHERE name = ?1 COLLATE NOCASE",
        [table],
        |row| row.get(0),
    )
    .optional()
    .ctx("read id sequence", table)
}

fn restore_id_sequence(conn: &Connection, table: &str, seq: i64) -> GridResult<()> {
    let updated = conn
        .execute(
            "UPDATE sqlite_sequence SET seq = MAX(seq, ?2) WHERE name = ?1 COLLATE NOCASE",
            params![table, seq],
        )
        .ctx("restore id sequence", table)?;
    if updated == 0 {
        conn.execute(
            "INSERT INTO sqlite_sequence (name, seq) VALUES (?1, ?2)",
            params![table, seq],
        )
        .ctx("restore id sequence", table)?;
    }
    Ok(())
}

/// Drop `columns` physically (one rebuild) and from the catalog.
///
/// Names present only in the catalog are removed from the catalog.
pub fn drop_columns(conn: &Connection, table: &str, columns: &[String]) -> GridResult<Vec<String>> {
    let table = require_table(conn, table)?;
    let requested: Vec<&str> = columns.iter().map(|c| c.trim()).collect();
    for name in &requested {
        validate_column_name(name)?;
    }
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let physical = introspect::logical_columns(conn, &table)?;
    let cataloged = catalog::load_columns(conn, &table)?;
    for name in &requested {
        let known = contains_ignore_case(physical.iter().map(|p| p.name.as_str()), name)
            || contains_ignore_case(cataloged.iter().map(|c| c.name.as_str()), name);
        if !known {
            return Err(GridError::UnknownColumn {
                table: table.clone(),
                column: name.to_string(),
            });
        }
    }

    let drop_set: HashSet<String> = requested.iter().map(|n| n.to_ascii_lowercase()).collect();
    let survivors: Vec<PhysicalColumn> = physical
        .iter()
        .filter(|p| !drop_set.contains(&p.name.to_ascii_lowercase()))
        .cloned()
        .collect();
    if survivors.is_empty() {
        return Err(GridError::EmptyFieldSet);
    }
    if survivors.len() != physical.len() {
        rebuild_table(conn, &table, &survivors, &[])?;
    }

    let dropped: Vec<String> = requested.iter().map(|n| n.to_string()).collect();
    catalog::delete_columns(conn, &table, &dropped)?;
    info!(table = %table, count = dropped.len(), "columns dropped");
    Ok(dropped)
}

/// Rename the physical table and repoint the catalog.
pub fn rename_table(conn: &Connection, table: &str, new_name: &str) -> GridResult<String> {
    let table = require_table(conn, table)?;
    let new_name = new_name.trim();
    validate_table_name(new_name)?;
    if table == new_name {
        return Ok(table);
    }
    if !table.eq_ignore_ascii_case(new_name)
        && (catalog::find_table(conn, new_name)?.is_some()
            || introspect::physical_table(conn, new_name)?.is_some())
    {
        return Err(GridError::TableExists {
            table: new_name.to_string(),
        });
    }

    let rename = |from: &str, to: &str| {
        conn.execute_batch(&format!(
            "ALTER TABLE {} RENAME TO {}",
            quote(from),
            quote(to)
        ))
        .ctx("rename table", from)
    };
    if table.eq_ignore_ascii_case(new_name) {
        // Case-only renames collide with themselves; go through a temp name.
        let temp = format!("{new_name}__rename");
        rename(&table, &temp)?;
        rename(&temp, new_name)?;
    } else {
        rename(&table, new_name)?;
    }
    catalog::rename_table(conn, &table, new_name)?;
    info!(from = %table, to = new_name, "table renamed");
    Ok(new_name.to_string())
}

fn rename_column_once(conn: &Connection, table: &str, from: &str, to: &str) -> GridResult<()> {
    conn.execute_batch(&format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        quote(table),
        quote(from),
        quote(to)
    ))
    .ctx("rename column", table)?;
    catalog::rename_column(conn, table, from, to)
}

/// Apply `(from, to)` column renames.
///
/// Swaps, chains and case-only renames collide with a column that is still
/// present, so those go through temporary names in two phases.
pub fn rename_columns(conn: &Connection, table: &str, renames: &[(String, String)]) -> GridResult<()> {
    if renames.is_empty() {
        return Ok(());
    }
    let physical = introspect::logical_columns(conn, table)?;
    for (from, to) in renames {
        validate_column_name(to)?;
        if !contains_ignore_case(physical.iter().map(|p| p.name.as_str()), from) {
            return Err(GridError::UnknownColumn {
                table: table.to_string(),
                column: from.clone(),
            });
        }
        let is_source = contains_ignore_case(renames.iter().map(|(f, _)| f.as_str()), to);
        if !is_source && contains_ignore_case(physical.iter().map(|p| p.name.as_str()), to) {
            return Err(GridError::DuplicateField { name: to.clone() });
        }
    }
    check_unique(renames.iter().map(|(_, to)| to.as_str()))?;

    let collides = renames
        .iter()
        .any(|(_, to)| contains_ignore_case(renames.iter().map(|(f, _)| f.as_str()), to));
    if collides {
        let temps: Vec<String> = (0..renames.len()).map(|i| format!("_gs_rename_{i}")).collect();
        for ((from, _), temp) in renames.iter().zip(&temps) {
            rename_column_once(conn, table, from, temp)?;
        }
        for ((_, to), temp) in renames.iter().zip(&temps) {
            rename_column_once(conn, table, temp, to)?;
        }
    } else {
        for (from, to) in renames {
            rename_column_once(conn, table, from, to)?;
        }
    }
    debug!(table, count = renames.len(), "columns renamed");
    Ok(())
}
