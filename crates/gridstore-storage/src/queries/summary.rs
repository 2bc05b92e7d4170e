//! Descriptive statistics over one numeric column.

use rusqlite::types::ValueRef;
use rusqlite::Connection;

use gridstore_core::errors::{GridError, GridResult, StorageContext};
use gridstore_core::types::identifier::quote;
use gridstore_core::types::ColumnSummary;

use crate::introspect::known_columns;

fn numeric(cell: ValueRef<'_>) -> Option<f64> {
    match cell {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

pub fn summarize_column(conn: &Connection, table: &str, column: &str) -> GridResult<ColumnSummary> {
    let (table, columns) = known_columns(conn, table)?;
    let def = columns
        .iter()
        .find(|c| c.name == column)
        .ok_or_else(|| GridError::UnknownColumn {
            table: table.clone(),
            column: column.to_string(),
        })?;
    if !def.hint().is_some_and(|h| h.is_numeric()) {
        return Err(GridError::UnsupportedColumnType {
            column: def.name.clone(),
            type_hint: def.type_hint.clone(),
        });
    }

    let name = quote(&def.name);
    let sql = format!("SELECT {name} FROM {} WHERE {name} IS NOT NULL", quote(&table));
    let mut stmt = conn.prepare(&sql).ctx("summary", &table)?;
    let mut rows = stmt.query([]).ctx("summary", &table)?;
    let mut values = Vec::new();
    while let Some(row) = rows.next().ctx("summary", &table)? {
        if let Some(v) = numeric(row.get_ref(0).ctx("summary", &table)?) {
            values.push(v);
        }
    }
    Ok(ColumnSummary::from_values(&values))
}
