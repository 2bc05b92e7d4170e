//! Table creation, removal and truncation.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{info, warn};

use gridstore_core::errors::{GridError, GridResult, StorageContext};
use gridstore_core::types::identifier::{quote, validate_table_name};
use gridstore_core::types::TableSchema;

use super::ddl::create_table_sql;
use super::validate::{check_field, check_unique, CheckedField};
use crate::{catalog, introspect};

/// Validate a full schema and return it normalized, with its checked fields.
pub fn check_schema(schema: &TableSchema) -> GridResult<(TableSchema, Vec<CheckedField>)> {
    let name = schema.name.trim();
    if name.is_empty() {
        return Err(GridError::EmptyTableName);
    }
    if schema.fields.is_empty() {
        return Err(GridError::EmptyFieldSet);
    }
    validate_table_name(name)?;
    let checked = schema
        .fields
        .iter()
        .map(check_field)
        .collect::<GridResult<Vec<_>>>()?;
    check_unique(checked.iter().map(|c| c.def.name.as_str()))?;
    let normalized = TableSchema {
        name: name.to_string(),
        display_name: schema.display_name.trim().to_string(),
        description: schema.description.clone(),
        fields: checked.iter().map(|c| c.def.clone()).collect(),
    };
    Ok((normalized, checked))
}

/// Create the physical table and its catalog entry.
///
/// A physical table left behind without a catalog entry is adopted when
/// its user columns match the requested ones; otherwise `TableExists`.
pub fn create_table(conn: &Connection, schema: &TableSchema) -> GridResult<TableSchema> {
    let (mut normalized, checked) = check_schema(schema)?;
    let table = normalized.name.clone();

    if let Some(existing) = catalog::find_table(conn, &table)? {
        return Err(GridError::TableExists { table: existing });
    }

    match introspect::physical_table(conn, &table)? {
        Some(physical) => {
            let present: HashSet<String> = introspect::logical_columns(conn, &physical)?
                .into_iter()
                .map(|c| c.name.to_ascii_lowercase())
                .collect();
            let wanted: HashSet<String> = checked
                .iter()
                .map(|c| c.def.name.to_ascii_lowercase())
                .collect();
            if present != wanted {
                return Err(GridError::TableExists { table: physical });
            }
            warn!(table = %physical, "adopting uncataloged physical table");
            normalized.name = physical;
        }
        None => {
            let columns: Vec<String> = checked.iter().map(CheckedField::ddl).collect();
            conn.execute_batch(&create_table_sql(&table, &columns))
                .ctx("create table", &table)?;
        }
    }

    catalog::upsert_schema(conn, &normalized)?;
    info!(table = %normalized.name, fields = normalized.fields.len(), "table created");
    Ok(normalized)
}

/// Drop the table and its catalog rows. Missing tables are not an error.
pub fn drop_table(conn: &Connection, table: &str) -> GridResult<bool> {
    let table = table.trim();
    validate_table_name(table)?;
    let cataloged = catalog::find_table(conn, table)?;
    let physical = introspect::physical_table(conn, table)?;
    let existed = cataloged.is_some() || physical.is_some();
    if let Some(name) = &physical {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote(name)))
            .ctx("drop table", name)?;
    }
    if let Some(name) = &cataloged {
        catalog::purge_table(conn, name)?;
    }
    Ok(existed)
}

/// Delete every row, keeping the schema.
pub fn clear_table(conn: &Connection, table: &str) -> GridResult<usize> {
    let name = catalog::find_table(conn, table)?.ok_or_else(|| GridError::UnknownTable {
        table: table.to_string(),
    })?;
    conn.execute(&format!("DELETE FROM {}", quote(&name)), [])
        .ctx("clear table", &name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridstore_core::types::ColumnDefinition;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn schema() -> TableSchema {
        TableSchema::new(
            "patients",
            vec![
                ColumnDefinition::new("name", "text").with_labels(["姓名"]),
                ColumnDefinition::new("age", "integer"),
            ],
        )
    }

    #[test]
    fn test_check_schema_order_of_errors() {
        let empty_name = TableSchema::new("  ", vec![]);
        assert!(matches!(check_schema(&empty_name), Err(GridError::EmptyTableName)));
        let no_fields = TableSchema::new("t", vec![]);
        assert!(matches!(check_schema(&no_fields), Err(GridError::EmptyFieldSet)));
        let dup = TableSchema::new(
            "t",
            vec![ColumnDefinition::new("a", "text"), ColumnDefinition::new("A", "text")],
        );
        assert!(matches!(check_schema(&dup), Err(GridError::DuplicateField { .. })));
        let bad = TableSchema::new("t; DROP", vec![ColumnDefinition::new("a", "text")]);
        assert!(matches!(check_schema(&bad), Err(GridError::InvalidIdentifier { .. })));
    }

    #[test]
    fn test_create_then_duplicate() {
        let conn = conn();
        create_table(&conn, &schema()).unwrap();
        let cols: Vec<_> = introspect::physical_columns(&conn, "patients")
            .unwrap()
            .into_iter()
            .map(|c| (c.name, c.declared_type))
            .collect();
        assert_eq!(cols[1], ("name".to_string(), "TEXT".to_string()));
        assert_eq!(cols[2], ("age".to_string(), "INTEGER".to_string()));

        let err = create_table(&conn, &schema()).unwrap_err();
        assert!(matches!(err, GridError::TableExists { .. }));
    }

    #[test]
    fn test_create_adopts_matching_orphan() {
        let conn = conn();
        conn.execute_batch(
            "CREATE TABLE patients (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, age INTEGER,
             created_at DATETIME, updated_at DATETIME);",
        )
        .unwrap();
        let stored = create_table(&conn, &schema()).unwrap();
        assert_eq!(stored.name, "patients");
        assert!(catalog::find_table(&conn, "patients").unwrap().is_some());
    }

    #[test]
    fn test_create_rejects_mismatched_orphan() {
        let conn = conn();
        conn.execute_batch("CREATE TABLE patients (id INTEGER PRIMARY KEY, other TEXT);")
            .unwrap();
        assert!(matches!(
            create_table(&conn, &schema()),
            Err(GridError::TableExists { .. })
        ));
        assert!(catalog::find_table(&conn, "patients").unwrap().is_none());
    }

    #[test]
    fn test_drop_and_clear() {
        let conn = conn();
        create_table(&conn, &schema()).unwrap();
        conn.execute("INSERT INTO patients (name) VALUES ('a'), ('b')", []).unwrap();
        assert_eq!(clear_table(&conn, "patients").unwrap(), 2);

        assert!(drop_table(&conn, "patients").unwrap());
        assert!(introspect::physical_table(&conn, "patients").unwrap().is_none());
        assert!(catalog::find_table(&conn, "patients").unwrap().is_none());
        assert!(!drop_table(&conn, "patients").unwrap());
        assert!(matches!(
            clear_table(&conn, "patients"),
            Err(GridError::UnknownTable { .. })
        ));
    }
}
