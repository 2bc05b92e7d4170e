//! Schema metadata store: `table_meta` and `column_meta`.
//!
//! The catalog is the source of truth for labels, type hints, nullability
//! and display order. All functions take a borrowed connection; callers
//! pick the writer or a reader.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use gridstore_core::errors::{GridResult, StorageContext};
use gridstore_core::types::{ColumnDefinition, TableSchema};

fn encode_labels(labels: &[String]) -> String {
    serde_json::to_string(labels).unwrap_or_else(|_| "[]".to_string())
}

/// Labels that fail to parse are treated as empty.
fn decode_labels(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Catalog name for `table`, matched case-insensitively.
pub fn find_table(conn: &Connection, table: &str) -> GridResult<Option<String>> {
    conn.query_row(
        "SELECT table_name FROM table_meta WHERE table_name = ?1 COLLATE NOCASE",
        [table],
        |row| row.get(0),
    )
    .optional()
    .ctx("find table", table)
}

pub fn table_names(conn: &Connection) -> GridResult<Vec<String>> {
    let mut stmt = conn
        .prepare_cached("SELECT table_name FROM table_meta ORDER BY table_name")
        .ctx("list tables", "table_meta")?;
    let rows = stmt
        .query_map([], |row| row.get(0))
        .ctx("list tables", "table_meta")?;
    rows.collect::<Result<Vec<String>, _>>()
        .ctx("list tables", "table_meta")
}

/// Replace the catalog entry for `schema.name` in one transaction.
///
/// Field display order is the position in `schema.fields`.
pub fn upsert_schema(conn: &Connection, schema: &TableSchema) -> GridResult<()> {
    let table = schema.name.as_str();
    let tx = conn.unchecked_transaction().ctx("begin upsert", table)?;
    tx.execute(
        "INSERT INTO table_meta (table_name, display_name, description)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(table_name) DO UPDATE SET
             display_name = excluded.display_name,
             description = excluded.description",
        params![table, schema.display_name, schema.description],
    )
    .ctx("upsert table_meta", table)?;
    tx.execute("DELETE FROM column_meta WHERE table_name = ?1", [table])
        .ctx("reset column_meta", table)?;
    insert_columns(&tx, table, &schema.fields, 0)?;
    tx.commit().ctx("commit upsert", table)?;
    debug!(table, fields = schema.fields.len(), "catalog upserted");
    Ok(())
}

fn insert_columns(
    conn: &Connection,
    table: &str,
    columns: &[ColumnDefinition],
    first_order: i64,
) -> GridResult<()> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO column_meta
                 (table_name, column_name, labels, type_hint, allow_null, default_value, display_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .ctx("insert column_meta", table)?;
    for (offset, column) in columns.iter().enumerate() {
        stmt.execute(params![
            table,
            column.name,
            encode_labels(&column.labels),
            column.type_hint,
            column.allow_null,
            column.default,
            first_order + offset as i64,
        ])
        .ctx("insert column_meta", table)?;
    }
    Ok(())
}

/// Columns of `table` in display order. Empty when the table is unknown.
pub fn load_columns(conn: &Connection, table: &str) -> GridResult<Vec<ColumnDefinition>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT column_name, labels, type_hint, allow_null, default_value
             FROM column_meta
             WHERE table_name = ?1
             ORDER BY display_order, id",
        )
        .ctx("load columns", table)?;
    let rows = stmt
        .query_map([table], |row| {
            Ok(ColumnDefinition {
                name: row.get(0)?,
                old_name: None,
                labels: decode_labels(row.get(1)?),
                type_hint: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                allow_null: row.get::<_, Option<bool>>(3)?.unwrap_or(true),
                default: row.get(4)?,
            })
        })
        .ctx("load columns", table)?;
    rows.collect::<Result<Vec<_>, _>>().ctx("load columns", table)
}

pub fn load_schema(conn: &Connection, table: &str) -> GridResult<Option<TableSchema>> {
    let head = conn
        .query_row(
            "SELECT table_name, display_name, description FROM table_meta WHERE table_name = ?1",
            [table],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()
        .ctx("load schema", table)?;
    let Some((name, display_name, description)) = head else {
        return Ok(None);
    };
    let fields = load_columns(conn, &name)?;
    Ok(Some(TableSchema {
        name,
        display_name: display_name.unwrap_or_default(),
        description: description.unwrap_or_default(),
        fields,
    }))
}

/// Every cataloged schema, ordered by table name.
pub fn list_schemas(conn: &Connection) -> GridResult<Vec<TableSchema>> {
    let mut schemas = Vec::new();
    for table in table_names(conn)? {
        if let Some(schema) = load_schema(conn, &table)? {
            schemas.push(schema);
        }
    }
    Ok(schemas)
}

pub fn display_name(conn: &Connection, table: &str) -> GridResult<Option<String>> {
    let name: Option<Option<String>> = conn
        .query_row(
            "SELECT display_name FROM table_meta WHERE table_name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()
        .ctx("load display name", table)?;
    Ok(name.flatten().filter(|n| !n.trim().is_empty()))
}

pub fn next_display_order(conn: &Connection, table: &str) -> GridResult<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(display_order) + 1, 0) FROM column_meta WHERE table_name = ?1",
        [table],
        |row| row.get(0),
    )
    .ctx("next display order", table)
}

/// Append catalog rows after the current last display position.
pub fn append_columns(
    conn: &Connection,
    table: &str,
    columns: &[ColumnDefinition],
) -> GridResult<()> {
    if columns.is_empty() {
        return Ok(());
    }
    let tx = conn.unchecked_transaction().ctx("begin append", table)?;
    let first = next_display_order(&tx, table)?;
    insert_columns(&tx, table, columns, first)?;
    tx.commit().ctx("commit append", table)
}

pub fn delete_columns(conn: &Connection, table: &str, columns: &[String]) -> GridResult<()> {
    let tx = conn.unchecked_transaction().ctx("begin delete", table)?;
    {
        let mut stmt = tx
            .prepare_cached(
                "DELETE FROM column_meta WHERE table_name = ?1 AND column_name = ?2 COLLATE NOCASE",
            )
            .ctx("delete column_meta", table)?;
        for column in columns {
            stmt.execute(params![table, column])
                .ctx("delete column_meta", table)?;
        }
    }
    tx.commit().ctx("commit delete", table)
}

/// Repoint both catalog relations from `old` to `new`.
pub fn rename_table(conn: &Connection, old: &str, new: &str) -> GridResult<()> {
    let tx = conn.unchecked_transaction().ctx("begin rename", old)?;
    tx.execute(
        "UPDATE table_meta SET table_name = ?2 WHERE table_name = ?1",
        params![old, new],
    )
    .ctx("rename table_meta", old)?;
    tx.execute(
        "UPDATE column_meta SET table_name = ?2 WHERE table_name = ?1",
        params![old, new],
    )
    .ctx("rename column_meta", old)?;
    tx.commit().ctx("commit rename", old)
}

pub fn rename_column(conn: &Connection, table: &str, old: &str, new: &str) -> GridResult<()> {
    conn.execute(
        "UPDATE column_meta SET column_name = ?3
         WHERE table_name = ?1 AND column_name = ?2 COLLATE NOCASE",
        params![table, old, new],
    )
    .ctx("rename column_meta", table)?;
    Ok(())
}

/// Remove every catalog row for `table`.
pub fn purge_table(conn: &Connection, table: &str) -> GridResult<()> {
    let tx = conn.unchecked_transaction().ctx("begin purge", table)?;
    tx.execute("DELETE FROM column_meta WHERE table_name = ?1", [table])
        .ctx("purge column_meta", table)?;
    tx.execute("DELETE FROM table_meta WHERE table_name = ?1", [table])
        .ctx("purge table_meta", table)?;
    tx.commit().ctx("commit purge", table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn patients() -> TableSchema {
        TableSchema {
            name: "patients".into(),
            display_name: "患者".into(),
            description: "ward A".into(),
            fields: vec![
                ColumnDefinition::new("name", "text").with_labels(["姓名", "Name"]),
                ColumnDefinition::new("age", "integer").required().with_default("0"),
            ],
        }
    }

    #[test]
    fn test_upsert_then_load_round_trips() {
        let conn = catalog();
        upsert_schema(&conn, &patients()).unwrap();
        assert_eq!(load_schema(&conn, "patients").unwrap(), Some(patients()));
        assert_eq!(list_schemas(&conn).unwrap(), vec![patients()]);
    }

    #[test]
    fn test_upsert_replaces_fields_and_order() {
        let conn = catalog();
        upsert_schema(&conn, &patients()).unwrap();

        let mut reordered = patients();
        reordered.fields.reverse();
        reordered.display_name = "Patients".into();
        upsert_schema(&conn, &reordered).unwrap();

        let loaded = load_schema(&conn, "patients").unwrap().unwrap();
        assert_eq!(loaded.field_names(), vec!["age", "name"]);
        assert_eq!(loaded.display_name, "Patients");
    }

    #[test]
    fn test_find_table_is_case_insensitive() {
        let conn = catalog();
        upsert_schema(&conn, &patients()).unwrap();
        assert_eq!(find_table(&conn, "PATIENTS").unwrap().as_deref(), Some("patients"));
        assert_eq!(find_table(&conn, "nope").unwrap(), None);
    }

    #[test]
    fn test_append_continues_display_order() {
        let conn = catalog();
        upsert_schema(&conn, &patients()).unwrap();
        append_columns(&conn, "patients", &[ColumnDefinition::new("weight", "decimal")]).unwrap();
        assert_eq!(next_display_order(&conn, "patients").unwrap(), 3);
        let names: Vec<_> = load_columns(&conn, "patients")
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["name", "age", "weight"]);
    }

    #[test]
    fn test_rename_and_purge() {
        let conn = catalog();
        upsert_schema(&conn, &patients()).unwrap();
        rename_table(&conn, "patients", "people").unwrap();
        rename_column(&conn, "people", "age", "years").unwrap();

        let loaded = load_schema(&conn, "people").unwrap().unwrap();
        assert_eq!(loaded.field_names(), vec!["name", "years"]);
        assert!(load_schema(&conn, "patients").unwrap().is_none());

        delete_columns(&conn, "people", &["NAME".to_string()]).unwrap();
        assert_eq!(load_columns(&conn, "people").unwrap().len(), 1);

        purge_table(&conn, "people").unwrap();
        assert!(table_names(&conn).unwrap().is_empty());
        assert!(load_columns(&conn, "people").unwrap().is_empty());
    }

    #[test]
    fn test_blank_display_name_is_none() {
        let conn = catalog();
        upsert_schema(&conn, &TableSchema::new("t", vec![ColumnDefinition::new("a", "text")]))
            .unwrap();
        assert_eq!(display_name(&conn, "t").unwrap(), None);
        upsert_schema(&conn, &patients()).unwrap();
        assert_eq!(display_name(&conn, "patients").unwrap().as_deref(), Some("患者"));
    }
}
