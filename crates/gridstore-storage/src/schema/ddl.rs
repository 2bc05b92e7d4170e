//! DDL text for managed tables. Identifiers are validated before they get here.

use gridstore_core::constants::{CREATED_AT_COLUMN, ID_COLUMN, UPDATED_AT_COLUMN};
use gridstore_core::types::identifier::quote;
use gridstore_core::types::StorageType;

/// Quote a default as a string literal. SQLite applies column affinity on write.
pub fn default_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

pub fn id_ddl() -> String {
    format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote(ID_COLUMN))
}

pub fn timestamp_ddl() -> [String; 2] {
    [
        format!("{} DATETIME DEFAULT CURRENT_TIMESTAMP", quote(CREATED_AT_COLUMN)),
        format!("{} DATETIME DEFAULT CURRENT_TIMESTAMP", quote(UPDATED_AT_COLUMN)),
    ]
}

/// `"name" TYPE [NOT NULL] [DEFAULT expr]`. `default_sql` is already SQL text.
pub fn column_ddl(
    name: &str,
    storage: StorageType,
    not_null: bool,
    default_sql: Option<&str>,
) -> String {
    let mut ddl = format!("{} {}", quote(name), storage.as_sql());
    if not_null {
        ddl.push_str(" NOT NULL");
    }
    if let Some(default) = default_sql {
        ddl.push_str(" DEFAULT ");
        ddl.push_str(default);
    }
    ddl
}

/// Full CREATE TABLE with housekeeping columns around the user columns.
pub fn create_table_sql(table: &str, columns: &[String]) -> String {
    let [created, updated] = timestamp_ddl();
    let mut parts = Vec::with_capacity(columns.len() + 3);
    parts.push(id_ddl());
    parts.extend(columns.iter().cloned());
    parts.push(created);
    parts.push(updated);
    format!("CREATE TABLE {} (\n    {}\n)", quote(table), parts.join(",\n    "))
}
