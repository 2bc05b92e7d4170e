//! Catalog DDL, one constant per version.

/// v1: the table and column catalogs.
pub const CATALOG_V1: &str = "
CREATE TABLE IF NOT EXISTS table_meta (
    table_name TEXT PRIMARY KEY,
    display_name TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT ''
) STRICT;

CREATE TABLE IF NOT EXISTS column_meta (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    labels TEXT NOT NULL DEFAULT '[]',
    type_hint TEXT NOT NULL DEFAULT '',
    allow_null INTEGER NOT NULL DEFAULT 1,
    display_order INTEGER NOT NULL DEFAULT 0
) STRICT;

CREATE INDEX IF NOT EXISTS idx_column_meta_table ON column_meta(table_name);
";

/// v2: declared defaults, and one catalog row per (table, column).
pub const CATALOG_V2: &str = "
ALTER TABLE column_meta ADD COLUMN default_value TEXT;

DELETE FROM column_meta
WHERE id NOT IN (
    SELECT MIN(id) FROM column_meta GROUP BY table_name, column_name
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_column_meta_key
    ON column_meta(table_name, column_name);
";
