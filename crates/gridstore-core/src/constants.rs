//! Names and limits shared by every crate in the workspace.

/// Identity key of every managed table.
pub const ID_COLUMN: &str = "id";
/// Set once at insert.
pub const CREATED_AT_COLUMN: &str = "created_at";
/// Refreshed on every update.
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Housekeeping columns; never part of a logical schema.
pub const HOUSEKEEPING_COLUMNS: [&str; 3] = [ID_COLUMN, CREATED_AT_COLUMN, UPDATED_AT_COLUMN];

/// Table-level catalog relation.
pub const TABLE_CATALOG: &str = "table_meta";
/// Column-level catalog relation.
pub const COLUMN_CATALOG: &str = "column_meta";

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

pub const MAX_IDENTIFIER_LEN: usize = 64;

pub fn is_housekeeping(name: &str) -> bool {
    HOUSEKEEPING_COLUMNS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}
