//! SQLite PRAGMA configuration for gridstore connections.
//! Must be called on every connection immediately after opening.

use gridstore_core::errors::{GridResult, StorageContext};
use rusqlite::Connection;

/// Configure a read-write connection.
///
/// - WAL so readers proceed during writes
/// - busy_timeout is the bounded lock wait under contention
/// - NORMAL synchronous for the WAL durability trade-off
pub fn apply_pragmas(conn: &Connection, busy_timeout_ms: u64) -> GridResult<()> {
    conn.execute_batch(&format!(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = {busy_timeout_ms};
        PRAGMA cache_size = -8000;
        PRAGMA mmap_size = 268435456;
        PRAGMA temp_store = MEMORY;
        "
    ))
    .ctx("apply pragmas", "connection")
}

/// Same as `apply_pragmas` plus `query_only = ON`.
pub fn apply_readonly_pragmas(conn: &Connection, busy_timeout_ms: u64) -> GridResult<()> {
    apply_pragmas(conn, busy_timeout_ms)?;
    conn.execute_batch("PRAGMA query_only = ON;")
        .ctx("apply pragmas", "reader")
}
