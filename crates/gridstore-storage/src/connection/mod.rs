//! DatabaseManager: one writer plus a bounded pool of readers.
//!
//! The only place in the crate that holds `Mutex<Connection>`. Structural
//! and row-mutating work goes through `with_writer`; reads go through
//! `with_reader` (round-robin).

pub mod pragmas;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use gridstore_core::config::StorageConfig;
use gridstore_core::errors::{GridError, GridResult, StorageContext};
use rusqlite::{Connection, OpenFlags};

use crate::migrations;

pub use pragmas::{apply_pragmas, apply_readonly_pragmas};

pub struct DatabaseManager {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    read_index: AtomicUsize,
    path: Option<PathBuf>,
}

impl DatabaseManager {
    /// Open a file-backed store, run catalog migrations, then open readers.
    pub fn open(path: &Path, config: &StorageConfig) -> GridResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| GridError::Config(format!(
                "failed to create data directory {}: {e}",
                parent.display()
            )))?;
        }
        let busy = config.effective_busy_timeout_ms();
        let target = path.display().to_string();

        let writer = Connection::open(path).ctx("open writer", &target)?;
        apply_pragmas(&writer, busy)?;
        migrations::run_migrations(&writer)?;

        let pool_size = config.effective_read_pool_size();
        let mut readers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .ctx("open reader", &target)?;
            apply_readonly_pragmas(&reader, busy)?;
            readers.push(Mutex::new(reader));
        }

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            read_index: AtomicUsize::new(0),
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory store. Separate in-memory connections do not share data,
    /// so all reads fall back to the writer.
    pub fn open_in_memory() -> GridResult<Self> {
        let writer = Connection::open_in_memory().ctx("open writer", ":memory:")?;
        apply_pragmas(&writer, StorageConfig::default().effective_busy_timeout_ms())?;
        migrations::run_migrations(&writer)?;
        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            read_index: AtomicUsize::new(0),
            path: None,
        })
    }

    pub fn with_writer<F, T>(&self, f: F) -> GridResult<T>
    where
        F: FnOnce(&Connection) -> GridResult<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| GridError::Config(format!("writer lock poisoned: {e}")))?;
        f(&conn)
    }

    pub fn with_reader<F, T>(&self, f: F) -> GridResult<T>
    where
        F: FnOnce(&Connection) -> GridResult<T>,
    {
        if self.readers.is_empty() {
            return self.with_writer(f);
        }
        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[index]
            .lock()
            .map_err(|e| GridError::Config(format!("reader lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Fold the WAL back into the main database file.
    pub fn checkpoint(&self) -> GridResult<()> {
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .ctx("checkpoint", "wal")
        })
    }

    pub fn is_wal_mode(&self) -> bool {
        self.with_writer(|conn| {
            let mode: String = conn
                .pragma_query_value(None, "journal_mode", |row| row.get(0))
                .unwrap_or_default();
            Ok(mode.eq_ignore_ascii_case("wal"))
        })
        .unwrap_or(false)
    }
}
