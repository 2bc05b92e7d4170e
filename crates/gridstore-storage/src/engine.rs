//! `GridStorageEngine`: the `ITableStore` implementation.
//!
//! Wraps `DatabaseManager`. Schema changes, row writes and imports go
//! through `with_writer()`; everything else through `with_reader()`.
//! This is the single owner of the connections; no other module opens one.

use std::io::Read;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use gridstore_core::config::{GridConfig, ImportConfig, StorageConfig};
use gridstore_core::errors::{GridError, GridResult};
use gridstore_core::traits::table_store::RecordStream;
use gridstore_core::traits::{CatalogDrift, HealthReport, ITableStore};
use gridstore_core::types::{
    ColumnDefinition, ColumnSummary, ExportFile, ExportRequest, FieldMap, ImportOptions,
    QueryOptions, QueryPage, TableSchema,
};

use crate::connection::DatabaseManager;
use crate::{catalog, import, introspect, migrations, queries, schema};

pub struct GridStorageEngine {
    db: DatabaseManager,
    import_defaults: ImportConfig,
}

impl GridStorageEngine {
    /// Open a file-backed engine with default storage settings.
    pub fn open(path: &Path) -> GridResult<Self> {
        let db = DatabaseManager::open(path, &StorageConfig::default())?;
        Ok(Self {
            db,
            import_defaults: ImportConfig::default(),
        })
    }

    /// Open the database named by `config.storage.db_path`.
    pub fn open_with_config(config: &GridConfig) -> GridResult<Self> {
        let path = Path::new(config.storage.effective_db_path());
        let db = DatabaseManager::open(path, &config.storage)?;
        info!(
            path = %path.display(),
            readers = db.reader_count(),
            "storage engine opened"
        );
        Ok(Self {
            db,
            import_defaults: config.import.clone(),
        })
    }

    /// In-memory engine (for testing).
    pub fn open_in_memory() -> GridResult<Self> {
        Ok(Self {
            db: DatabaseManager::open_in_memory()?,
            import_defaults: ImportConfig::default(),
        })
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.db.path()
    }

    pub fn checkpoint(&self) -> GridResult<()> {
        self.db.checkpoint()
    }

    /// Raw read access for callers outside the trait surface.
    pub fn with_reader<F, T>(&self, f: F) -> GridResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> GridResult<T>,
    {
        self.db.with_reader(f)
    }

    /// Raw write access for callers outside the trait surface.
    pub fn with_writer<F, T>(&self, f: F) -> GridResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> GridResult<T>,
    {
        self.db.with_writer(f)
    }

    fn import_options(&self, options: &ImportOptions) -> ImportOptions {
        ImportOptions {
            allow_unknown: Some(options.allow_unknown.unwrap_or_else(|| {
                self.import_defaults.effective_allow_unknown_columns()
            })),
            aliases: options.aliases.clone(),
        }
    }
}

impl ITableStore for GridStorageEngine {
    fn list_schemas(&self) -> GridResult<Vec<TableSchema>> {
        self.db.with_reader(|conn| {
            for drift in introspect::detect_drift(conn)? {
                warn!(?drift, "catalog drift");
            }
            catalog::list_schemas(conn)
        })
    }

    fn create_schema(&self, schema: &TableSchema) -> GridResult<()> {
        self.db
            .with_writer(|conn| schema::create_table(conn, schema))
            .map(|_| ())
    }

    fn update_schema(&self, table: &str, schema: &TableSchema) -> GridResult<()> {
        let start = Instant::now();
        let plan = self
            .db
            .with_writer(|conn| schema::update_table(conn, table, schema))?;
        debug!(
            table,
            structural = !plan.is_structural_noop(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "update_schema"
        );
        Ok(())
    }

    fn drop_schema(&self, table: &str) -> GridResult<()> {
        let existed = self.db.with_writer(|conn| schema::drop_table(conn, table))?;
        info!(table, existed, "table dropped");
        Ok(())
    }

    fn add_columns(&self, table: &str, columns: &[ColumnDefinition]) -> GridResult<()> {
        self.db
            .with_writer(|conn| schema::add_columns(conn, table, columns))
            .map(|_| ())
    }

    fn drop_columns(&self, table: &str, columns: &[String]) -> GridResult<()> {
        let start = Instant::now();
        self.db
            .with_writer(|conn| schema::drop_columns(conn, table, columns))?;
        debug!(table, elapsed_ms = start.elapsed().as_millis() as u64, "drop_columns");
        Ok(())
    }

    fn display_name(&self, table: &str) -> GridResult<Option<String>> {
        self.db.with_reader(|conn| catalog::display_name(conn, table))
    }

    fn verify_catalog(&self) -> GridResult<Vec<CatalogDrift>> {
        self.db.with_reader(introspect::detect_drift)
    }

    fn query(&self, table: &str, options: &QueryOptions) -> GridResult<QueryPage> {
        self.db
            .with_reader(|conn| queries::query_rows(conn, table, options))
    }

    fn insert_row(&self, table: &str, fields: FieldMap) -> GridResult<i64> {
        self.db
            .with_writer(|conn| queries::insert_row(conn, table, &fields))
    }

    fn update_row(&self, table: &str, id: i64, fields: FieldMap) -> GridResult<()> {
        let changed = self
            .db
            .with_writer(|conn| queries::update_row(conn, table, id, &fields))?;
        debug!(table, id, changed, "row updated");
        Ok(())
    }

    fn delete_row(&self, table: &str, id: i64) -> GridResult<()> {
        self.db
            .with_writer(|conn| queries::delete_row(conn, table, id))
            .map(|_| ())
    }

    fn delete_rows(&self, table: &str, ids: &[i64]) -> GridResult<()> {
        let deleted = self
            .db
            .with_writer(|conn| queries::delete_rows(conn, table, ids))?;
        debug!(table, requested = ids.len(), deleted, "rows deleted");
        Ok(())
    }

    fn clear_rows(&self, table: &str) -> GridResult<usize> {
        let deleted = self.db.with_writer(|conn| schema::clear_table(conn, table))?;
        info!(table, deleted, "table cleared");
        Ok(deleted)
    }

    fn import_rows(
        &self,
        table: &str,
        header: &[String],
        records: RecordStream<'_>,
        options: &ImportOptions,
    ) -> GridResult<usize> {
        let start = Instant::now();
        let options = self.import_options(options);
        let result = self
            .db
            .with_writer(|conn| import::import_records(conn, table, header, records, &options));
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(inserted) => debug!(table, inserted, elapsed_ms, "import_rows"),
            Err(e) => warn!(
                table,
                inserted = e.inserted_before_failure(),
                elapsed_ms,
                error = %e,
                "import_rows failed"
            ),
        }
        result
    }

    fn import_csv(
        &self,
        table: &str,
        source: &mut dyn Read,
        options: &ImportOptions,
    ) -> GridResult<usize> {
        let (header, mut records) = import::csv_records(source)?;
        self.import_rows(table, &header, &mut records, options)
    }

    fn import_spreadsheet(
        &self,
        table: &str,
        bytes: &[u8],
        options: &ImportOptions,
    ) -> GridResult<usize> {
        let (header, records) = import::spreadsheet_records(bytes)?;
        let mut records = records.into_iter().map(Ok::<_, GridError>);
        self.import_rows(table, &header, &mut records, options)
    }

    fn export_rows(&self, table: &str, request: &ExportRequest) -> GridResult<ExportFile> {
        self.db
            .with_reader(|conn| queries::export_rows(conn, table, request))
    }

    fn summary(&self, table: &str, column: &str) -> GridResult<ColumnSummary> {
        self.db
            .with_reader(|conn| queries::summarize_column(conn, table, column))
    }

    fn health(&self) -> GridResult<HealthReport> {
        let wal_mode = self.db.is_wal_mode();
        self.db.with_reader(|conn| {
            Ok(HealthReport {
                wal_mode,
                catalog_version: migrations::current_version(conn)?,
                table_count: catalog::table_names(conn)?.len(),
            })
        })
    }
}
