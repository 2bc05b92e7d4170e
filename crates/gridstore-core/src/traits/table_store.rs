//! `ITableStore`: the operation surface consumed by the API layer.
//!
//! Implemented by `gridstore-storage::GridStorageEngine`.

use std::io::Read;

use serde::Serialize;

use crate::errors::GridResult;
use crate::types::{
    ColumnDefinition, ColumnSummary, ExportFile, ExportRequest, FieldMap, ImportOptions,
    QueryOptions, QueryPage, TableSchema,
};

/// A record stream for imports: one `Vec<String>` of cells per row.
pub type RecordStream<'a> = &'a mut dyn Iterator<Item = GridResult<Vec<String>>>;

/// One disagreement between the catalog and the physical store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogDrift {
    /// Cataloged table with no physical relation.
    MissingTable { table: String },
    /// Cataloged column absent from the physical relation.
    MissingColumn { table: String, column: String },
    /// Physical column with no catalog row.
    UncatalogedColumn { table: String, column: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub wal_mode: bool,
    pub catalog_version: u32,
    pub table_count: usize,
}

/// Schema, row, import/export and analytics operations over managed tables.
pub trait ITableStore: Send + Sync {
    // ── schema ──

    /// Every managed schema, ordered by table name; fields by display order.
    fn list_schemas(&self) -> GridResult<Vec<TableSchema>>;

    fn create_schema(&self, schema: &TableSchema) -> GridResult<()>;

    /// Reconcile `table` with a full incoming schema (rename/add/drop/relabel).
    fn update_schema(&self, table: &str, schema: &TableSchema) -> GridResult<()>;

    /// Drop the table, its rows and its catalog entries.
    fn drop_schema(&self, table: &str) -> GridResult<()>;

    fn add_columns(&self, table: &str, columns: &[ColumnDefinition]) -> GridResult<()>;

    fn drop_columns(&self, table: &str, columns: &[String]) -> GridResult<()>;

    fn display_name(&self, table: &str) -> GridResult<Option<String>>;

    /// Compare the catalog against the physical store.
    fn verify_catalog(&self) -> GridResult<Vec<CatalogDrift>>;

    // ── rows ──

    fn query(&self, table: &str, options: &QueryOptions) -> GridResult<QueryPage>;

    /// Returns the new row id.
    fn insert_row(&self, table: &str, fields: FieldMap) -> GridResult<i64>;

    /// Sparse patch; absent fields are left untouched.
    fn update_row(&self, table: &str, id: i64, fields: FieldMap) -> GridResult<()>;

    fn delete_row(&self, table: &str, id: i64) -> GridResult<()>;

    fn delete_rows(&self, table: &str, ids: &[i64]) -> GridResult<()>;

    /// Delete every row, keeping the schema. Returns the number deleted.
    fn clear_rows(&self, table: &str) -> GridResult<usize>;

    // ── import / export ──

    /// Returns the number of rows inserted.
    fn import_rows(
        &self,
        table: &str,
        header: &[String],
        records: RecordStream<'_>,
        options: &ImportOptions,
    ) -> GridResult<usize>;

    fn import_csv(&self, table: &str, source: &mut dyn Read, options: &ImportOptions)
        -> GridResult<usize>;

    fn import_spreadsheet(&self, table: &str, bytes: &[u8], options: &ImportOptions)
        -> GridResult<usize>;

    fn export_rows(&self, table: &str, request: &ExportRequest) -> GridResult<ExportFile>;

    // ── analytics ──

    fn summary(&self, table: &str, column: &str) -> GridResult<ColumnSummary>;

    fn health(&self) -> GridResult<HealthReport>;
}
