//! Import reconciler: map source headers onto columns, then insert each
//! record through the normal row-writing path.

pub mod sources;

use std::collections::BTreeMap;

use rusqlite::Connection;
use tracing::{debug, info};

use gridstore_core::errors::{GridError, GridResult};
use gridstore_core::traits::table_store::RecordStream;
use gridstore_core::types::{ColumnDefinition, FieldMap, ImportOptions, Value};

use crate::introspect::known_columns;
use crate::queries::rows::insert_with_columns;

pub use sources::{csv_records, spreadsheet_records};

/// Trimmed, lowercased, without a leading UTF-8 BOM.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// For each source position, the column it feeds (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMapping {
    targets: Vec<Option<String>>,
}

impl HeaderMapping {
    pub fn targets(&self) -> &[Option<String>] {
        &self.targets
    }

    /// `None` when every cell of the record is blank, mapped or not.
    pub fn record_fields(&self, record: &[String]) -> Option<FieldMap> {
        if record.iter().all(|cell| cell.trim().is_empty()) {
            return None;
        }
        let fields = self
            .targets
            .iter()
            .zip(record)
            .filter_map(|(target, cell)| {
                target
                    .as_ref()
                    .map(|column| (column.clone(), Value::Text(cell.clone())))
            })
            .collect();
        Some(fields)
    }
}

fn find_column<'a>(columns: &'a [ColumnDefinition], name: &str) -> Option<&'a ColumnDefinition> {
    columns.iter().find(|c| c.name.to_lowercase() == name)
}

/// Resolve headers by alias map, then column name, then label.
///
/// All comparisons are on normalized text. The first column in display
/// order wins a label shared by several columns.
pub fn resolve_headers(
    header: &[String],
    columns: &[ColumnDefinition],
    options: &ImportOptions,
) -> GridResult<HeaderMapping> {
    if header.iter().all(|h| normalize_header(h).is_empty()) {
        return Err(GridError::ImportSource {
            reason: "header row is empty".to_string(),
        });
    }
    let aliases: BTreeMap<String, String> = options
        .aliases
        .iter()
        .map(|(from, to)| (normalize_header(from), normalize_header(to)))
        .collect();

    let mut targets = Vec::with_capacity(header.len());
    let mut unknown = Vec::new();
    for raw in header {
        let key = normalize_header(raw);
        if key.is_empty() {
            targets.push(None);
            continue;
        }
        let resolved = match aliases.get(&key) {
            Some(target) => find_column(columns, target),
            None => find_column(columns, &key).or_else(|| {
                columns
                    .iter()
                    .find(|c| c.labels.iter().any(|l| normalize_header(l) == key))
            }),
        };
        match resolved {
            Some(column) => targets.push(Some(column.name.clone())),
            None => {
                unknown.push(raw.trim().to_string());
                targets.push(None);
            }
        }
    }

    if !unknown.is_empty() && !options.allow_unknown.unwrap_or(false) {
        return Err(GridError::UnknownColumns { columns: unknown });
    }
    if !unknown.is_empty() {
        debug!(columns = ?unknown, "discarding unresolved import headers");
    }
    Ok(HeaderMapping { targets })
}

/// Insert every non-blank record. Stops at the first failing row; rows
/// before it stay committed and are reported in `ImportAborted`.
pub fn import_records(
    conn: &Connection,
    table: &str,
    header: &[String],
    records: RecordStream<'_>,
    options: &ImportOptions,
) -> GridResult<usize> {
    let (table, columns) = known_columns(conn, table)?;
    let mapping = resolve_headers(header, &columns, options)?;

    let mut inserted = 0usize;
    for (index, record) in records.enumerate() {
        let row = index + 1;
        let abort = move |source: GridError| GridError::ImportAborted {
            inserted,
            row,
            source: Box::new(source),
        };
        let record = record.map_err(abort)?;
        let Some(fields) = mapping.record_fields(&record) else {
            continue;
        };
        insert_with_columns(conn, &table, &columns, &fields).map_err(abort)?;
        inserted += 1;
    }
    info!(table = %table, inserted, "import complete");
    Ok(inserted)
}
