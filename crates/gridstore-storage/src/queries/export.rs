//! Export of a filtered, id-selected or full row set as a workbook or CSV.

use rusqlite::Connection;
use rust_xlsxwriter::{Format, Workbook};
use tracing::debug;

use gridstore_core::errors::{GridError, GridResult};
use gridstore_core::types::{ColumnDefinition, ExportFile, ExportFormat, ExportRequest, Row, Value};

use super::filter::{build_filter, id_filter, order_clause, page_params};
use super::rows::{select_rows, RowSelect};
use crate::catalog;
use crate::introspect::known_columns;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Spreadsheet tools need the BOM to detect UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const SHEET_NAME: &str = "Sheet1";

/// Integers beyond this lose precision as workbook numbers.
const MAX_EXACT_NUMBER: u64 = 1 << 53;

fn export_error(e: impl std::fmt::Display) -> GridError {
    GridError::Export {
        reason: e.to_string(),
    }
}

fn cell_text(value: Option<&Value>) -> String {
    value.map(Value::to_text).unwrap_or_default()
}

/// The matching rows for `request`, with the columns they are rendered by.
struct ExportSet {
    table: String,
    columns: Vec<ColumnDefinition>,
    rows: Vec<Row>,
}

fn select_export_set(conn: &Connection, table: &str, request: &ExportRequest) -> GridResult<ExportSet> {
    let (table, columns) = known_columns(conn, table)?;
    let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

    let filter = if request.ids.is_empty() {
        build_filter(&request.options, &names)
    } else {
        id_filter(&request.ids)
    };
    let order = order_clause(&request.options, &names);
    let page = request.is_paged().then(|| page_params(&request.options));
    let rows = select_rows(
        conn,
        &table,
        &RowSelect {
            columns: &columns,
            filter: &filter,
            order: &order,
            page,
            include_timestamps: false,
        },
    )?;
    Ok(ExportSet {
        table,
        columns,
        rows,
    })
}

fn file_name(conn: &Connection, table: &str, format: ExportFormat) -> GridResult<String> {
    let stem = catalog::display_name(conn, table)?.unwrap_or_else(|| table.to_string());
    Ok(format!("{stem}.{}", format.extension()))
}

fn render_csv(set: &ExportSet) -> GridResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer
        .write_record(set.columns.iter().map(|c| c.header()))
        .map_err(export_error)?;
    for row in &set.rows {
        writer
            .write_record(set.columns.iter().map(|c| cell_text(row.values.get(&c.name))))
            .map_err(export_error)?;
    }
    writer.into_inner().map_err(export_error)
}

/// One sheet: a bold header row of first labels, then one typed row per
/// record. Nulls leave the cell empty.
fn render_xlsx(set: &ExportSet) -> GridResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(export_error)?;

    for (index, column) in set.columns.iter().enumerate() {
        let col = u16::try_from(index).map_err(export_error)?;
        sheet
            .write_string_with_format(0, col, column.header(), &bold)
            .map_err(export_error)?;
    }
    for (offset, record) in set.rows.iter().enumerate() {
        let row = u32::try_from(offset + 1).map_err(export_error)?;
        for (index, column) in set.columns.iter().enumerate() {
            let col = u16::try_from(index).map_err(export_error)?;
            let written = match record.values.get(&column.name) {
                None | Some(Value::Null) => continue,
                Some(Value::Bool(b)) => sheet.write_boolean(row, col, *b),
                Some(Value::Integer(i)) if i.unsigned_abs() <= MAX_EXACT_NUMBER => {
                    sheet.write_number(row, col, *i as f64)
                }
                Some(Value::Real(f)) => sheet.write_number(row, col, *f),
                Some(other) => sheet.write_string(row, col, &other.to_text()),
            };
            written.map_err(export_error)?;
        }
    }
    workbook.save_to_buffer().map_err(export_error)
}

/// Render matching rows as CSV, one column per field in display order,
/// headed by each field's first label.
pub fn export_csv(conn: &Connection, table: &str, request: &ExportRequest) -> GridResult<ExportFile> {
    let set = select_export_set(conn, table, request)?;
    let bytes = render_csv(&set)?;
    debug!(table = %set.table, rows = set.rows.len(), "rows exported as csv");
    Ok(ExportFile {
        file_name: file_name(conn, &set.table, ExportFormat::Csv)?,
        content_type: CSV_CONTENT_TYPE,
        bytes,
    })
}

/// Render matching rows as a single-sheet xlsx workbook.
pub fn export_xlsx(conn: &Connection, table: &str, request: &ExportRequest) -> GridResult<ExportFile> {
    let set = select_export_set(conn, table, request)?;
    let bytes = render_xlsx(&set)?;
    debug!(table = %set.table, rows = set.rows.len(), "rows exported as xlsx");
    Ok(ExportFile {
        file_name: file_name(conn, &set.table, ExportFormat::Xlsx)?,
        content_type: XLSX_CONTENT_TYPE,
        bytes,
    })
}

/// Export in the format named by the request.
pub fn export_rows(conn: &Connection, table: &str, request: &ExportRequest) -> GridResult<ExportFile> {
    match request.format {
        ExportFormat::Xlsx => export_xlsx(conn, table, request),
        ExportFormat::Csv => export_csv(conn, table, request),
    }
}
