//! Record sources: CSV text and spreadsheet workbooks.
//!
//! Both yield a header row plus a stream of string records. All cell typing
//! happens later, in coercion.

use std::io::{Cursor, Read};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;

use gridstore_core::errors::{GridError, GridResult};

fn source_error(e: impl std::fmt::Display) -> GridError {
    GridError::ImportSource {
        reason: e.to_string(),
    }
}

/// Leading whitespace in a cell is dropped; trailing is kept.
fn clean_cell(cell: &str) -> String {
    cell.trim_start().to_string()
}

pub type Records<'a> = Box<dyn Iterator<Item = GridResult<Vec<String>>> + 'a>;

/// Read the header row and return it with the remaining records.
///
/// Records may be shorter or longer than the header.
pub fn csv_records<'a>(source: &'a mut dyn Read) -> GridResult<(Vec<String>, Records<'a>)> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source);
    let mut records = reader.into_records();
    let header = match records.next() {
        Some(first) => first.map_err(source_error)?,
        None => {
            return Err(GridError::ImportSource {
                reason: "source is empty".to_string(),
            })
        }
    };
    let header: Vec<String> = header.iter().map(clean_cell).collect();
    let rest = records.map(|record| {
        record
            .map(|r| r.iter().map(clean_cell).collect())
            .map_err(source_error)
    });
    Ok((header, Box::new(rest)))
}

/// Rendering for workbook date cells.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn datetime_text(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

/// Render a cell the way a user would have typed it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => clean_cell(s),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(datetime_text)
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// Header and records from the first sheet of an xlsx/xls/ods workbook.
pub fn spreadsheet_records(bytes: &[u8]) -> GridResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(source_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| GridError::ImportSource {
            reason: "workbook has no sheets".to_string(),
        })?
        .map_err(source_error)?;

    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let header = rows.next().ok_or_else(|| GridError::ImportSource {
        reason: "sheet is empty".to_string(),
    })?;
    Ok((header, rows.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_header_and_ragged_rows() {
        let mut data = "姓名, age\nann,  3\nbo\n, ,x\n".as_bytes();
        let (header, records) = csv_records(&mut data).unwrap();
        assert_eq!(header, vec!["姓名", "age"]);
        let rows: Vec<Vec<String>> = records.map(|r| r.unwrap()).collect();
        assert_eq!(rows[0], vec!["ann", "3"]);
        assert_eq!(rows[1], vec!["bo"]);
        assert_eq!(rows[2], vec!["", "", "x"]);
    }

    #[test]
    fn test_csv_quoted_fields() {
        let mut data = "a,b\n\"x, y\",\"say \"\"hi\"\"\"\n".as_bytes();
        let (_, records) = csv_records(&mut data).unwrap();
        let rows: Vec<Vec<String>> = records.map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![vec!["x, y".to_string(), "say \"hi\"".to_string()]]);
    }

    #[test]
    fn test_csv_empty_source() {
        let mut data = "".as_bytes();
        assert!(matches!(csv_records(&mut data), Err(GridError::ImportSource { .. })));
    }

    #[test]
    fn test_spreadsheet_rejects_garbage() {
        assert!(matches!(
            spreadsheet_records(b"not a workbook"),
            Err(GridError::ImportSource { .. })
        ));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(-4)), "-4");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
        assert_eq!(cell_text(&Data::String("  pad".into())), "pad");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_datetime_text() {
        let noon = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(12, 5, 0))
            .unwrap();
        assert_eq!(datetime_text(noon), "2024-03-09 12:05:00");
    }
}
