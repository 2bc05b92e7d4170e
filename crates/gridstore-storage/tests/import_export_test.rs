//! Import reconciliation and export through `ITableStore`.

use gridstore_core::traits::ITableStore;
use gridstore_core::types::{
    ColumnDefinition, ExportFormat, ExportRequest, ImportOptions, QueryOptions, TableSchema, Value,
};
use gridstore_core::{GridConfig, GridError, GridErrorCode};
use gridstore_storage::GridStorageEngine;
use tempfile::TempDir;

fn schema() -> TableSchema {
    TableSchema::new(
        "staff",
        vec![
            ColumnDefinition::new("name", "text").with_labels(["姓名"]).required(),
            ColumnDefinition::new("age", "integer").with_labels(["年龄"]),
            ColumnDefinition::new("on_call", "boolean").with_labels(["值班"]),
        ],
    )
    .with_display_name("员工")
}

fn engine() -> (TempDir, GridStorageEngine) {
    let dir = TempDir::new().unwrap();
    let engine = GridStorageEngine::open(&dir.path().join("io.db")).unwrap();
    engine.create_schema(&schema()).unwrap();
    (dir, engine)
}

fn total(engine: &GridStorageEngine) -> u64 {
    engine.query("staff", &QueryOptions::default()).unwrap().total
}

fn import(engine: &GridStorageEngine, csv: &str, options: &ImportOptions) -> Result<usize, GridError> {
    let mut source = csv.as_bytes();
    engine.import_csv("staff", &mut source, options)
}

#[test]
fn test_label_and_name_headers_resolve() {
    let (_dir, engine) = engine();
    let inserted = import(&engine, "姓名,age\nann,30\nbo,41\n", &ImportOptions::default()).unwrap();
    assert_eq!(inserted, 2);

    let opts = QueryOptions {
        sort_by: "age".into(),
        ..Default::default()
    };
    let rows = engine.query("staff", &opts).unwrap().rows;
    assert_eq!(rows[0].values.get("name"), Some(&Value::from("ann")));
    assert_eq!(rows[0].values.get("age"), Some(&Value::Integer(30)));
}

#[test]
fn test_unknown_header_rejected_before_any_insert() {
    let (_dir, engine) = engine();
    let err = import(&engine, "姓名,unknown_col\nann,x\n", &ImportOptions::default()).unwrap_err();
    match &err {
        GridError::UnknownColumns { columns } => assert_eq!(columns, &vec!["unknown_col".to_string()]),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(err.error_code(), "UNKNOWN_COLUMNS");
    assert_eq!(total(&engine), 0);

    let lenient = ImportOptions {
        allow_unknown: Some(true),
        ..Default::default()
    };
    assert_eq!(import(&engine, "姓名,unknown_col\nann,x\n", &lenient).unwrap(), 1);
}

#[test]
fn test_alias_map() {
    let (_dir, engine) = engine();
    let mut options = ImportOptions::default();
    options.aliases.insert("Employee".into(), "name".into());
    options.aliases.insert("On Duty".into(), "on_call".into());
    let inserted = import(&engine, "employee,on duty\nann,是\n", &options).unwrap();
    assert_eq!(inserted, 1);
    let row = engine.query("staff", &QueryOptions::default()).unwrap().rows.remove(0);
    assert_eq!(row.values.get("on_call"), Some(&Value::Bool(true)));
}

#[test]
fn test_failure_reports_progress_and_keeps_prior_rows() {
    let (_dir, engine) = engine();
    let err = import(
        &engine,
        "姓名,年龄\nann,30\n\n,\nbo,old\ncy,5\n",
        &ImportOptions::default(),
    )
    .unwrap_err();
    match &err {
        GridError::ImportAborted { inserted, row, source } => {
            assert_eq!(*inserted, 1);
            assert_eq!(*row, 3, "blank record counts as a row");
            assert!(matches!(**source, GridError::InvalidValue { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(err.error_code(), "INVALID_VALUE");
    assert_eq!(err.inserted_before_failure(), 1);
    assert_eq!(total(&engine), 1);
}

#[test]
fn test_missing_required_during_import() {
    let (_dir, engine) = engine();
    let err = import(&engine, "年龄\n30\n", &ImportOptions::default()).unwrap_err();
    assert_eq!(err.error_code(), "MISSING_REQUIRED_FIELD");
    assert_eq!(total(&engine), 0);
}

#[test]
fn test_import_rows_from_records() {
    let (_dir, engine) = engine();
    let header = vec!["NAME".to_string(), "值班".to_string()];
    let rows: Vec<Result<Vec<String>, GridError>> = vec![
        Ok(vec!["ann".to_string(), "yes".to_string()]),
        Ok(vec!["".to_string(), "".to_string()]),
        Ok(vec!["bo".to_string()]),
    ];
    let mut records = rows.into_iter();
    let inserted = engine
        .import_rows("staff", &header, &mut records, &ImportOptions::default())
        .unwrap();
    assert_eq!(inserted, 2);
}

#[test]
fn test_spreadsheet_rejects_non_workbook() {
    let (_dir, engine) = engine();
    let err = engine
        .import_spreadsheet("staff", b"plain text", &ImportOptions::default())
        .unwrap_err();
    assert_eq!(err.error_code(), "IMPORT_FAILED");
}

#[test]
fn test_export_then_reimport() {
    let (_dir, engine) = engine();
    import(&engine, "姓名,年龄,值班\nann,30,是\n\"bo, jr\",,否\n", &ImportOptions::default()).unwrap();

    let file = engine
        .export_rows("staff", &ExportRequest::all().with_format(ExportFormat::Csv))
        .unwrap();
    assert_eq!(file.file_name, "员工.csv");
    assert!(file.content_type.starts_with("text/csv"));
    let text = String::from_utf8(file.bytes.clone()).unwrap();
    let text = text.trim_start_matches('\u{feff}');
    assert!(text.starts_with("姓名,年龄,值班\n"));
    assert!(text.contains("\"bo, jr\",,false"));

    engine.clear_rows("staff").unwrap();
    let mut source = file.bytes.as_slice();
    assert_eq!(engine.import_csv("staff", &mut source, &ImportOptions::default()).unwrap(), 2);
    let search = QueryOptions {
        search: "jr".into(),
        ..Default::default()
    };
    let row = engine.query("staff", &search).unwrap().rows.remove(0);
    assert_eq!(row.values.get("age"), Some(&Value::Null));
    assert_eq!(row.values.get("on_call"), Some(&Value::Bool(false)));
}

#[test]
fn test_workbook_export_then_reimport() {
    let (_dir, engine) = engine();
    import(&engine, "姓名,年龄,值班\nann,30,是\nbo,,否\n", &ImportOptions::default()).unwrap();

    let file = engine.export_rows("staff", &ExportRequest::all()).unwrap();
    assert_eq!(file.file_name, "员工.xlsx");
    assert!(file.content_type.contains("spreadsheetml"));

    engine.clear_rows("staff").unwrap();
    let inserted = engine
        .import_spreadsheet("staff", &file.bytes, &ImportOptions::default())
        .unwrap();
    assert_eq!(inserted, 2);

    let opts = QueryOptions {
        sort_by: "name".into(),
        ..Default::default()
    };
    let rows = engine.query("staff", &opts).unwrap().rows;
    assert_eq!(rows[0].values.get("name"), Some(&Value::from("ann")));
    assert_eq!(rows[0].values.get("age"), Some(&Value::Integer(30)));
    assert_eq!(rows[0].values.get("on_call"), Some(&Value::Bool(true)));
    assert_eq!(rows[1].values.get("age"), Some(&Value::Null));
    assert_eq!(rows[1].values.get("on_call"), Some(&Value::Bool(false)));
}

#[test]
fn test_export_selected_ids() {
    let (_dir, engine) = engine();
    import(&engine, "姓名\na\nb\nc\n", &ImportOptions::default()).unwrap();
    let request = ExportRequest::ids(vec![1, 3]).with_format(ExportFormat::Csv);
    let file = engine.export_rows("staff", &request).unwrap();
    let text = String::from_utf8(file.bytes).unwrap();
    let lines: Vec<&str> = text.trim_start_matches('\u{feff}').lines().collect();
    assert_eq!(lines, vec!["姓名,年龄,值班", "c,,", "a,,"]);
}

#[test]
fn test_config_allows_unknown_columns() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("cfg.db");
    let config = GridConfig::from_toml(&format!(
        "[storage]\ndb_path = {:?}\nread_pool_size = 2\n\n[import]\nallow_unknown_columns = true\n",
        db_path.display().to_string()
    ))
    .unwrap();
    let engine = GridStorageEngine::open_with_config(&config).unwrap();
    assert_eq!(engine.path(), Some(db_path.as_path()));
    engine.create_schema(&schema()).unwrap();
    assert_eq!(import(&engine, "姓名,extra\nann,1\n", &ImportOptions::default()).unwrap(), 1);

    let strict = ImportOptions {
        allow_unknown: Some(false),
        ..Default::default()
    };
    let err = import(&engine, "姓名,extra\nbo,2\n", &strict).unwrap_err();
    assert!(matches!(err, GridError::UnknownColumns { .. }));
    assert_eq!(total(&engine), 1);
}

#[test]
fn test_row_with_data_only_under_discarded_header_is_validated() {
    let (_dir, engine) = engine();
    let lenient = ImportOptions {
        allow_unknown: Some(true),
        ..Default::default()
    };
    let err = import(&engine, "name,extra\n,data\n", &lenient).unwrap_err();
    match err {
        GridError::ImportAborted { inserted, row, source } => {
            assert_eq!((inserted, row), (0, 1));
            assert!(matches!(*source, GridError::MissingRequiredField { ref column } if column == "name"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(import(&engine, "name,extra\n,\nann,\n", &lenient).unwrap(), 1);
}
