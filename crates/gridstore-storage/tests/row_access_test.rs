//! Row writes, paging, search and summaries through `ITableStore`.

use gridstore_core::traits::ITableStore;
use gridstore_core::types::{ColumnDefinition, FieldMap, QueryOptions, TableSchema, Value};
use gridstore_core::{GridError, GridErrorCode};
use gridstore_storage::GridStorageEngine;
use tempfile::TempDir;

fn engine() -> (TempDir, GridStorageEngine) {
    let dir = TempDir::new().unwrap();
    let engine = GridStorageEngine::open(&dir.path().join("rows.db")).unwrap();
    engine
        .create_schema(&TableSchema::new(
            "items",
            vec![
                ColumnDefinition::new("title", "text").required(),
                ColumnDefinition::new("qty", "integer"),
                ColumnDefinition::new("price", "decimal"),
                ColumnDefinition::new("in_stock", "boolean"),
            ],
        ))
        .unwrap();
    (dir, engine)
}

fn item(title: &str, qty: i64) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("title", title);
    fields.insert("qty", qty);
    fields
}

#[test]
fn test_paging_over_25_rows() {
    let (_dir, engine) = engine();
    for i in 1..=25 {
        engine.insert_row("items", item(&format!("item {i}"), i)).unwrap();
    }
    let opts = QueryOptions {
        sort_by: "qty".into(),
        ..QueryOptions::page(2, 10)
    };
    let page = engine.query("items", &opts).unwrap();
    assert_eq!(page.total, 25);
    let qty: Vec<Value> = page.rows.iter().map(|r| r.values.get("qty").cloned().unwrap()).collect();
    assert_eq!(qty, (11..=20).map(Value::Integer).collect::<Vec<_>>());

    // Default order is newest first.
    let first = engine.query("items", &QueryOptions::page(1, 3)).unwrap();
    let ids: Vec<i64> = first.rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![25, 24, 23]);

    let past_end = engine.query("items", &QueryOptions::page(9, 10)).unwrap();
    assert!(past_end.rows.is_empty());
    assert_eq!(past_end.total, 25);
}

#[test]
fn test_search_and_filters() {
    let (_dir, engine) = engine();
    engine.insert_row("items", item("red apple", 1)).unwrap();
    engine.insert_row("items", item("green apple", 2)).unwrap();
    engine.insert_row("items", item("banana", 12)).unwrap();

    let search = QueryOptions {
        search: "apple".into(),
        ..Default::default()
    };
    assert_eq!(engine.query("items", &search).unwrap().total, 2);

    // Search spans every column, including numeric ones.
    let by_number = QueryOptions {
        search: "12".into(),
        ..Default::default()
    };
    assert_eq!(engine.query("items", &by_number).unwrap().total, 1);

    let mut filtered = QueryOptions {
        search: "apple".into(),
        ..Default::default()
    };
    filtered.filters.insert("title".into(), "green".into());
    filtered.filters.insert("no_such_column".into(), "x".into());
    let page = engine.query("items", &filtered).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].values.get("title"), Some(&Value::from("green apple")));

    let literal = QueryOptions {
        search: "%".into(),
        ..Default::default()
    };
    assert_eq!(engine.query("items", &literal).unwrap().total, 0);
}

#[test]
fn test_missing_required_field_writes_nothing() {
    let (_dir, engine) = engine();
    let mut fields = FieldMap::new();
    fields.insert("qty", 3i64);
    let err = engine.insert_row("items", fields).unwrap_err();
    assert!(matches!(err, GridError::MissingRequiredField { ref column } if column == "title"));
    assert_eq!(err.error_code(), "MISSING_REQUIRED_FIELD");
    assert_eq!(engine.query("items", &QueryOptions::default()).unwrap().total, 0);
}

#[test]
fn test_coercion_on_insert() {
    let (_dir, engine) = engine();
    let mut fields = FieldMap::new();
    fields.insert("title", "pen");
    fields.insert("qty", " 7 ");
    fields.insert("price", "1.25");
    fields.insert("in_stock", "否");
    fields.insert("id", 999i64);
    let id = engine.insert_row("items", fields).unwrap();
    assert_ne!(id, 999, "housekeeping keys are ignored");

    let stored = engine.query("items", &QueryOptions::default()).unwrap().rows.remove(0);
    assert_eq!(stored.values.get("qty"), Some(&Value::Integer(7)));
    assert_eq!(stored.values.get("price"), Some(&Value::Real(1.25)));
    assert_eq!(stored.values.get("in_stock"), Some(&Value::Bool(false)));

    let mut bad = FieldMap::new();
    bad.insert("title", "x");
    bad.insert("price", "cheap");
    let err = engine.insert_row("items", bad).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_VALUE");
}

#[test]
fn test_declared_defaults_are_stored_typed() {
    let (_dir, engine) = engine();
    engine
        .add_columns(
            "items",
            &[
                ColumnDefinition::new("ok", "boolean").with_default("yes"),
                ColumnDefinition::new("shelf", "integer").with_default(" 4 "),
                ColumnDefinition::new("rate", "decimal").with_default("0.50"),
            ],
        )
        .unwrap();
    let mut fields = FieldMap::new();
    fields.insert("title", "lamp");
    engine.insert_row("items", fields).unwrap();

    let stored = engine.query("items", &QueryOptions::default()).unwrap().rows.remove(0);
    assert_eq!(stored.values.get("ok"), Some(&Value::Bool(true)));
    assert_eq!(stored.values.get("shelf"), Some(&Value::Integer(4)));
    assert_eq!(stored.values.get("rate"), Some(&Value::Real(0.5)));
}

#[test]
fn test_update_and_delete() {
    let (_dir, engine) = engine();
    let a = engine.insert_row("items", item("a", 1)).unwrap();
    let b = engine.insert_row("items", item("b", 2)).unwrap();
    let c = engine.insert_row("items", item("c", 3)).unwrap();

    let mut patch = FieldMap::new();
    patch.insert("qty", 10i64);
    engine.update_row("items", a, patch).unwrap();
    engine.update_row("items", a, FieldMap::new()).unwrap();

    let opts = QueryOptions {
        include_timestamps: true,
        ..Default::default()
    };
    let page = engine.query("items", &opts).unwrap();
    let row_a = page.rows.iter().find(|r| r.id == a).unwrap();
    assert_eq!(row_a.values.get("title"), Some(&Value::from("a")));
    assert_eq!(row_a.values.get("qty"), Some(&Value::Integer(10)));
    assert!(row_a.created_at.is_some() && row_a.updated_at.is_some());

    let mut clear = FieldMap::new();
    clear.insert("title", Value::Null);
    assert!(matches!(
        engine.update_row("items", a, clear),
        Err(GridError::MissingRequiredField { .. })
    ));

    engine.delete_row("items", b).unwrap();
    engine.delete_row("items", b).unwrap();
    engine.delete_rows("items", &[a, 12345]).unwrap();
    let remaining = engine.query("items", &QueryOptions::default()).unwrap();
    assert_eq!(remaining.rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![c]);

    assert_eq!(engine.clear_rows("items").unwrap(), 1);
    assert_eq!(engine.query("items", &QueryOptions::default()).unwrap().total, 0);
}

#[test]
fn test_summary() {
    let (_dir, engine) = engine();
    let empty = engine.summary("items", "price").unwrap();
    assert_eq!(serde_json::to_value(&empty).unwrap(), serde_json::json!({"count": 0}));

    for q in [1, 2, 3, 4] {
        engine.insert_row("items", item("x", q)).unwrap();
    }
    let summary = engine.summary("items", "qty").unwrap();
    assert_eq!(summary.count, 4);
    let stats = summary.stats.unwrap();
    assert_eq!((stats.sum, stats.average, stats.max, stats.min), (10.0, 2.5, 4.0, 1.0));
    assert!((stats.std - 1.25f64.sqrt()).abs() < 1e-9);

    assert!(matches!(
        engine.summary("items", "title"),
        Err(GridError::UnsupportedColumnType { .. })
    ));
    assert!(matches!(
        engine.summary("items", "nope"),
        Err(GridError::UnknownColumn { .. })
    ));
}

#[test]
fn test_unknown_table_everywhere() {
    let (_dir, engine) = engine();
    let code = |e: GridError| e.error_code();
    assert_eq!(code(engine.query("ghost", &QueryOptions::default()).unwrap_err()), "UNKNOWN_TABLE");
    assert_eq!(code(engine.insert_row("ghost", item("x", 1)).unwrap_err()), "UNKNOWN_TABLE");
    assert_eq!(code(engine.delete_rows("ghost", &[1]).unwrap_err()), "UNKNOWN_TABLE");
    assert_eq!(code(engine.summary("ghost", "qty").unwrap_err()), "UNKNOWN_TABLE");
}
