//! Row access: coerce-and-write, sparse updates, deletes and paged reads.

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use gridstore_core::coercion::coerce_column;
use gridstore_core::constants::{CREATED_AT_COLUMN, ID_COLUMN, UPDATED_AT_COLUMN};
use gridstore_core::errors::{GridError, GridResult, StorageContext};
use gridstore_core::types::identifier::quote;
use gridstore_core::types::{ColumnDefinition, FieldMap, QueryOptions, QueryPage, Row, TypeHint, Value};

use super::filter::{build_filter, order_clause, page_params, FilterClause};
use crate::introspect::known_columns;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Absent required fields are an error; nulls are left to the column default.
    Insert,
    /// Absent fields are untouched; explicit nulls clear nullable columns.
    Update,
}

/// Hint used for reads and writes. Unrecognized catalog hints act as text.
pub fn column_hint(column: &ColumnDefinition) -> TypeHint {
    column.hint().unwrap_or(TypeHint::Text)
}

/// Coerce the payload against the declared columns, in display order.
/// Keys that are not declared columns are ignored.
pub fn prepare_values(
    columns: &[ColumnDefinition],
    fields: &FieldMap,
    mode: WriteMode,
) -> GridResult<Vec<(String, Value)>> {
    let mut prepared = Vec::with_capacity(columns.len());
    for column in columns {
        let Some(raw) = fields.get(&column.name) else {
            if mode == WriteMode::Insert && !column.allow_null {
                return Err(GridError::MissingRequiredField {
                    column: column.name.clone(),
                });
            }
            continue;
        };
        let value = coerce_column(&column.name, column_hint(column), raw)?;
        if value.is_null() {
            if !column.allow_null {
                return Err(GridError::MissingRequiredField {
                    column: column.name.clone(),
                });
            }
            if mode == WriteMode::Insert {
                continue;
            }
        }
        prepared.push((column.name.clone(), value));
    }
    Ok(prepared)
}

/// Insert using already-loaded column metadata. Returns the new id.
pub fn insert_with_columns(
    conn: &Connection,
    table: &str,
    columns: &[ColumnDefinition],
    fields: &FieldMap,
) -> GridResult<i64> {
    let prepared = prepare_values(columns, fields, WriteMode::Insert)?;
    let sql = if prepared.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote(table))
    } else {
        let names: Vec<String> = prepared.iter().map(|(n, _)| quote(n)).collect();
        let marks = vec!["?"; prepared.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({marks})",
            quote(table),
            names.join(", ")
        )
    };
    let mut stmt = conn.prepare_cached(&sql).ctx("insert row", table)?;
    stmt.execute(params_from_iter(prepared.iter().map(|(_, v)| v)))
        .ctx("insert row", table)?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_row(conn: &Connection, table: &str, fields: &FieldMap) -> GridResult<i64> {
    let (table, columns) = known_columns(conn, table)?;
    let id = insert_with_columns(conn, &table, &columns, fields)?;
    debug!(table = %table, id, "row inserted");
    Ok(id)
}

/// Sparse update; `updated_at` is refreshed whenever something is written.
/// Returns whether a row was changed.
pub fn update_row(conn: &Connection, table: &str, id: i64, fields: &FieldMap) -> GridResult<bool> {
    let (table, columns) = known_columns(conn, table)?;
    if fields.is_empty() {
        return Ok(false);
    }
    let prepared = prepare_values(&columns, fields, WriteMode::Update)?;
    if prepared.is_empty() {
        return Ok(false);
    }
    let mut sets: Vec<String> = prepared.iter().map(|(n, _)| format!("{} = ?", quote(n))).collect();
    sets.push(format!("{} = CURRENT_TIMESTAMP", quote(UPDATED_AT_COLUMN)));
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quote(&table),
        sets.join(", "),
        quote(ID_COLUMN)
    );
    let mut params: Vec<Value> = prepared.into_iter().map(|(_, v)| v).collect();
    params.push(Value::Integer(id));
    let changed = conn
        .prepare_cached(&sql)
        .ctx("update row", &table)?
        .execute(params_from_iter(params.iter()))
        .ctx("update row", &table)?;
    Ok(changed > 0)
}

/// Deleting a missing id is not an error.
pub fn delete_row(conn: &Connection, table: &str, id: i64) -> GridResult<usize> {
    delete_rows(conn, table, &[id])
}

/// Delete a set of ids in one statement. Returns the number removed.
pub fn delete_rows(conn: &Connection, table: &str, ids: &[i64]) -> GridResult<usize> {
    let (table, _) = known_columns(conn, table)?;
    if ids.is_empty() {
        return Ok(0);
    }
    let marks = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "DELETE FROM {} WHERE {} IN ({marks})",
        quote(&table),
        quote(ID_COLUMN)
    );
    conn.execute(&sql, params_from_iter(ids.iter()))
        .ctx("delete rows", &table)
}

/// Map a stored cell back to a value. Booleans are stored as 0/1.
pub fn decode_cell(hint: TypeHint, cell: ValueRef<'_>) -> Value {
    match (hint, cell) {
        (TypeHint::Boolean, ValueRef::Integer(i)) => Value::Bool(i != 0),
        (_, cell) => Value::from_sql_ref(cell),
    }
}

/// Everything a row select needs besides the table name.
pub struct RowSelect<'a> {
    pub columns: &'a [ColumnDefinition],
    pub filter: &'a FilterClause,
    pub order: &'a str,
    /// `[limit, offset]`, or every matching row.
    pub page: Option<[i64; 2]>,
    pub include_timestamps: bool,
}

pub fn select_rows(conn: &Connection, table: &str, select: &RowSelect<'_>) -> GridResult<Vec<Row>> {
    let mut names = vec![quote(ID_COLUMN)];
    names.extend(select.columns.iter().map(|c| quote(&c.name)));
    if select.include_timestamps {
        names.push(quote(CREATED_AT_COLUMN));
        names.push(quote(UPDATED_AT_COLUMN));
    }
    let mut sql = format!(
        "SELECT {} FROM {}{}{}",
        names.join(", "),
        quote(table),
        select.filter.sql,
        select.order
    );
    let mut params = select.filter.params.clone();
    if let Some([limit, offset]) = select.page {
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(Value::Integer(limit));
        params.push(Value::Integer(offset));
    }

    let hints: Vec<TypeHint> = select.columns.iter().map(column_hint).collect();
    let width = select.columns.len();
    let mut stmt = conn.prepare(&sql).ctx("select rows", table)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            let mut values = FieldMap::new();
            for (i, column) in select.columns.iter().enumerate() {
                values.insert(column.name.clone(), decode_cell(hints[i], row.get_ref(i + 1)?));
            }
            let (created_at, updated_at) = if select.include_timestamps {
                (row.get(width + 1)?, row.get(width + 2)?)
            } else {
                (None, None)
            };
            Ok(Row {
                id: row.get(0)?,
                values,
                created_at,
                updated_at,
            })
        })
        .ctx("select rows", table)?;
    rows.collect::<Result<Vec<_>, _>>().ctx("select rows", table)
}

pub fn count_rows(conn: &Connection, table: &str, filter: &FilterClause) -> GridResult<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}{}", quote(table), filter.sql);
    let count: i64 = conn
        .query_row(&sql, params_from_iter(filter.params.iter()), |row| row.get(0))
        .ctx("count rows", table)?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// One page of rows plus the total matching the same filter.
pub fn query_rows(conn: &Connection, table: &str, options: &QueryOptions) -> GridResult<QueryPage> {
    let (table, columns) = known_columns(conn, table)?;
    let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    let filter = build_filter(options, &names);
    let order = order_clause(options, &names);

    let total = count_rows(conn, &table, &filter)?;
    let rows = select_rows(
        conn,
        &table,
        &RowSelect {
            columns: &columns,
            filter: &filter,
            order: &order,
            page: Some(page_params(options)),
            include_timestamps: options.include_timestamps,
        },
    )?;
    Ok(QueryPage { rows, total })
}
