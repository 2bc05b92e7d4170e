//! Query/filter builder: parameterized WHERE, ORDER BY and paging clauses.
//!
//! Column names are only ever taken from the known-column list passed in;
//! user input reaches SQL as bound parameters.

use gridstore_core::constants::ID_COLUMN;
use gridstore_core::types::identifier::quote;
use gridstore_core::types::{QueryOptions, Value};

/// A WHERE clause (possibly empty) and its positional parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterClause {
    /// Empty, or ` WHERE ...` with a leading space.
    pub sql: String,
    pub params: Vec<Value>,
}

impl FilterClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Escape LIKE wildcards so the term matches literally.
fn like_pattern(term: &str) -> Value {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Value::Text(escaped)
}

fn like(column: &str) -> String {
    format!("{} LIKE ? ESCAPE '\\'", quote(column))
}

/// Build the WHERE clause for search and per-column filters.
///
/// - search: OR of substring matches over every known column
/// - filters: one AND-ed substring match per known column; others ignored
/// - blank terms are ignored
pub fn build_filter(options: &QueryOptions, known_columns: &[String]) -> FilterClause {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    let search = options.search.trim();
    if !search.is_empty() && !known_columns.is_empty() {
        let any: Vec<String> = known_columns.iter().map(|c| like(c)).collect();
        conditions.push(format!("({})", any.join(" OR ")));
        params.extend(known_columns.iter().map(|_| like_pattern(search)));
    }

    for (column, term) in &options.filters {
        if term.trim().is_empty() || !known_columns.iter().any(|k| k == column) {
            continue;
        }
        conditions.push(like(column));
        params.push(like_pattern(term.trim()));
    }

    if conditions.is_empty() {
        return FilterClause::default();
    }
    FilterClause {
        sql: format!(" WHERE {}", conditions.join(" AND ")),
        params,
    }
}

/// `WHERE "id" IN (?, ...)` for an explicit id set.
pub fn id_filter(ids: &[i64]) -> FilterClause {
    if ids.is_empty() {
        return FilterClause::default();
    }
    let marks = vec!["?"; ids.len()].join(", ");
    FilterClause {
        sql: format!(" WHERE {} IN ({marks})", quote(ID_COLUMN)),
        params: ids.iter().map(|id| Value::Integer(*id)).collect(),
    }
}

/// ORDER BY over a known column, or newest-first by id.
/// Ties break on id in the same direction so pages are stable.
pub fn order_clause(options: &QueryOptions, known_columns: &[String]) -> String {
    let sort = options.sort_by.trim();
    if !sort.is_empty() && known_columns.iter().any(|k| k == sort) {
        let dir = if options.sort_desc { "DESC" } else { "ASC" };
        format!(" ORDER BY {} {dir}, {} {dir}", quote(sort), quote(ID_COLUMN))
    } else {
        format!(" ORDER BY {} DESC", quote(ID_COLUMN))
    }
}

/// `LIMIT ? OFFSET ?` parameters for the requested page.
pub fn page_params(options: &QueryOptions) -> [i64; 2] {
    let limit = i64::from(options.effective_page_size());
    let offset = i64::try_from(options.offset()).unwrap_or(i64::MAX);
    [limit, offset]
}
