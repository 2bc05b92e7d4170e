//! SQL-building and row-level query modules.

pub mod export;
pub mod filter;
pub mod rows;
pub mod summary;

pub use export::{export_csv, export_rows, export_xlsx};
pub use filter::{build_filter, order_clause, FilterClause};
pub use rows::{delete_row, delete_rows, insert_row, query_rows, update_row};
pub use summary::summarize_column;
