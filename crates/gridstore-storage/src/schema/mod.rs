//! Table migration engine: physical DDL for managed tables, kept in step
//! with the catalog.

pub mod alter;
pub mod create;
pub mod ddl;
pub mod update;
pub mod validate;

pub use alter::{add_columns, drop_columns, rename_columns, rename_table};
pub use create::{check_schema, clear_table, create_table, drop_table};
pub use update::{plan_update, update_table, UpdatePlan};
