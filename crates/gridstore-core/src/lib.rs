//! # gridstore-core
//!
//! Foundation crate for the gridstore engine.
//! Defines types, the store trait, errors, config, value coercion,
//! identifier rules and tracing setup. The storage crate depends on this.

pub mod coercion;
pub mod config;
pub mod constants;
pub mod errors;
pub mod tracing;
pub mod traits;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::GridConfig;
pub use errors::{GridError, GridErrorCode, GridResult};
pub use traits::ITableStore;
pub use types::{
    ColumnDefinition, ColumnSummary, FieldMap, QueryOptions, QueryPage, Row, TableSchema,
    TypeHint, Value,
};
