//! # gridstore-storage
//!
//! SQLite persistence for gridstore: WAL-mode connection management,
//! catalog migrations, schema evolution of managed tables, row access,
//! import reconciliation and export.

pub mod catalog;
pub mod connection;
pub mod engine;
pub mod import;
pub mod introspect;
pub mod migrations;
pub mod queries;
pub mod schema;

pub use connection::DatabaseManager;
pub use engine::GridStorageEngine;
