//! The engine-wide error type.

use super::error_code::{self, GridErrorCode};

/// Errors returned by every gridstore operation.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("table name is required")]
    EmptyTableName,

    #[error("at least one field is required")]
    EmptyFieldSet,

    #[error("field name is required")]
    EmptyFieldName,

    #[error("duplicate field: {name}")]
    DuplicateField { name: String },

    #[error("invalid identifier {name:?}: {reason}")]
    InvalidIdentifier { name: String, reason: &'static str },

    #[error("table already exists: {table}")]
    TableExists { table: String },

    #[error("column {column} is not nullable and needs a default to be added")]
    NotNullWithoutDefault { column: String },

    #[error("unsupported type {type_hint:?} for column {column}")]
    UnsupportedType { column: String, type_hint: String },

    #[error("column {column} cannot change type from {from:?} to {to:?}")]
    TypeChangeForbidden {
        column: String,
        from: String,
        to: String,
    },

    #[error("field {column} is required")]
    MissingRequiredField { column: String },

    #[error("field {column}: expected {expected}, got {value:?}")]
    InvalidValue {
        column: String,
        expected: &'static str,
        value: String,
    },

    #[error("unknown columns: {}", .columns.join(", "))]
    UnknownColumns { columns: Vec<String> },

    #[error("unknown table: {table}")]
    UnknownTable { table: String },

    #[error("unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("column {column} is of type {type_hint:?}, not numeric")]
    UnsupportedColumnType { column: String, type_hint: String },

    #[error("import source error: {reason}")]
    ImportSource { reason: String },

    #[error("import stopped at row {row} after {inserted} rows: {source}")]
    ImportAborted {
        inserted: usize,
        row: usize,
        #[source]
        source: Box<GridError>,
    },

    #[error("export failed: {reason}")]
    Export { reason: String },

    #[error("storage failure during {operation} on {target}: {message}")]
    StorageFailure {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error("config error: {0}")]
    Config(String),
}

pub type GridResult<T> = Result<T, GridError>;

impl GridError {
    /// Rows committed before the failure, for import errors.
    pub fn inserted_before_failure(&self) -> usize {
        match self {
            Self::ImportAborted { inserted, .. } => *inserted,
            _ => 0,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.error_code() == error_code::VALIDATION_ERROR
    }
}

impl GridErrorCode for GridError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyTableName
            | Self::EmptyFieldSet
            | Self::EmptyFieldName
            | Self::DuplicateField { .. }
            | Self::InvalidIdentifier { .. }
            | Self::TableExists { .. }
            | Self::NotNullWithoutDefault { .. } => error_code::VALIDATION_ERROR,
            Self::UnsupportedType { .. } => error_code::UNSUPPORTED_TYPE,
            Self::TypeChangeForbidden { .. } => error_code::TYPE_CHANGE_FORBIDDEN,
            Self::MissingRequiredField { .. } => error_code::MISSING_REQUIRED_FIELD,
            Self::InvalidValue { .. } => error_code::INVALID_VALUE,
            Self::UnknownColumns { .. } => error_code::UNKNOWN_COLUMNS,
            Self::UnknownTable { .. } => error_code::UNKNOWN_TABLE,
            Self::UnknownColumn { .. } => error_code::UNKNOWN_COLUMN,
            Self::UnsupportedColumnType { .. } => error_code::UNSUPPORTED_COLUMN_TYPE,
            Self::ImportSource { .. } => error_code::IMPORT_FAILED,
            Self::ImportAborted { source, .. } => source.error_code(),
            Self::Export { .. } => error_code::EXPORT_FAILED,
            Self::StorageFailure { .. } => error_code::STORAGE_FAILURE,
            Self::Config(_) => error_code::CONFIG_ERROR,
        }
    }
}

impl From<rusqlite::Error> for GridError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StorageFailure {
            operation: "sqlite",
            target: String::new(),
            message: e.to_string(),
        }
    }
}

/// Attaches operation/table context to raw SQLite results.
pub trait StorageContext<T> {
    fn ctx(self, operation: &'static str, target: &str) -> GridResult<T>;
}

impl<T> StorageContext<T> for Result<T, rusqlite::Error> {
    fn ctx(self, operation: &'static str, target: &str) -> GridResult<T> {
        self.map_err(|e| GridError::StorageFailure {
            operation,
            target: target.to_string(),
            message: e.to_string(),
        })
    }
}
