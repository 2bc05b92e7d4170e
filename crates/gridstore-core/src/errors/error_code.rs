//! Stable error codes for the outer API layer.

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const UNSUPPORTED_TYPE: &str = "UNSUPPORTED_TYPE";
pub const TYPE_CHANGE_FORBIDDEN: &str = "TYPE_CHANGE_FORBIDDEN";
pub const MISSING_REQUIRED_FIELD: &str = "MISSING_REQUIRED_FIELD";
pub const INVALID_VALUE: &str = "INVALID_VALUE";
pub const UNKNOWN_COLUMNS: &str = "UNKNOWN_COLUMNS";
pub const UNKNOWN_TABLE: &str = "UNKNOWN_TABLE";
pub const UNKNOWN_COLUMN: &str = "UNKNOWN_COLUMN";
pub const UNSUPPORTED_COLUMN_TYPE: &str = "UNSUPPORTED_COLUMN_TYPE";
pub const IMPORT_FAILED: &str = "IMPORT_FAILED";
pub const EXPORT_FAILED: &str = "EXPORT_FAILED";
pub const STORAGE_FAILURE: &str = "STORAGE_FAILURE";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";

/// Maps an error to a stable, machine-readable code.
pub trait GridErrorCode {
    fn error_code(&self) -> &'static str;
}
