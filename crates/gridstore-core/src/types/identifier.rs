//! Identifier rules for table and column names.
//!
//! Identifiers cannot be bound as parameters, so names are restricted up
//! front rather than escaped. Validated names are emitted double-quoted.

use crate::constants::{is_housekeeping, COLUMN_CATALOG, MAX_IDENTIFIER_LEN, TABLE_CATALOG};
use crate::errors::{GridError, GridResult};

fn is_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || (!c.is_ascii() && c.is_alphabetic())
}

fn is_continue_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || (!c.is_ascii() && c.is_alphanumeric())
}

fn invalid(name: &str, reason: &'static str) -> GridError {
    GridError::InvalidIdentifier {
        name: name.to_string(),
        reason,
    }
}

/// Check the character allowlist and length.
pub fn validate_identifier(name: &str) -> GridResult<()> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid(name, "empty")),
        Some(c) if !is_start_char(c) => {
            return Err(invalid(name, "must start with a letter or underscore"))
        }
        Some(_) => {}
    }
    if !chars.all(is_continue_char) {
        return Err(invalid(name, "only letters, digits and underscores are allowed"));
    }
    if name.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(invalid(name, "too long"));
    }
    Ok(())
}

pub fn validate_table_name(name: &str) -> GridResult<()> {
    if name.trim().is_empty() {
        return Err(GridError::EmptyTableName);
    }
    validate_identifier(name)?;
    let lower = name.to_ascii_lowercase();
    if lower.starts_with("sqlite_") {
        return Err(invalid(name, "reserved prefix"));
    }
    if lower == TABLE_CATALOG || lower == COLUMN_CATALOG {
        return Err(invalid(name, "reserved for the catalog"));
    }
    Ok(())
}

pub fn validate_column_name(name: &str) -> GridResult<()> {
    if name.trim().is_empty() {
        return Err(GridError::EmptyFieldName);
    }
    validate_identifier(name)?;
    if is_housekeeping(name) {
        return Err(invalid(name, "reserved housekeeping column"));
    }
    Ok(())
}

/// Double-quote a validated identifier for SQL text.
pub fn quote(name: &str) -> String {
    format!("\"{name}\"")
}
