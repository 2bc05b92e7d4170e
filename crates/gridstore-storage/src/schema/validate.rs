//! Field checks shared by create, add and update.

use std::collections::HashSet;

use gridstore_core::coercion::coerce_column;
use gridstore_core::errors::{GridError, GridResult};
use gridstore_core::types::identifier::validate_column_name;
use gridstore_core::types::{ColumnDefinition, TypeHint, Value};

use super::ddl::{column_ddl, default_literal};

/// A field that passed validation, normalized for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedField {
    pub def: ColumnDefinition,
    pub hint: TypeHint,
    /// The declared default in its stored form.
    pub default: Option<Value>,
}

impl CheckedField {
    /// DEFAULT clause text for the stored form: `1`/`0` for booleans,
    /// canonical numbers for numeric hints.
    pub fn default_sql(&self) -> Option<String> {
        self.default.as_ref().map(|value| match value {
            Value::Bool(b) => i64::from(*b).to_string(),
            other => default_literal(&other.to_text()),
        })
    }

    pub fn ddl(&self) -> String {
        let default = self.default_sql();
        column_ddl(
            &self.def.name,
            self.hint.storage_type(),
            !self.def.allow_null,
            default.as_deref(),
        )
    }
}

pub fn parse_hint(column: &str, type_hint: &str) -> GridResult<TypeHint> {
    TypeHint::parse(type_hint).ok_or_else(|| GridError::UnsupportedType {
        column: column.to_string(),
        type_hint: type_hint.to_string(),
    })
}

/// Normalize and check one field definition.
///
/// Trims the name and hint, drops a blank default, and checks that a
/// declared default is acceptable for the hint.
pub fn check_field(field: &ColumnDefinition) -> GridResult<CheckedField> {
    let name = field.name.trim();
    validate_column_name(name)?;
    let type_hint = field.type_hint.trim();
    let hint = parse_hint(name, type_hint)?;
    let default = field
        .default
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string);
    let stored_default = default
        .as_deref()
        .map(|d| coerce_column(name, hint, &Value::from(d)))
        .transpose()?;
    Ok(CheckedField {
        def: ColumnDefinition {
            name: name.to_string(),
            old_name: None,
            labels: field.labels.clone(),
            type_hint: type_hint.to_string(),
            allow_null: field.allow_null,
            default,
        },
        hint,
        default: stored_default,
    })
}

/// A field added to a table that may already hold rows.
pub fn check_added_field(field: &ColumnDefinition) -> GridResult<CheckedField> {
    let checked = check_field(field)?;
    if !checked.def.allow_null && checked.def.default.is_none() {
        return Err(GridError::NotNullWithoutDefault {
            column: checked.def.name,
        });
    }
    Ok(checked)
}

/// Reject names that repeat, ignoring ASCII case.
pub fn check_unique<'a>(names: impl IntoIterator<Item = &'a str>) -> GridResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(GridError::DuplicateField {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
