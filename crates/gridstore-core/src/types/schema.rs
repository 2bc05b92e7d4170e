//! Logical table and column definitions.

use serde::{Deserialize, Serialize};

use super::type_hint::TypeHint;

/// One declared column of a managed table. Columns are nullable unless
/// declared otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnDefinition {
    pub name: String,
    /// Previous name, used by schema updates to express a rename.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,
    /// Ordered display aliases. The first one heads exports.
    pub labels: Vec<String>,
    /// The hint as the user wrote it, e.g. "decimal" or "数值".
    pub type_hint: String,
    pub allow_null: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Default for ColumnDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            old_name: None,
            labels: Vec::new(),
            type_hint: String::new(),
            allow_null: true,
            default: None,
        }
    }
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: type_hint.into(),
            ..Self::default()
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn required(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn renamed_from(mut self, old_name: impl Into<String>) -> Self {
        self.old_name = Some(old_name.into());
        self
    }

    /// Parsed category; `None` when the hint is unrecognized.
    pub fn hint(&self) -> Option<TypeHint> {
        TypeHint::parse(&self.type_hint)
    }

    /// First non-empty label, falling back to the column name.
    pub fn header(&self) -> &str {
        self.labels
            .first()
            .map(String::as_str)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.name)
    }
}

/// A managed table's logical schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TableSchema {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub fields: Vec<ColumnDefinition>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, fields: Vec<ColumnDefinition>) -> Self {
        Self {
            name: name.into(),
            fields,
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn field(&self, name: &str) -> Option<&ColumnDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}
