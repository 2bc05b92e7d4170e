//! Semantic column categories and their physical storage types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A semantic, localized column category. Each maps to exactly one
/// physical storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeHint {
    Text,
    Integer,
    Decimal,
    Boolean,
    DateTime,
}

/// Physical SQLite storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Text,
    Integer,
    Real,
}

impl StorageType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }

    /// Map an engine-declared column type back to a storage type.
    /// Follows SQLite's affinity rules closely enough for managed tables.
    pub fn from_declared(decl: &str) -> Self {
        let upper = decl.to_ascii_uppercase();
        if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Self::Real
        } else {
            Self::Text
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl TypeHint {
    /// Parse a user-supplied hint, case-insensitively. `None` for
    /// unrecognized hints.
    pub fn parse(hint: &str) -> Option<Self> {
        let h = hint.trim().to_lowercase();
        let parsed = match h.as_str() {
            "text" | "string" | "长文本" | "短文本" => Self::Text,
            "number" | "decimal" | "float" | "数值" | "浮点" => Self::Decimal,
            // 布尔 is the legacy boolean-as-integer hint.
            "integer" | "int" | "count" | "计数" | "布尔" => Self::Integer,
            "boolean" | "bool" | "是/否" => Self::Boolean,
            "date" | "datetime" | "日期" | "时间" => Self::DateTime,
            _ => return None,
        };
        Some(parsed)
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::Text | Self::DateTime => StorageType::Text,
            Self::Integer | Self::Boolean => StorageType::Integer,
            Self::Decimal => StorageType::Real,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }

    /// Canonical English hint string.
    pub fn canonical(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive_and_trimmed() {
        assert_eq!(TypeHint::parse("TEXT"), Some(TypeHint::Text));
        assert_eq!(TypeHint::parse("  Decimal "), Some(TypeHint::Decimal));
        assert_eq!(TypeHint::parse("Bool"), Some(TypeHint::Boolean));
    }

    #[test]
    fn test_localized_hints() {
        assert_eq!(TypeHint::parse("数值"), Some(TypeHint::Decimal));
        assert_eq!(TypeHint::parse("计数"), Some(TypeHint::Integer));
        assert_eq!(TypeHint::parse("布尔"), Some(TypeHint::Integer));
        assert_eq!(TypeHint::parse("是/否"), Some(TypeHint::Boolean));
        assert_eq!(TypeHint::parse("日期"), Some(TypeHint::DateTime));
        assert_eq!(TypeHint::parse("长文本"), Some(TypeHint::Text));
    }

    #[test]
    fn test_storage_mapping() {
        assert_eq!(TypeHint::Text.storage_type(), StorageType::Text);
        assert_eq!(TypeHint::DateTime.storage_type(), StorageType::Text);
        assert_eq!(TypeHint::Decimal.storage_type(), StorageType::Real);
        assert_eq!(TypeHint::Integer.storage_type(), StorageType::Integer);
        assert_eq!(TypeHint::Boolean.storage_type(), StorageType::Integer);
    }

    #[test]
    fn test_unknown_hint() {
        assert_eq!(TypeHint::parse("blob"), None);
        assert_eq!(TypeHint::parse(""), None);
    }

    #[test]
    fn test_from_declared() {
        assert_eq!(StorageType::from_declared("INTEGER"), StorageType::Integer);
        assert_eq!(StorageType::from_declared("real"), StorageType::Real);
        assert_eq!(StorageType::from_declared("DATETIME"), StorageType::Text);
        assert_eq!(StorageType::from_declared(""), StorageType::Text);
    }
}
