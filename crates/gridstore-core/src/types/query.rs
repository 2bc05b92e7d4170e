//! Per-request query, export and import options and their results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value::FieldMap;
use crate::constants::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};

/// Search, filter, sort and paging for one read. Constructed per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QueryOptions {
    /// Substring matched against every known column.
    pub search: String,
    /// Column → substring. Unknown columns are ignored.
    pub filters: BTreeMap<String, String>,
    /// 1-based; 0 means the default.
    pub page: u32,
    /// 0 means the default.
    pub page_size: u32,
    pub sort_by: String,
    #[serde(alias = "desc")]
    pub sort_desc: bool,
    /// Also return `created_at` / `updated_at`.
    pub include_timestamps: bool,
}

impl QueryOptions {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    pub fn effective_page(&self) -> u32 {
        self.page.max(DEFAULT_PAGE)
    }

    pub fn effective_page_size(&self) -> u32 {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.effective_page() - 1) * u64::from(self.effective_page_size())
    }
}

/// One stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: i64,
    #[serde(flatten)]
    pub values: FieldMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A page of rows plus the size of the filtered population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QueryPage {
    pub rows: Vec<Row>,
    pub total: u64,
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Single-sheet workbook with typed cells.
    #[default]
    Xlsx,
    /// UTF-8 CSV with a BOM.
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

/// What to export. A non-empty `ids` wins over filters; `all` disables paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportRequest {
    pub options: QueryOptions,
    pub ids: Vec<i64>,
    pub all: bool,
    pub format: ExportFormat,
}

impl ExportRequest {
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    pub fn ids(ids: Vec<i64>) -> Self {
        Self {
            ids,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn is_paged(&self) -> bool {
        !self.all && self.ids.is_empty()
    }
}

/// A rendered export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// How import headers are reconciled against columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ImportOptions {
    /// Discard values under unresolved headers instead of rejecting.
    /// `None` defers to the configured default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unknown: Option<bool>,
    /// Header → column, checked before names and labels.
    pub aliases: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_defaults_and_clamps() {
        let opts = QueryOptions::default();
        assert_eq!(opts.effective_page(), 1);
        assert_eq!(opts.effective_page_size(), 20);
        assert_eq!(opts.offset(), 0);

        let opts = QueryOptions::page(3, 10);
        assert_eq!(opts.offset(), 20);
    }

    #[test]
    fn test_desc_alias() {
        let opts: QueryOptions = serde_json::from_str(r#"{"sort_by":"age","desc":true}"#).unwrap();
        assert!(opts.sort_desc);
    }

    #[test]
    fn test_export_request_paging() {
        assert!(ExportRequest::default().is_paged());
        assert!(!ExportRequest::all().is_paged());
        assert!(!ExportRequest::ids(vec![1]).is_paged());
    }

    #[test]
    fn test_export_format_defaults_to_workbook() {
        assert_eq!(ExportRequest::all().format, ExportFormat::Xlsx);
        let req: ExportRequest = serde_json::from_str(r#"{"all":true,"format":"csv"}"#).unwrap();
        assert_eq!(req.format.extension(), "csv");
    }
}
