pub mod identifier;
pub mod query;
pub mod schema;
pub mod summary;
pub mod type_hint;
pub mod value;

pub use query::{
    ExportFile, ExportFormat, ExportRequest, ImportOptions, QueryOptions, QueryPage, Row,
};
pub use schema::{ColumnDefinition, TableSchema};
pub use summary::{ColumnSummary, SummaryStats};
pub use type_hint::{StorageType, TypeHint};
pub use value::{FieldMap, Value};
