pub mod table_store;

pub use table_store::{CatalogDrift, HealthReport, ITableStore};
