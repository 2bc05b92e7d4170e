pub mod error_code;
mod grid_error;

pub use error_code::GridErrorCode;
pub use grid_error::{GridError, GridResult, StorageContext};
