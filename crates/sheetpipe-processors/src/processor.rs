//! Row processor capability.
//!
//! A processor is a pure transform over one row's header -> value mapping:
//! no store or cache handles are reachable from its signature, and the
//! engine persists exactly what it returns (possibly the input unchanged).

use std::fmt::Debug;

/// Ordered header -> value mapping of one spreadsheet row.
pub type RowMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("invalid value in column '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// Trait all row processors implement.
pub trait RowProcessor: Send + Sync + Debug {
    /// Processor name, for logs.
    fn name(&self) -> &str;

    /// Transform one row. Returning the input unchanged is valid.
    fn process_row(&self, row_data: &RowMap) -> Result<RowMap, ProcessingError>;
}
