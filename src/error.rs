//! Error types shared by every pipeline stage.
//!
//! Only whole-table problems are errors. A metric that cannot be computed for
//! a group (standard deviation of a single rating, a ratio over zero orders)
//! is a `ColumnValue::Null` cell, and a selection that matches nothing is an
//! empty table.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source file is missing, unreadable, or has no header row.
    #[error("data unavailable at {path}: {reason}")]
    DataUnavailable { path: PathBuf, reason: String },

    /// An operation referenced a column the table does not have.
    #[error("column '{column}' is required by {operation} but is not present")]
    SchemaMismatch { column: String, operation: String },

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn schema_mismatch(column: impl Into<String>, operation: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            column: column.into(),
            operation: operation.into(),
        }
    }

    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::DataUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors the presentation layer should render as
    /// "not available" for one view while sibling views keep rendering.
    pub fn is_view_local(&self) -> bool {
        matches!(self, Error::SchemaMismatch { .. } | Error::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
