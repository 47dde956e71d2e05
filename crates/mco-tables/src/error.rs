//! Error types for table loading and decoding.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or decoding table files.
#[derive(Debug, Error)]
pub enum TableError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// File exceeds the maximum size accepted for a table file.
    #[error("table file {path} is too large ({size} bytes, limit {limit})")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    /// Failed to list a table directory.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structural inconsistency in a table file.
    #[error("malformed binary table file '{file}': {reason}")]
    Malformed { file: String, reason: String },

    /// Value that the file format cannot represent.
    #[error("cannot encode table: {reason}")]
    Encode { reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

impl TableError {
    /// Create a Malformed error.
    pub fn malformed(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create an Encode error.
    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }
}

/// Return a [`TableError::Malformed`] naming the violated condition unless it holds.
///
/// ```ignore
/// ensure_table!(file, table.sections.len() == 1);
/// ```
macro_rules! ensure_table {
    ($file:expr, $cond:expr) => {
        if !($cond) {
            return Err($crate::error::TableError::malformed(
                $file,
                concat!("expected ", stringify!($cond)),
            ));
        }
    };
}

pub(crate) use ensure_table;
