//! Error types for the persistence layer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors from batch store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("item of {size} bytes exceeds the per-item limit of {max} bytes")]
    ItemTooLarge { size: u64, max: u64 },

    #[error("batch root is not a writable directory: {0}")]
    InvalidRoot(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
