//! Batch lease identity.
//!
//! A [`BatchId`] is handed out when a batch file is checked out for upload.
//! It is deliberately not `Clone`: confirming a batch consumes the token by
//! value, so a double-confirm (and with it a double-delete) is a compile
//! error rather than a runtime bug.

use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Opaque lease token for a batch file checked out for upload.
///
/// Exactly one unconfirmed `BatchId` may reference a given batch file; the
/// storage layer will not lease the same file twice. The token must be given
/// back via the storage confirm call, which consumes it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct BatchId {
    path: PathBuf,
    lease: Uuid,
}

impl BatchId {
    /// Create a lease token for the given batch file path.
    ///
    /// Only the storage layer should call this; producers and uploaders
    /// treat the token as opaque.
    pub fn new(path: PathBuf) -> Self {
        BatchId {
            path,
            lease: Uuid::new_v4(),
        }
    }

    /// Path of the leased batch file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the leased batch file, if representable as UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}",
            self.file_name().unwrap_or("<non-utf8>"),
            self.lease
        )
    }
}
