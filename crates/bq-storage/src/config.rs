//! File persistence configuration.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Configuration for batch file persistence.
///
/// The recency window (`recent_delay_ms`) is the nominal threshold below
/// which a batch file is considered "in use" by the writer. The orchestrator
/// offsets it by ±5% so that the writer stops appending to a file slightly
/// before the uploader starts considering it readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePersistenceConfig {
    /// Nominal recency window in milliseconds.
    pub recent_delay_ms: u64,

    /// Maximum size of a single batch file in bytes.
    pub max_batch_size_bytes: u64,

    /// Maximum size of a single item in bytes.
    pub max_item_size_bytes: u64,

    /// Maximum number of items appended to one batch file.
    pub max_items_per_batch: u64,

    /// Age in milliseconds past which a batch is evicted instead of uploaded.
    pub old_file_threshold_ms: u64,

    /// Total disk budget for batch files in bytes.
    pub max_disk_space_bytes: u64,

    /// Minimum interval between cleanup passes on the write path.
    pub cleanup_frequency_ms: u64,

    /// Bytes written between two items of the same batch (not stored as part
    /// of either item; e.g. b"," for JSON payloads). Empty by default.
    #[serde(default)]
    pub item_separator: Vec<u8>,
}

impl Default for FilePersistenceConfig {
    fn default() -> Self {
        FilePersistenceConfig {
            recent_delay_ms: 5_000,
            max_batch_size_bytes: 4 * 1024 * 1024,
            max_item_size_bytes: 512 * 1024,
            max_items_per_batch: 500,
            old_file_threshold_ms: 18 * 60 * 60 * 1000,
            max_disk_space_bytes: 512 * 1024 * 1024,
            cleanup_frequency_ms: 60_000,
            item_separator: Vec::new(),
        }
    }
}

impl FilePersistenceConfig {
    /// Set the nominal recency window.
    pub fn with_recent_delay_ms(mut self, delay_ms: u64) -> Self {
        self.recent_delay_ms = delay_ms;
        self
    }

    /// Set the maximum batch file size.
    pub fn with_max_batch_size(mut self, bytes: u64) -> Self {
        self.max_batch_size_bytes = bytes;
        self
    }

    /// Set the maximum item count per batch.
    pub fn with_max_items_per_batch(mut self, items: u64) -> Self {
        self.max_items_per_batch = items;
        self
    }

    /// Set the eviction age threshold.
    pub fn with_old_file_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.old_file_threshold_ms = threshold_ms;
        self
    }

    /// Set the total disk budget.
    pub fn with_max_disk_space(mut self, bytes: u64) -> Self {
        self.max_disk_space_bytes = bytes;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.recent_delay_ms == 0 {
            return Err(StorageError::InvalidConfig(
                "recent_delay_ms must be > 0".to_string(),
            ));
        }
        if self.max_batch_size_bytes == 0 || self.max_item_size_bytes == 0 {
            return Err(StorageError::InvalidConfig(
                "batch and item size limits must be > 0".to_string(),
            ));
        }
        if self.max_item_size_bytes > self.max_batch_size_bytes {
            return Err(StorageError::InvalidConfig(format!(
                "max_item_size_bytes ({}) exceeds max_batch_size_bytes ({})",
                self.max_item_size_bytes, self.max_batch_size_bytes
            )));
        }
        if self.max_items_per_batch == 0 {
            return Err(StorageError::InvalidConfig(
                "max_items_per_batch must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
