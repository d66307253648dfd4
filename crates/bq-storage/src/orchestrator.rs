//! Batch file orchestrator.
//!
//! Decides which file the single writer appends to (reuse vs. rotate) and
//! which file the uploader may read next, and enforces the age threshold and
//! disk budget through eviction.
//!
//! The writer-side and reader-side recency checks use thresholds offset ±5%
//! from the nominal window: the writer stops considering a file fresh
//! slightly before the reader starts considering it idle, so the two never
//! contend over the same file without any locking.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bq_common::Clock;
use tracing::{debug, error, warn};

use crate::config::FilePersistenceConfig;
use crate::error::StorageError;
use crate::file;

/// Writer-side recency factor (fresh slightly shorter than nominal).
const DECREASE_PERCENT: f64 = 0.95;

/// Reader-side recency factor (idle slightly longer than nominal).
const INCREASE_PERCENT: f64 = 1.05;

/// The single-slot cache of the file the writer last appended to.
///
/// The item count only lives in memory; it is trusted only while this
/// handle still points at the newest file on disk.
#[derive(Debug, Clone)]
struct CurrentFile {
    path: PathBuf,
    item_count: u64,
}

/// Orchestrates batch files under one root directory.
pub struct BatchFileOrchestrator {
    root_dir: PathBuf,
    config: FilePersistenceConfig,
    clock: Arc<dyn Clock>,
    recent_read_delay_ms: u64,
    recent_write_delay_ms: u64,
    current: Option<CurrentFile>,
    last_cleanup_ms: u64,
}

impl BatchFileOrchestrator {
    /// Create an orchestrator for `root_dir`. The directory is created
    /// lazily on the first write.
    pub fn new(root_dir: PathBuf, config: FilePersistenceConfig, clock: Arc<dyn Clock>) -> Self {
        let recent_read_delay_ms = (config.recent_delay_ms as f64 * INCREASE_PERCENT).round() as u64;
        let recent_write_delay_ms =
            (config.recent_delay_ms as f64 * DECREASE_PERCENT).round() as u64;
        BatchFileOrchestrator {
            root_dir,
            config,
            clock,
            recent_read_delay_ms,
            recent_write_delay_ms,
            current: None,
            last_cleanup_ms: 0,
        }
    }

    /// Root directory of this orchestrator.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Path of the metadata sidecar for `batch`.
    pub fn metadata_path(&self, batch: &Path) -> PathBuf {
        file::metadata_path(&self.root_dir, batch)
    }

    /// Bytes written between two items of the same batch.
    pub fn config_separator(&self) -> &[u8] {
        &self.config.item_separator
    }

    /// Return the file the writer should append `item_size` bytes to next.
    ///
    /// Reuses the newest file while it is still known to this writer, fresh
    /// per the write window, within the size limit, and within the item
    /// budget; otherwise rotates to a new timestamp-named file.
    pub fn get_writable_file(&mut self, item_size: u64) -> Result<PathBuf, StorageError> {
        if item_size > self.config.max_item_size_bytes {
            return Err(StorageError::ItemTooLarge {
                size: item_size,
                max: self.config.max_item_size_bytes,
            });
        }

        self.ensure_root()?;

        let now = self.clock.now_ms();
        if now.saturating_sub(self.last_cleanup_ms) > self.config.cleanup_frequency_ms {
            let files = self.delete_obsolete_files(file::list_batch_files(&self.root_dir));
            self.free_space_if_needed(&files);
            self.last_cleanup_ms = now;
        }

        if let Some(path) = self.reusable_writable_file(item_size) {
            return Ok(path);
        }
        self.create_new_file()
    }

    /// Return the oldest batch file that is idle enough to upload and not in
    /// `exclude`, evicting obsolete files along the way.
    pub fn get_readable_file(&mut self, exclude: &HashSet<String>) -> Option<PathBuf> {
        if !self.root_dir.is_dir() {
            return None;
        }

        let files = self.delete_obsolete_files(file::list_batch_files(&self.root_dir));
        self.last_cleanup_ms = self.clock.now_ms();

        files.into_iter().find(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            !exclude.contains(name) && !self.is_recent(path, self.recent_read_delay_ms)
        })
    }

    /// All batch files, oldest first, regardless of recency. Used by the
    /// shutdown flush path, which runs when no further writes are expected.
    pub fn get_flushable_files(&self) -> Vec<PathBuf> {
        file::list_batch_files(&self.root_dir)
    }

    /// Forget the cached current-file slot.
    ///
    /// Called after a consent migration moved the directory out from under
    /// this orchestrator; the next write then starts a fresh file instead of
    /// trusting a stale item count.
    pub fn reset_current_file(&mut self) {
        self.current = None;
    }

    fn ensure_root(&self) -> Result<(), StorageError> {
        if self.root_dir.is_dir() {
            if fs::metadata(&self.root_dir)?.permissions().readonly() {
                error!("batch root is not writable: {}", self.root_dir.display());
                return Err(StorageError::InvalidRoot(self.root_dir.clone()));
            }
            return Ok(());
        }
        if self.root_dir.exists() {
            error!(
                "batch root exists but is not a directory: {}",
                self.root_dir.display()
            );
            return Err(StorageError::InvalidRoot(self.root_dir.clone()));
        }
        fs::create_dir_all(&self.root_dir)?;
        Ok(())
    }

    fn reusable_writable_file(&mut self, item_size: u64) -> Option<PathBuf> {
        let files = file::list_batch_files(&self.root_dir);
        let last_file = files.last()?.clone();

        let current = self.current.as_ref()?;
        if current.path != last_file || !last_file.exists() {
            // The newest file is not the one this writer last touched:
            // first write of a session, a foreign file, or our file was
            // deleted. The item count is untrustworthy, so rotate.
            return None;
        }

        let is_recent_enough = self.is_recent(&last_file, self.recent_write_delay_ms);
        let has_room = file::file_size(&last_file) + item_size < self.config.max_batch_size_bytes;
        let has_slot = current.item_count < self.config.max_items_per_batch;

        if is_recent_enough && has_room && has_slot {
            if let Some(current) = self.current.as_mut() {
                current.item_count += 1;
            }
            Some(last_file)
        } else {
            None
        }
    }

    fn create_new_file(&mut self) -> Result<PathBuf, StorageError> {
        let mut ts = self.clock.now_ms();
        let mut path = self.root_dir.join(ts.to_string());
        // Two rotations within the same millisecond would collide.
        while path.exists() {
            ts += 1;
            path = self.root_dir.join(ts.to_string());
        }
        fs::File::create(&path)?;
        debug!("rotated to new batch file {}", path.display());
        self.current = Some(CurrentFile {
            path: path.clone(),
            item_count: 1,
        });
        Ok(path)
    }

    fn is_recent(&self, path: &Path, delay_ms: u64) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let file_ts = file::parse_batch_timestamp(name).unwrap_or(0);
        let now = self.clock.now_ms();
        file_ts >= now.saturating_sub(delay_ms)
    }

    /// Delete batches older than the age threshold; returns the survivors.
    fn delete_obsolete_files(&self, files: Vec<PathBuf>) -> Vec<PathBuf> {
        let threshold = self
            .clock
            .now_ms()
            .saturating_sub(self.config.old_file_threshold_ms);

        files
            .into_iter()
            .filter(|path| {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                let file_ts = file::parse_batch_timestamp(name).unwrap_or(0);
                if file_ts < threshold {
                    debug!("evicting obsolete batch file {}", path.display());
                    // An undeleted file is retried on the next pass.
                    file::delete_batch(&self.root_dir, path);
                    false
                } else {
                    true
                }
            })
            .collect()
    }

    /// Delete oldest batches until total size fits the disk budget.
    fn free_space_if_needed(&self, files: &[PathBuf]) {
        let size_on_disk: u64 = files.iter().map(|p| file::file_size(p)).sum();
        let max_disk_space = self.config.max_disk_space_bytes;
        if size_on_disk <= max_disk_space {
            return;
        }

        let mut to_free = size_on_disk - max_disk_space;
        error!(
            "batch store over disk budget ({}/{} bytes): freeing {} bytes",
            size_on_disk, max_disk_space, to_free
        );
        for path in files {
            if to_free == 0 {
                break;
            }
            let size = file::file_size(path);
            if file::delete_batch(&self.root_dir, path) {
                to_free = to_free.saturating_sub(size);
            } else {
                warn!("could not purge {} for disk budget", path.display());
            }
        }
    }
}
