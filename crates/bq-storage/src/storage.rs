//! Consent-aware storage facade.
//!
//! The facade producers and the uploader share. Writes route to the
//! orchestrator for the active consent state; reads always come from the
//! granted directory, since that is the only uploadable data. Each read
//! leases exactly one batch via a [`BatchId`] that must be confirmed back;
//! an unconfirmed lease never deletes anything, which is what makes delivery
//! at-least-once across crashes.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bq_common::{BatchId, Clock, ConsentState};
use tracing::{debug, info, warn};

use crate::config::FilePersistenceConfig;
use crate::file;
use crate::migration::{resolve_migration, ConsentDirLayout, MigrationStrategy};
use crate::orchestrator::BatchFileOrchestrator;

/// One batch checked out for upload.
///
/// `data` is the raw byte sequence of the batch file: items in write order,
/// joined by the configured separator. Structural decoration (e.g. array
/// brackets) is the uploader's concern and is never stored.
#[derive(Debug)]
pub struct ReadBatch {
    pub id: BatchId,
    pub data: Vec<u8>,
    pub metadata: Option<Vec<u8>>,
}

/// One batch handed to the shutdown flush path, outside the lease protocol.
#[derive(Debug)]
pub struct FlushableBatch {
    pub path: PathBuf,
    pub data: Vec<u8>,
    pub metadata: Option<Vec<u8>>,
}

/// Durable, consent-aware batch storage.
///
/// Single-writer discipline: all calls are expected to come from one writer
/// worker plus one non-overlapping upload task; the facade itself holds no
/// locks (callers wrap it in a mutex when sharing across threads).
pub struct BatchStorage {
    layout: ConsentDirLayout,
    pending: BatchFileOrchestrator,
    granted: BatchFileOrchestrator,
    consent: ConsentState,
    leased: HashSet<String>,
}

impl BatchStorage {
    /// Create storage rooted at `root` with the given initial consent.
    pub fn new(
        root: PathBuf,
        config: FilePersistenceConfig,
        clock: Arc<dyn Clock>,
        initial_consent: ConsentState,
    ) -> Self {
        let layout = ConsentDirLayout::new(root);
        let pending =
            BatchFileOrchestrator::new(layout.pending_dir(), config.clone(), Arc::clone(&clock));
        let granted = BatchFileOrchestrator::new(layout.granted_dir(), config, clock);
        BatchStorage {
            layout,
            pending,
            granted,
            consent: initial_consent,
            leased: HashSet::new(),
        }
    }

    /// Currently active consent state.
    pub fn consent(&self) -> ConsentState {
        self.consent
    }

    /// Append one serialized item (and optionally replace the batch's
    /// metadata sidecar). Returns whether the write landed; I/O failures are
    /// logged and reported as `false`, never propagated to the producer.
    pub fn write_batch(&mut self, item: &[u8], metadata: Option<&[u8]>) -> bool {
        let orchestrator = match self.consent {
            ConsentState::Pending => &mut self.pending,
            ConsentState::Granted => &mut self.granted,
            // Declined data never touches disk; dropping it is a success.
            ConsentState::NotGranted => return true,
        };

        let path = match orchestrator.get_writable_file(item.len() as u64) {
            Ok(path) => path,
            Err(e) => {
                warn!("no writable batch file: {}", e);
                return false;
            }
        };

        let separator = orchestrator.config_separator().to_vec();
        if let Err(e) = file::append_item(&path, item, &separator) {
            warn!("failed to append to batch {}: {}", path.display(), e);
            return false;
        }

        if let Some(metadata) = metadata {
            let meta_path = orchestrator.metadata_path(&path);
            if let Err(e) = write_sidecar(&meta_path, metadata) {
                // The batch itself landed; a lost sidecar degrades, not fails.
                warn!("failed to write sidecar {}: {}", meta_path.display(), e);
            }
        }
        true
    }

    /// Lease the next uploadable batch, if any.
    ///
    /// A leased batch is excluded from further reads until its [`BatchId`]
    /// is confirmed via [`BatchStorage::confirm_batch_read`].
    pub fn read_next_batch(&mut self) -> Option<ReadBatch> {
        let path = self.granted.get_readable_file(&self.leased)?;
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("failed to read batch {}: {}", path.display(), e);
                return None;
            }
        };

        let meta_path = self.granted.metadata_path(&path);
        let metadata = fs::read(&meta_path).ok();

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            self.leased.insert(name.to_string());
        }
        debug!("leased batch {}", path.display());
        Some(ReadBatch {
            id: BatchId::new(path),
            data,
            metadata,
        })
    }

    /// Confirm a leased batch, consuming its lease token.
    ///
    /// `delete` removes the batch file and its sidecar; otherwise the lease
    /// is released and the batch becomes eligible for a later read.
    pub fn confirm_batch_read(&mut self, id: BatchId, delete: bool) {
        if let Some(name) = id.file_name() {
            self.leased.remove(name);
        }
        if delete {
            debug!("deleting confirmed batch {}", id.path().display());
            file::delete_batch(self.granted.root_dir(), id.path());
        }
    }

    /// Apply a consent change, migrating quarantined data as needed.
    pub fn update_consent(&mut self, next: ConsentState) {
        let previous = self.consent;
        if previous == next {
            return;
        }
        let strategy = resolve_migration(previous, next, &self.layout);
        if !matches!(strategy, MigrationStrategy::NoOp) {
            info!("consent changed {} -> {}: migrating", previous, next);
            if let Err(e) = strategy.execute() {
                warn!("consent migration failed: {}", e);
            }
            // The pending directory moved or vanished; its cached
            // current-file slot is no longer trustworthy.
            self.pending.reset_current_file();
        }
        self.consent = next;
    }

    /// Every uploadable batch, oldest first, bypassing recency windows and
    /// lease bookkeeping. Shutdown path only.
    pub fn flushable_batches(&mut self) -> Vec<FlushableBatch> {
        self.granted
            .get_flushable_files()
            .into_iter()
            .filter_map(|path| {
                let data = fs::read(&path).ok()?;
                let metadata = fs::read(self.granted.metadata_path(&path)).ok();
                Some(FlushableBatch {
                    path,
                    data,
                    metadata,
                })
            })
            .collect()
    }

    /// Delete a batch outside the lease protocol (flush path).
    pub fn delete_batch(&mut self, path: &Path) {
        file::delete_batch(self.granted.root_dir(), path);
    }
}

fn write_sidecar(meta_path: &Path, metadata: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = meta_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(meta_path, metadata)
}
