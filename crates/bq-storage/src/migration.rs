//! Consent-driven batch directory migration.
//!
//! Data written while consent is pending is quarantined in its own
//! directory. When the user decides, the pending directory is either
//! promoted wholesale into the granted directory (names preserved, so
//! chronological order survives) or wiped. Data already classified under a
//! final consent state is never touched retroactively; only new writes are
//! affected, because they go through the orchestrator for the new state.

use std::fs;
use std::path::{Path, PathBuf};

use bq_common::ConsentState;
use tracing::{info, warn};

use crate::error::StorageError;
use crate::file;
use crate::META_DIR_NAME;

/// Directory layout for the per-consent batch roots.
///
/// `not_granted` has no directory: declined data is wiped, never stored.
#[derive(Debug, Clone)]
pub struct ConsentDirLayout {
    root: PathBuf,
}

impl ConsentDirLayout {
    pub fn new(root: PathBuf) -> Self {
        ConsentDirLayout { root }
    }

    /// Quarantine directory for data written while consent is undecided.
    pub fn pending_dir(&self) -> PathBuf {
        self.root.join(ConsentState::Pending.as_str())
    }

    /// Uploadable directory for data written under granted consent.
    pub fn granted_dir(&self) -> PathBuf {
        self.root.join(ConsentState::Granted.as_str())
    }
}

/// What to do with quarantined data on a consent transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStrategy {
    /// Nothing to migrate.
    NoOp,
    /// Recursively delete the target directory.
    Wipe { target: PathBuf },
    /// Move every batch file (and sidecar) from one root to another,
    /// preserving names.
    Move { from: PathBuf, to: PathBuf },
}

/// Resolve the strategy for a `(previous, next)` consent transition.
///
/// Only transitions out of [`ConsentState::Pending`] act; once data has been
/// classified under a final state, later consent changes affect new writes
/// only.
pub fn resolve_migration(
    previous: ConsentState,
    next: ConsentState,
    layout: &ConsentDirLayout,
) -> MigrationStrategy {
    match (previous, next) {
        (ConsentState::Pending, ConsentState::Granted) => MigrationStrategy::Move {
            from: layout.pending_dir(),
            to: layout.granted_dir(),
        },
        (ConsentState::Pending, ConsentState::NotGranted) => MigrationStrategy::Wipe {
            target: layout.pending_dir(),
        },
        _ => MigrationStrategy::NoOp,
    }
}

impl MigrationStrategy {
    /// Apply the strategy. Idempotent; a missing source directory is a
    /// no-op, since migration may run speculatively on repeated consent
    /// changes.
    pub fn execute(&self) -> Result<(), StorageError> {
        match self {
            MigrationStrategy::NoOp => Ok(()),
            MigrationStrategy::Wipe { target } => wipe_dir(target),
            MigrationStrategy::Move { from, to } => move_batches(from, to),
        }
    }
}

fn wipe_dir(target: &Path) -> Result<(), StorageError> {
    if !target.exists() {
        return Ok(());
    }
    fs::remove_dir_all(target)?;
    info!("wiped batch directory {}", target.display());
    Ok(())
}

fn move_batches(from: &Path, to: &Path) -> Result<(), StorageError> {
    if !from.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(to)?;

    let mut moved = 0usize;
    for batch in file::list_batch_files(from) {
        let Some(name) = batch.file_name() else {
            continue;
        };
        let dest = to.join(name);
        if let Err(e) = fs::rename(&batch, &dest) {
            warn!("failed to move batch {}: {}", batch.display(), e);
            continue;
        }
        moved += 1;

        let meta = file::metadata_path(from, &batch);
        if meta.exists() {
            let meta_dest = file::metadata_path(to, &dest);
            if let Some(parent) = meta_dest.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!("failed to create sidecar dir {}: {}", parent.display(), e);
                    continue;
                }
            }
            if let Err(e) = fs::rename(&meta, &meta_dest) {
                warn!("failed to move sidecar {}: {}", meta.display(), e);
            }
        }
    }

    // Leftovers (foreign files) stay behind; the empty scaffolding goes.
    let _ = fs::remove_dir(from.join(META_DIR_NAME));
    let _ = fs::remove_dir(from);

    info!(
        "promoted {} pending batches from {} to {}",
        moved,
        from.display(),
        to.display()
    );
    Ok(())
}
