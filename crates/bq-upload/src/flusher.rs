//! Synchronous drain-everything path.
//!
//! Used at shutdown or on an explicit flush request, when no further writes
//! are expected: every uploadable batch is sent regardless of recency and
//! deleted regardless of outcome. Best effort by design; retry is no longer
//! possible at this point, so keeping failed batches would only leak disk.

use std::sync::{Arc, Mutex, PoisonError};

use bq_storage::BatchStorage;
use tracing::{info, warn};

use crate::transport::{Transport, UploadOutcome};

/// Drains all pending uploadable batches through a transport.
pub struct Flusher {
    storage: Arc<Mutex<BatchStorage>>,
}

impl Flusher {
    pub fn new(storage: Arc<Mutex<BatchStorage>>) -> Self {
        Flusher { storage }
    }

    /// Upload and delete every uploadable batch, oldest first. Returns the
    /// number of batches drained.
    pub fn flush(&self, transport: &dyn Transport) -> usize {
        let batches = self
            .storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flushable_batches();

        let count = batches.len();
        for batch in batches {
            let outcome = transport.upload(&batch.data, batch.metadata.as_deref());
            if outcome != UploadOutcome::Success {
                warn!(
                    "flush upload of {} failed ({:?}), deleting anyway",
                    batch.path.display(),
                    outcome
                );
            }
            self.storage
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .delete_batch(&batch.path);
        }
        if count > 0 {
            info!("flushed {} batches", count);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bq_common::{ConsentState, ManualClock};
    use bq_storage::FilePersistenceConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingTransport {
        outcome: UploadOutcome,
        uploads: AtomicUsize,
    }

    impl Transport for CountingTransport {
        fn upload(&self, _batch: &[u8], _metadata: Option<&[u8]>) -> UploadOutcome {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            self.outcome
        }
    }

    fn storage_with_batches(
        root: &std::path::Path,
        clock: &ManualClock,
        batches: usize,
    ) -> Arc<Mutex<BatchStorage>> {
        let mut storage = BatchStorage::new(
            root.to_path_buf(),
            FilePersistenceConfig::default().with_recent_delay_ms(1_000),
            Arc::new(clock.clone()),
            ConsentState::Granted,
        );
        for i in 0..batches {
            storage.write_batch(format!("batch-{i}").as_bytes(), None);
            clock.advance_ms(1_000); // force one file per write
        }
        Arc::new(Mutex::new(storage))
    }

    #[test]
    fn test_flush_drains_everything_including_recent() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(1_000_000);
        let storage = storage_with_batches(dir.path(), &clock, 3);
        let transport = CountingTransport {
            outcome: UploadOutcome::Success,
            uploads: AtomicUsize::new(0),
        };

        let flusher = Flusher::new(Arc::clone(&storage));
        assert_eq!(flusher.flush(&transport), 3);
        assert_eq!(transport.uploads.load(Ordering::SeqCst), 3);
        assert!(storage.lock().unwrap().flushable_batches().is_empty());
    }

    #[test]
    fn test_flush_deletes_even_on_failure() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(1_000_000);
        let storage = storage_with_batches(dir.path(), &clock, 2);
        let transport = CountingTransport {
            outcome: UploadOutcome::RetryableError,
            uploads: AtomicUsize::new(0),
        };

        let flusher = Flusher::new(Arc::clone(&storage));
        assert_eq!(flusher.flush(&transport), 2);
        assert!(storage.lock().unwrap().flushable_batches().is_empty());
    }

    #[test]
    fn test_flush_on_empty_store_is_noop() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(1_000_000);
        let storage = storage_with_batches(dir.path(), &clock, 0);
        let transport = CountingTransport {
            outcome: UploadOutcome::Success,
            uploads: AtomicUsize::new(0),
        };

        let flusher = Flusher::new(storage);
        assert_eq!(flusher.flush(&transport), 0);
        assert_eq!(transport.uploads.load(Ordering::SeqCst), 0);
    }
}
