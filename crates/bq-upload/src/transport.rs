//! Upload transport interface.

/// Result of handing one batch to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The collector accepted the batch; it is deleted.
    Success,
    /// Transient failure (connectivity, 5xx, timeout); the batch is kept
    /// and retried on a later run.
    RetryableError,
    /// Terminal failure (malformed payload, 4xx). The batch is deleted
    /// anyway: retrying a batch the collector will never accept would
    /// poison the queue forever.
    NonRetryableError,
}

impl UploadOutcome {
    /// Whether the confirmed batch should be deleted.
    pub fn should_delete_batch(&self) -> bool {
        match self {
            UploadOutcome::Success | UploadOutcome::NonRetryableError => true,
            UploadOutcome::RetryableError => false,
        }
    }
}

/// External transport the host SDK implements.
///
/// `upload` is called synchronously from the upload task with one batch at a
/// time: the raw batch bytes (items in write order) and the opaque metadata
/// sidecar captured at write time. Implementations own their network
/// timeout; a call that would otherwise hang must return
/// [`UploadOutcome::RetryableError`] once the bound is exceeded, so a stuck
/// upload never stalls the recurring schedule.
pub trait Transport: Send + Sync {
    fn upload(&self, batch: &[u8], metadata: Option<&[u8]>) -> UploadOutcome;
}
