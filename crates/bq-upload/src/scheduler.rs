//! Recurring upload task with adaptive backoff.
//!
//! One background thread owns the read/upload/confirm cycle. Each run:
//!
//! 1. Poll the readiness gates; a closed gate just reschedules at the
//!    current delay.
//! 2. Lease the next batch. An empty queue backs the delay off; a leased
//!    batch goes to the transport, and the outcome decides both the confirm
//!    (delete vs. keep) and the delay direction.
//! 3. Sleep for the (possibly updated) delay and run again.
//!
//! The storage mutex is held only around the lease and the confirm, never
//! across the network call, so the writer worker is never blocked on an
//! upload in flight.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bq_storage::BatchStorage;
use tracing::{debug, info, warn};

use crate::backoff::UploadDelay;
use crate::config::UploadConfig;
use crate::gates::{NetworkGate, PowerGate};
use crate::transport::{Transport, UploadOutcome};

/// What a single run did; drives logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    GatesClosed,
    NoBatch,
    Uploaded(UploadOutcome),
}

/// The loop body, separated from the thread for direct testing.
struct UploadTask {
    storage: Arc<Mutex<BatchStorage>>,
    transport: Arc<dyn Transport>,
    network: Arc<dyn NetworkGate>,
    power: Arc<dyn PowerGate>,
    config: UploadConfig,
}

impl UploadTask {
    fn run_once(&self, delay: &mut UploadDelay) -> RunOutcome {
        if !self.network.is_connected() {
            debug!("upload deferred: network not connected");
            return RunOutcome::GatesClosed;
        }
        let power = self.power.power_status();
        if !power.allows_upload(self.config.low_battery_threshold_percent) {
            debug!("upload deferred: power state disallows upload");
            return RunOutcome::GatesClosed;
        }

        let batch = self
            .storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_next_batch();

        let Some(batch) = batch else {
            delay.increase();
            return RunOutcome::NoBatch;
        };

        let outcome = self.transport.upload(&batch.data, batch.metadata.as_deref());
        self.storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .confirm_batch_read(batch.id, outcome.should_delete_batch());

        match outcome {
            UploadOutcome::Success => delay.decrease(),
            UploadOutcome::RetryableError | UploadOutcome::NonRetryableError => delay.increase(),
        }
        debug!(
            "upload run finished: {:?}, next run in {}ms",
            outcome,
            delay.current_ms()
        );
        RunOutcome::Uploaded(outcome)
    }
}

/// Handle to the recurring upload thread.
///
/// The schedule never overlaps itself: the single thread finishes one run
/// before sleeping toward the next. Dropping the scheduler stops it.
pub struct UploadScheduler {
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl UploadScheduler {
    /// Spawn the upload thread. The first run happens after the initial
    /// delay (5×B).
    pub fn start(
        storage: Arc<Mutex<BatchStorage>>,
        transport: Arc<dyn Transport>,
        network: Arc<dyn NetworkGate>,
        power: Arc<dyn PowerGate>,
        config: UploadConfig,
    ) -> std::io::Result<Self> {
        let shutdown = Arc::new((Mutex::new(false), Condvar::new()));
        let task = UploadTask {
            storage,
            transport,
            network,
            power,
            config: config.clone(),
        };
        let mut delay = UploadDelay::from_config(&config);

        let thread_shutdown = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("bq-upload".to_string())
            .spawn(move || {
                let (lock, cvar) = &*thread_shutdown;
                let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
                loop {
                    let wait = Duration::from_millis(delay.current_ms());
                    let (guard, _timeout) = cvar
                        .wait_timeout(stopped, wait)
                        .unwrap_or_else(PoisonError::into_inner);
                    stopped = guard;
                    if *stopped {
                        break;
                    }
                    drop(stopped);
                    task.run_once(&mut delay);
                    stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
                }
                debug!("upload thread exiting");
            })?;

        info!(
            "upload scheduler started (base interval {}ms)",
            config.base_interval_ms
        );
        Ok(UploadScheduler {
            shutdown,
            thread: Some(thread),
        })
    }

    /// Stop the recurring schedule and join the thread. An in-flight lease
    /// is abandoned unconfirmed, which is safe: the batch stays on disk for
    /// a later session or the flusher.
    pub fn stop(&mut self) {
        let (lock, cvar) = &*self.shutdown;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("upload thread panicked");
            }
        }
    }
}

impl Drop for UploadScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
