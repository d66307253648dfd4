//! Serialized writer worker.
//!
//! All producers funnel writes through one dedicated thread via an MPSC
//! channel, so the orchestrator's current-file bookkeeping is only ever
//! touched from a single thread. Consent changes ride the same channel,
//! which keeps migrations ordered with respect to the writes around them.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use bq_common::ConsentState;
use bq_storage::BatchStorage;
use tracing::{debug, warn};

/// Channel capacity; producers beyond this are dropped, not blocked.
const COMMAND_QUEUE_CAPACITY: usize = 1_024;

/// Commands processed by the writer thread.
enum WriteCommand {
    Write {
        item: Vec<u8>,
        metadata: Option<Vec<u8>>,
    },
    UpdateConsent(ConsentState),
    Shutdown,
}

/// Cloneable producer-side handle.
#[derive(Clone)]
pub struct WriteHandle {
    sender: SyncSender<WriteCommand>,
}

impl WriteHandle {
    /// Enqueue one item for persistence. Returns `false` when the worker is
    /// gone or its queue is full; telemetry is droppable by design, so the
    /// producer is never blocked.
    pub fn write(&self, item: Vec<u8>, metadata: Option<Vec<u8>>) -> bool {
        match self.sender.try_send(WriteCommand::Write { item, metadata }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("write queue full, dropping item");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Enqueue a consent change, serialized with surrounding writes.
    pub fn update_consent(&self, next: ConsentState) -> bool {
        self.sender
            .try_send(WriteCommand::UpdateConsent(next))
            .is_ok()
    }
}

/// The writer thread and its channel.
pub struct WriteWorker {
    sender: SyncSender<WriteCommand>,
    thread: Option<JoinHandle<()>>,
}

impl WriteWorker {
    /// Spawn the writer thread over shared storage.
    pub fn start(storage: Arc<Mutex<BatchStorage>>) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(COMMAND_QUEUE_CAPACITY);
        let thread = thread::Builder::new()
            .name("bq-writer".to_string())
            .spawn(move || run_writer(storage, receiver))?;
        Ok(WriteWorker {
            sender,
            thread: Some(thread),
        })
    }

    /// Handle for producers; cheap to clone.
    pub fn handle(&self) -> WriteHandle {
        WriteHandle {
            sender: self.sender.clone(),
        }
    }

    /// Drain queued commands and join the thread.
    ///
    /// Shutdown is sent blocking: a full mailbox drains item by item until
    /// the command fits, so stop always terminates the thread even under
    /// producer backpressure. Cloned handles keep the channel open, which is
    /// why closing the sender alone would not wake the receiver.
    pub fn stop(&mut self) {
        let _ = self.sender.send(WriteCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("writer thread panicked");
            }
        }
    }
}

impl Drop for WriteWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_writer(storage: Arc<Mutex<BatchStorage>>, receiver: Receiver<WriteCommand>) {
    while let Ok(command) = receiver.recv() {
        match command {
            WriteCommand::Write { item, metadata } => {
                let written = storage
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .write_batch(&item, metadata.as_deref());
                if !written {
                    warn!("dropped item of {} bytes", item.len());
                }
            }
            WriteCommand::UpdateConsent(next) => {
                storage
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .update_consent(next);
            }
            WriteCommand::Shutdown => break,
        }
    }
    debug!("writer thread exiting");
}
