//! Full-stack smoke test: producers -> write worker -> storage ->
//! scheduler -> transport, plus the shutdown flush path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bq_common::{ConsentState, ManualClock};
use bq_storage::{BatchStorage, FilePersistenceConfig};
use bq_upload::{
    Flusher, NetworkGate, PowerGate, PowerStatus, Transport, UploadConfig, UploadFrequency,
    UploadOutcome, UploadScheduler, WriteWorker,
};
use tempfile::tempdir;

struct RecordingTransport {
    uploads: Mutex<Vec<Vec<u8>>>,
    count: AtomicUsize,
}

impl RecordingTransport {
    fn new() -> Arc<Self> {
        Arc::new(RecordingTransport {
            uploads: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        })
    }
}

impl Transport for RecordingTransport {
    fn upload(&self, batch: &[u8], _metadata: Option<&[u8]>) -> UploadOutcome {
        self.uploads.lock().unwrap().push(batch.to_vec());
        self.count.fetch_add(1, Ordering::SeqCst);
        UploadOutcome::Success
    }
}

struct AlwaysOnline;

impl NetworkGate for AlwaysOnline {
    fn is_connected(&self) -> bool {
        true
    }
}

struct PluggedIn;

impl PowerGate for PluggedIn {
    fn power_status(&self) -> PowerStatus {
        PowerStatus {
            battery_full_or_charging: true,
            on_external_power: true,
            battery_level_percent: 100,
            power_save_mode: false,
        }
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn scheduler_uploads_written_batch_end_to_end() {
    let dir = tempdir().unwrap();
    let clock = ManualClock::new(1_000_000);
    let storage = Arc::new(Mutex::new(BatchStorage::new(
        dir.path().to_path_buf(),
        FilePersistenceConfig::default().with_recent_delay_ms(1_000),
        Arc::new(clock.clone()),
        ConsentState::Granted,
    )));

    let mut worker = WriteWorker::start(Arc::clone(&storage)).unwrap();
    let handle = worker.handle();
    assert!(handle.write(b"hello".to_vec(), Some(b"ctx".to_vec())));
    worker.stop();

    // Age the batch past the read window.
    clock.advance_ms(2_000);

    let transport = RecordingTransport::new();
    let config = UploadConfig::new(UploadFrequency::Frequent).with_base_interval_ms(10);
    let mut scheduler = UploadScheduler::start(
        Arc::clone(&storage),
        transport.clone(),
        Arc::new(AlwaysOnline),
        Arc::new(PluggedIn),
        config,
    )
    .unwrap();

    assert!(
        wait_until(Duration::from_secs(5), || transport
            .count
            .load(Ordering::SeqCst)
            >= 1),
        "scheduler should upload the batch"
    );
    scheduler.stop();

    assert_eq!(transport.uploads.lock().unwrap()[0], b"hello");
    assert!(
        storage.lock().unwrap().flushable_batches().is_empty(),
        "successful upload deletes the batch"
    );
}

#[test]
fn flusher_drains_what_the_scheduler_never_saw() {
    let dir = tempdir().unwrap();
    let clock = ManualClock::new(1_000_000);
    let storage = Arc::new(Mutex::new(BatchStorage::new(
        dir.path().to_path_buf(),
        FilePersistenceConfig::default().with_recent_delay_ms(60_000),
        Arc::new(clock.clone()),
        ConsentState::Granted,
    )));

    let mut worker = WriteWorker::start(Arc::clone(&storage)).unwrap();
    let handle = worker.handle();
    handle.write(b"still warm".to_vec(), None);
    worker.stop();

    // Inside the recency window: the scheduler cannot lease it, but a
    // shutdown flush drains it anyway.
    assert!(storage.lock().unwrap().read_next_batch().is_none());

    let transport = RecordingTransport::new();
    let flusher = Flusher::new(Arc::clone(&storage));
    assert_eq!(flusher.flush(transport.as_ref()), 1);
    assert_eq!(transport.uploads.lock().unwrap()[0], b"still warm");
    assert!(storage.lock().unwrap().flushable_batches().is_empty());
}
