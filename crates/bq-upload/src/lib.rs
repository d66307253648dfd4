//! Batch Queue delivery layer.
//!
//! This crate provides:
//! - The [`Transport`] and readiness-gate traits the host SDK implements
//! - The adaptive-backoff [`UploadScheduler`] background task
//! - The serialized [`WriteWorker`] producers funnel writes through
//! - The shutdown [`Flusher`] drain path

pub mod backoff;
pub mod config;
pub mod flusher;
pub mod gates;
pub mod scheduler;
pub mod transport;
pub mod worker;

pub use backoff::UploadDelay;
pub use config::{UploadConfig, UploadFrequency};
pub use flusher::Flusher;
pub use gates::{NetworkGate, PowerGate, PowerStatus};
pub use scheduler::UploadScheduler;
pub use transport::{Transport, UploadOutcome};
pub use worker::{WriteHandle, WriteWorker};
