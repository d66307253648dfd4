//! Batch Queue persistence layer.
//!
//! This crate provides:
//! - Batch file store helpers (timestamp-named files, metadata sidecars)
//! - The batch file orchestrator (rotate vs. append, recency windows,
//!   age- and quota-based eviction)
//! - Consent-driven migration of whole batch directories
//! - The `BatchStorage` facade with its single-use batch lease protocol

pub mod config;
pub mod error;
pub mod file;
pub mod migration;
pub mod orchestrator;
pub mod storage;

pub use config::FilePersistenceConfig;
pub use error::StorageError;
pub use migration::{resolve_migration, ConsentDirLayout, MigrationStrategy};
pub use orchestrator::BatchFileOrchestrator;
pub use storage::{BatchStorage, FlushableBatch, ReadBatch};

/// Metadata sidecar directory name inside each consent root.
pub const META_DIR_NAME: &str = "meta";
