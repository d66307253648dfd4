//! Batch Queue shared types.
//!
//! This crate provides the leaf types shared by the storage and upload
//! layers:
//! - [`ConsentState`]: user data-collection consent
//! - [`BatchId`]: single-use lease token for a batch checked out for upload
//! - [`Clock`]: injectable time source for recency decisions

pub mod clock;
pub mod consent;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use consent::ConsentState;
pub use id::BatchId;
