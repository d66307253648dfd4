//! User data-collection consent state.
//!
//! Exactly one consent state is active for a storage instance at a time.
//! Transitions are driven externally (host app settings); the queue only
//! consumes `(previous, next)` pairs when deciding how to migrate data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Consent state controlling whether collected data may be persisted and
/// uploaded.
///
/// Data written while consent is [`ConsentState::Pending`] is quarantined in
/// its own directory until the user decides. [`ConsentState::NotGranted`]
/// data is never persisted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentState {
    /// The user has not decided yet; data is quarantined.
    Pending,
    /// The user granted consent; data is uploadable.
    Granted,
    /// The user declined; data is dropped.
    NotGranted,
}

impl ConsentState {
    /// Directory name used for this consent state's batch root.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentState::Pending => "pending",
            ConsentState::Granted => "granted",
            ConsentState::NotGranted => "not_granted",
        }
    }
}

impl fmt::Display for ConsentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
