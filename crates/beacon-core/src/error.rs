//! Error types for the beacon protocol core.
//!
//! The protocol itself has no error path: malformed packets, stale acks and
//! timeouts are all absorbed by the state machines. What can be wrong is the
//! configuration a device is started with, and that is rejected up front.

use std::time::Duration;

use thiserror::Error;

/// Invalid timing or identity configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration that drives a timer or a broadcast interval is zero
    #[error("{field} must be non-zero")]
    ZeroDuration {
        /// Name of the offending field
        field: &'static str,
    },

    /// Two durations violate a required ordering
    #[error("{shorter} ({shorter_value:?}) must be shorter than {longer} ({longer_value:?})")]
    Ordering {
        /// Field that must be shorter
        shorter: &'static str,
        /// Its configured value
        shorter_value: Duration,
        /// Field that must be longer
        longer: &'static str,
        /// Its configured value
        longer_value: Duration,
    },

    /// Feedback code outside the renderable range 1-4
    #[error("feedback code {0} is not renderable (expected 1-4)")]
    InvalidFeedbackCode(u8),
}
