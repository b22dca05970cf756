//! Side effects requested by the role state machines.
//!
//! The Initiator and Responder never touch the radio or the display. They
//! return [`Action`]s, and the driver (a [`crate::Device`] in production and
//! simulation alike) executes them in order.

use std::time::Duration;

use beacon_proto::Packet;

/// Actions returned by the role state machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Begin passive scanning for advertisements
    StartScan,

    /// Stop scanning
    StopScan,

    /// Broadcast `packet` every `interval` until stopped or replaced
    StartBroadcast {
        /// Packet to advertise
        packet: Packet,
        /// Repetition interval
        interval: Duration,
    },

    /// Stop the current broadcast
    StopBroadcast,

    /// Display feedback for `code` during `duration`
    ShowFeedback {
        /// Event or status code (1-4)
        code: u8,
        /// How long the pattern stays on
        duration: Duration,
    },

    /// Turn the feedback display off
    ClearFeedback,
}
