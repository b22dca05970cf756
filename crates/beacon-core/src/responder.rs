//! Responder dispatcher.
//!
//! Scans for Event packets, suppresses the repeats every Initiator sends
//! during its event window, shows feedback for each new event and
//! acknowledges it. While acknowledging, the Responder stops scanning: it
//! cannot receive and transmit at once, so Events arriving during the ack
//! hold are missed, and the Initiator's own timeout covers that loss.
//!
//! ```text
//!            new Event                    ack hold elapsed
//! ┌──────────┐ ──────> ┌──────────────┐ ─────────────────> ┌──────────┐
//! │ Scanning │         │ Acknowledging│                    │ Scanning │
//! └──────────┘         └──────────────┘                    └──────────┘
//! ```

use beacon_proto::Packet;

use crate::{action::Action, config::ProtocolConfig, env::Timestamp, timer::Timers};

/// Identity of one logical event occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    /// Origin device of the Event
    pub origin: u8,
    /// Sequence number of the Event
    pub sequence: u8,
}

/// Responder activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponderState {
    /// Listening for Events
    Scanning,
    /// Broadcasting an Ack; deaf to Events
    Acknowledging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponderTimer {
    AckHold,
}

/// Responder state machine.
#[derive(Debug, Clone)]
pub struct Responder<I> {
    config: ProtocolConfig,
    state: ResponderState,
    /// Key of the last accepted Event. A single slot, not a set.
    last_key: Option<DedupKey>,
    timers: Timers<ResponderTimer, I>,
}

impl<I: Timestamp> Responder<I> {
    /// Create a scanning Responder.
    pub fn new(config: ProtocolConfig) -> Self {
        Self { config, state: ResponderState::Scanning, last_key: None, timers: Timers::new() }
    }

    /// Boot: begin scanning for Events.
    pub fn start(&mut self) -> Vec<Action> {
        vec![Action::StartScan]
    }

    /// Current activity.
    #[must_use]
    pub fn state(&self) -> ResponderState {
        self.state
    }

    /// Key of the last accepted Event.
    #[must_use]
    pub fn last_key(&self) -> Option<DedupKey> {
        self.last_key
    }

    /// Earliest pending timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.timers.next_deadline()
    }

    /// Process a received packet.
    ///
    /// Only Events are meaningful to a Responder; Acks and liveness gossip
    /// between Initiators are ignored.
    pub fn handle_packet(&mut self, packet: &Packet, now: I) -> Vec<Action> {
        let Packet::Event { origin, code, sequence } = *packet else {
            tracing::trace!(?packet, "responder ignoring non-event");
            return Vec::new();
        };

        if self.state == ResponderState::Acknowledging {
            tracing::trace!(origin, sequence, "event missed during ack hold");
            return Vec::new();
        }

        let key = DedupKey { origin, sequence };
        if self.last_key == Some(key) {
            tracing::trace!(origin, sequence, "duplicate event");
            return Vec::new();
        }
        self.last_key = Some(key);

        tracing::info!(origin, code, sequence, "event received");

        let mut actions = vec![Action::ShowFeedback { code, duration: self.config.receive_feedback }];
        actions.extend(self.send_ack(key, now));
        actions
    }

    /// Fire every timer due at `now`.
    pub fn tick(&mut self, now: I) -> Vec<Action> {
        let mut actions = Vec::new();
        while let Some(ResponderTimer::AckHold) = self.timers.pop_expired(now) {
            self.state = ResponderState::Scanning;
            actions.push(Action::StopBroadcast);
            actions.push(Action::StartScan);
        }
        actions
    }

    fn send_ack(&mut self, key: DedupKey, now: I) -> Vec<Action> {
        self.state = ResponderState::Acknowledging;
        self.timers.arm(ResponderTimer::AckHold, now + self.config.ack_hold);

        vec![Action::StopScan, Action::StartBroadcast {
            packet: Packet::Ack { origin: key.origin, sequence: key.sequence },
            interval: self.config.ack_interval,
        }]
    }
}
