//! Initiator state machine.
//!
//! Announces button events, waits for the Responder's acknowledgment, and
//! runs the liveness sub-protocol: an unanswered event makes the Initiator
//! presume the Responder dead and gossip that to other Initiators, and the
//! first answered event after that announces the recovery.
//!
//! Uses the action pattern: methods take time as input and return actions
//! for the driver to execute.
//!
//! # State Machine
//!
//! ```text
//!          send_event            ack timeout
//! ┌──────┐ ─────────> ┌─────────────┐ ─────────> ┌──────────┐
//! │ Idle │            │ AwaitingAck │            │ PeerDead │
//! └──────┘ <───────── └─────────────┘            └──────────┘
//!    ↑     matching Ack                               │
//!    └─────────────── holdoff elapsed / PeerAlive ────┘
//! ```
//!
//! PeerDead gossip from another Initiator enters `PeerDead` from any state;
//! PeerAlive returns to `Idle` from any state.
//!
//! Timer handlers re-check the state they were armed for: an ack that lands
//! just before the ack timeout fires leaves the timeout a no-op.

use std::time::Duration;

use beacon_proto::{Packet, PacketKind};

use crate::{
    action::Action, config::ProtocolConfig, env::Timestamp, input::EventCode, timer::Timers,
};

/// Initiator session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitiatorState {
    /// No event outstanding
    Idle,
    /// Event sent, waiting for the Responder's Ack
    AwaitingAck,
    /// Responder presumed dead (own timeout or gossip)
    PeerDead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitiatorTimer {
    /// End of the Event repetition window
    EventWindow,
    /// Ack wait expired
    AckTimeout,
    /// Peer-dead alarm reverts to idle
    DeadRevert,
    /// End of the PeerAlive announcement
    AlivePulse,
}

/// Initiator state machine.
///
/// This is a pure state machine: no I/O and no clock. Time is passed to the
/// methods that need it.
#[derive(Debug, Clone)]
pub struct Initiator<I> {
    origin_id: u8,
    config: ProtocolConfig,
    state: InitiatorState,
    /// Sequence of the most recent Event (0 before the first send)
    sequence: u8,
    was_dead_before_send: bool,
    /// Kind of packet currently being broadcast
    on_air: Option<PacketKind>,
    timers: Timers<InitiatorTimer, I>,
}

impl<I: Timestamp> Initiator<I> {
    /// Create an idle Initiator with the given identity.
    pub fn new(origin_id: u8, config: ProtocolConfig) -> Self {
        Self {
            origin_id,
            config,
            state: InitiatorState::Idle,
            sequence: 0,
            was_dead_before_send: false,
            on_air: None,
            timers: Timers::new(),
        }
    }

    /// Boot: begin scanning for Acks and liveness gossip.
    pub fn start(&mut self) -> Vec<Action> {
        vec![Action::StartScan]
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> InitiatorState {
        self.state
    }

    /// Sequence number of the most recent Event.
    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Device identity carried in Event packets.
    #[must_use]
    pub fn origin_id(&self) -> u8 {
        self.origin_id
    }

    /// Whether the outstanding event was sent while the peer was presumed
    /// dead.
    #[must_use]
    pub fn was_dead_before_send(&self) -> bool {
        self.was_dead_before_send
    }

    /// Kind of packet currently broadcast. `None` if silent.
    #[must_use]
    pub fn on_air(&self) -> Option<PacketKind> {
        self.on_air
    }

    /// Earliest pending timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.timers.next_deadline()
    }

    /// Announce an event.
    ///
    /// Dropped without effect while an earlier event awaits its Ack: at most
    /// one event is in flight.
    pub fn send_event(&mut self, code: EventCode, now: I) -> Vec<Action> {
        if self.state == InitiatorState::AwaitingAck {
            tracing::debug!(?code, sequence = self.sequence, "event dropped: awaiting ack");
            return Vec::new();
        }

        self.sequence = self.sequence.wrapping_add(1);
        self.was_dead_before_send = self.state == InitiatorState::PeerDead;
        self.state = InitiatorState::AwaitingAck;
        self.timers.cancel(InitiatorTimer::AckTimeout);
        self.timers.cancel(InitiatorTimer::AlivePulse);

        tracing::debug!(
            origin = self.origin_id,
            ?code,
            sequence = self.sequence,
            was_dead = self.was_dead_before_send,
            "sending event"
        );

        let packet =
            Packet::Event { origin: self.origin_id, code: code.to_u8(), sequence: self.sequence };
        let mut actions = Vec::with_capacity(2);
        self.broadcast(packet, self.config.event_interval, &mut actions);
        actions.push(Action::ShowFeedback { code: code.to_u8(), duration: self.config.send_feedback });

        self.timers.arm(InitiatorTimer::EventWindow, now + self.config.event_window);
        self.timers.arm(InitiatorTimer::AckTimeout, now + self.config.ack_timeout);

        actions
    }

    /// Process a received packet.
    ///
    /// Acks for other origins or other sequences, and Acks arriving outside
    /// `AwaitingAck`, are normal traffic from other devices and are ignored.
    pub fn handle_packet(&mut self, packet: &Packet, now: I) -> Vec<Action> {
        match *packet {
            Packet::Ack { origin, sequence } => self.handle_ack(origin, sequence, now),
            Packet::PeerDead => self.handle_peer_dead(now),
            Packet::PeerAlive => self.handle_peer_alive(),
            Packet::Event { .. } => {
                tracing::trace!(?packet, "ignoring event from another initiator");
                Vec::new()
            },
        }
    }

    /// Fire every timer due at `now`.
    pub fn tick(&mut self, now: I) -> Vec<Action> {
        let mut actions = Vec::new();

        while let Some(timer) = self.timers.pop_expired(now) {
            match timer {
                InitiatorTimer::EventWindow => {
                    if self.on_air == Some(PacketKind::Event) {
                        self.stop_broadcast(&mut actions);
                    }
                    actions.push(Action::StartScan);
                },
                InitiatorTimer::AckTimeout => {
                    if self.state == InitiatorState::AwaitingAck {
                        tracing::warn!(
                            origin = self.origin_id,
                            sequence = self.sequence,
                            "no ack, presuming peer dead"
                        );
                        actions.extend(self.enter_peer_dead(now, true));
                    } else {
                        tracing::trace!(state = ?self.state, "stale ack timeout");
                    }
                },
                InitiatorTimer::DeadRevert => {
                    if self.state == InitiatorState::PeerDead {
                        tracing::debug!(origin = self.origin_id, "peer-dead holdoff elapsed");
                        self.state = InitiatorState::Idle;
                        if self.on_air == Some(PacketKind::PeerDead) {
                            self.stop_broadcast(&mut actions);
                        }
                        actions.push(Action::ClearFeedback);
                    }
                },
                InitiatorTimer::AlivePulse => {
                    if self.on_air == Some(PacketKind::PeerAlive) {
                        self.stop_broadcast(&mut actions);
                    }
                },
            }
        }

        actions
    }

    fn handle_ack(&mut self, origin: u8, sequence: u8, now: I) -> Vec<Action> {
        if self.state != InitiatorState::AwaitingAck
            || origin != self.origin_id
            || sequence != self.sequence
        {
            tracing::trace!(origin, sequence, state = ?self.state, "ignoring ack");
            return Vec::new();
        }

        tracing::debug!(origin, sequence, "ack received");

        let mut actions = Vec::new();
        self.timers.cancel(InitiatorTimer::AckTimeout);
        self.timers.cancel(InitiatorTimer::EventWindow);
        self.stop_broadcast(&mut actions);

        if self.was_dead_before_send {
            tracing::info!(origin, "peer answered again, announcing recovery");
            self.broadcast(Packet::PeerAlive, self.config.peer_alive_interval, &mut actions);
            self.timers.arm(InitiatorTimer::AlivePulse, now + self.config.peer_alive_pulse);
            self.was_dead_before_send = false;
        }

        self.state = InitiatorState::Idle;
        actions.push(Action::ClearFeedback);
        actions
    }

    /// Gossip restarts the holdoff, except for an alarm raised here: two
    /// Initiators broadcasting PeerDead would otherwise keep each other
    /// alarmed forever.
    fn handle_peer_dead(&mut self, now: I) -> Vec<Action> {
        if self.on_air == Some(PacketKind::PeerDead) {
            tracing::trace!(origin = self.origin_id, "peer-dead gossip during own alarm");
            return Vec::new();
        }

        tracing::debug!(origin = self.origin_id, prior = ?self.state, "peer-dead gossip");
        self.enter_peer_dead(now, false)
    }

    fn handle_peer_alive(&mut self) -> Vec<Action> {
        tracing::debug!(origin = self.origin_id, prior = ?self.state, "peer-alive announcement");

        let mut actions = Vec::new();
        self.timers.cancel(InitiatorTimer::DeadRevert);
        self.timers.cancel(InitiatorTimer::EventWindow);
        self.timers.cancel(InitiatorTimer::AlivePulse);
        self.state = InitiatorState::Idle;
        self.stop_broadcast(&mut actions);
        actions.push(Action::ClearFeedback);
        actions
    }

    /// Enter `PeerDead`, (re)starting the alarm. Broadcasts PeerDead only
    /// when the alarm originates here.
    fn enter_peer_dead(&mut self, now: I, originate: bool) -> Vec<Action> {
        let mut actions = Vec::new();
        self.state = InitiatorState::PeerDead;
        self.timers.arm(InitiatorTimer::DeadRevert, now + self.config.peer_dead_holdoff);

        if originate {
            self.timers.cancel(InitiatorTimer::EventWindow);
            self.timers.cancel(InitiatorTimer::AlivePulse);
            self.broadcast(Packet::PeerDead, self.config.peer_dead_interval, &mut actions);
        }

        actions.push(Action::ShowFeedback {
            code: self.config.dead_indicator_code,
            duration: self.config.peer_dead_holdoff,
        });
        actions
    }

    fn broadcast(&mut self, packet: Packet, interval: Duration, actions: &mut Vec<Action>) {
        self.on_air = Some(packet.kind());
        actions.push(Action::StartBroadcast { packet, interval });
    }

    fn stop_broadcast(&mut self, actions: &mut Vec<Action>) {
        if self.on_air.take().is_some() {
            actions.push(Action::StopBroadcast);
        }
    }
}
