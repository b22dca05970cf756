//! Protocol timing configuration.
//!
//! Both roles must run with identical timing for the protocol to work: an
//! Initiator's ack timeout only makes sense relative to the Responder's ack
//! hold, and the Responder's dedup relies on Initiators repeating an Event
//! for no longer than one event window.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, feedback::FeedbackPolicy};

/// Repetition interval for Event broadcasts.
pub const DEFAULT_EVENT_INTERVAL: Duration = Duration::from_millis(250);

/// Repetition interval for Ack broadcasts.
pub const DEFAULT_ACK_INTERVAL: Duration = Duration::from_millis(300);

/// Repetition interval for PeerAlive broadcasts.
pub const DEFAULT_PEER_ALIVE_INTERVAL: Duration = Duration::from_millis(400);

/// Repetition interval for PeerDead broadcasts.
pub const DEFAULT_PEER_DEAD_INTERVAL: Duration = Duration::from_millis(500);

/// How long an Initiator keeps repeating an Event.
pub const DEFAULT_EVENT_WINDOW: Duration = Duration::from_millis(1200);

/// How long an Initiator waits for an Ack before presuming the peer dead.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a peer-dead alarm lasts before reverting to idle.
pub const DEFAULT_PEER_DEAD_HOLDOFF: Duration = Duration::from_secs(120);

/// How long the PeerAlive recovery announcement is broadcast.
pub const DEFAULT_PEER_ALIVE_PULSE: Duration = Duration::from_secs(2);

/// How long a Responder broadcasts an Ack (and is deaf to new Events).
pub const DEFAULT_ACK_HOLD: Duration = Duration::from_millis(600);

/// Quiet time after the last click before a click burst is decoded.
pub const DEFAULT_MULTI_CLICK_WINDOW: Duration = Duration::from_millis(400);

/// Hold time above which a press is a long press.
pub const DEFAULT_LONG_PRESS_THRESHOLD: Duration = Duration::from_millis(1500);

/// Initiator feedback shown when sending an Event.
pub const DEFAULT_SEND_FEEDBACK: Duration = Duration::from_millis(500);

/// Responder feedback shown when an Event is received.
pub const DEFAULT_RECEIVE_FEEDBACK: Duration = Duration::from_secs(20);

/// Feedback code shown while the peer is presumed dead.
pub const DEFAULT_DEAD_INDICATOR_CODE: u8 = 2;

/// Timing shared by every device in a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Company identifier carried by every advertisement
    pub company_id: u16,
    /// Event broadcast interval
    pub event_interval: Duration,
    /// Ack broadcast interval
    pub ack_interval: Duration,
    /// PeerAlive broadcast interval
    pub peer_alive_interval: Duration,
    /// PeerDead broadcast interval
    pub peer_dead_interval: Duration,
    /// Event repetition window
    pub event_window: Duration,
    /// Ack wait before the peer is presumed dead
    pub ack_timeout: Duration,
    /// Peer-dead alarm duration
    pub peer_dead_holdoff: Duration,
    /// PeerAlive announcement duration
    pub peer_alive_pulse: Duration,
    /// Responder ack transmission window
    pub ack_hold: Duration,
    /// Multi-click flush window
    pub multi_click_window: Duration,
    /// Long press threshold
    pub long_press_threshold: Duration,
    /// Initiator send feedback duration
    pub send_feedback: Duration,
    /// Responder receive feedback duration
    pub receive_feedback: Duration,
    /// Feedback code for the peer-dead alarm
    pub dead_indicator_code: u8,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            company_id: beacon_proto::DEFAULT_COMPANY_ID,
            event_interval: DEFAULT_EVENT_INTERVAL,
            ack_interval: DEFAULT_ACK_INTERVAL,
            peer_alive_interval: DEFAULT_PEER_ALIVE_INTERVAL,
            peer_dead_interval: DEFAULT_PEER_DEAD_INTERVAL,
            event_window: DEFAULT_EVENT_WINDOW,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            peer_dead_holdoff: DEFAULT_PEER_DEAD_HOLDOFF,
            peer_alive_pulse: DEFAULT_PEER_ALIVE_PULSE,
            ack_hold: DEFAULT_ACK_HOLD,
            multi_click_window: DEFAULT_MULTI_CLICK_WINDOW,
            long_press_threshold: DEFAULT_LONG_PRESS_THRESHOLD,
            send_feedback: DEFAULT_SEND_FEEDBACK,
            receive_feedback: DEFAULT_RECEIVE_FEEDBACK,
            dead_indicator_code: DEFAULT_DEAD_INDICATOR_CODE,
        }
    }
}

impl ProtocolConfig {
    /// Check the configuration for values that break the protocol.
    ///
    /// # Errors
    ///
    /// - `ConfigError::ZeroDuration` if any interval or window is zero
    /// - `ConfigError::Ordering` if the event window or ack hold is not
    ///   shorter than the ack timeout, or the multi-click window is not
    ///   shorter than the long press threshold
    /// - `ConfigError::InvalidFeedbackCode` if the dead indicator is not 1-4
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("event_interval", self.event_interval),
            ("ack_interval", self.ack_interval),
            ("peer_alive_interval", self.peer_alive_interval),
            ("peer_dead_interval", self.peer_dead_interval),
            ("event_window", self.event_window),
            ("ack_timeout", self.ack_timeout),
            ("peer_dead_holdoff", self.peer_dead_holdoff),
            ("peer_alive_pulse", self.peer_alive_pulse),
            ("ack_hold", self.ack_hold),
            ("multi_click_window", self.multi_click_window),
            ("long_press_threshold", self.long_press_threshold),
        ];
        if let Some(&(field, _)) = durations.iter().find(|entry| entry.1.is_zero()) {
            return Err(ConfigError::ZeroDuration { field });
        }

        let orderings = [
            ("event_window", self.event_window, "ack_timeout", self.ack_timeout),
            ("ack_hold", self.ack_hold, "ack_timeout", self.ack_timeout),
            (
                "multi_click_window",
                self.multi_click_window,
                "long_press_threshold",
                self.long_press_threshold,
            ),
        ];
        for (shorter, shorter_value, longer, longer_value) in orderings {
            if shorter_value >= longer_value {
                return Err(ConfigError::Ordering { shorter, shorter_value, longer, longer_value });
            }
        }

        if !(1..=4).contains(&self.dead_indicator_code) {
            return Err(ConfigError::InvalidFeedbackCode(self.dead_indicator_code));
        }

        Ok(())
    }
}

/// Initiator identity and display policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatorConfig {
    /// Device identity carried in Event packets
    pub origin_id: u8,
    /// Busy policy of the Initiator's feedback display
    pub feedback_policy: FeedbackPolicy,
}

impl InitiatorConfig {
    /// Configuration for the Initiator with the given identity.
    #[must_use]
    pub fn new(origin_id: u8) -> Self {
        Self { origin_id, feedback_policy: FeedbackPolicy::Retrigger }
    }
}

/// Responder display policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Busy policy of the Responder's feedback display
    pub feedback_policy: FeedbackPolicy,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self { feedback_policy: FeedbackPolicy::ExtendSameColor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ProtocolConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = ProtocolConfig { ack_interval: Duration::ZERO, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroDuration { field: "ack_interval" }));
    }

    #[test]
    fn ack_hold_must_fit_in_ack_timeout() {
        let config = ProtocolConfig { ack_hold: Duration::from_secs(6), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Ordering { shorter: "ack_hold", .. })));
    }

    #[test]
    fn click_window_must_be_shorter_than_long_press() {
        let config =
            ProtocolConfig { multi_click_window: Duration::from_secs(2), ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Ordering { shorter: "multi_click_window", .. })
        ));
    }

    #[test]
    fn dead_indicator_must_be_renderable() {
        let config = ProtocolConfig { dead_indicator_code: 7, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::InvalidFeedbackCode(7)));
    }
}
