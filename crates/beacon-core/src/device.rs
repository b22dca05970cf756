//! Device composition.
//!
//! A [`Device`] is what runs on one piece of hardware: a role state machine,
//! the feedback display it drives and, for Initiators, the click decoder in
//! front of it. It speaks the transport's language on both sides: raw
//! [`Advertisement`]s in, [`DeviceOutput`]s out. Vendor filtering and packet
//! decoding happen here so the role machines only ever see valid packets.

use std::time::Duration;

use beacon_proto::{Advertisement, Packet};

use crate::{
    action::Action,
    config::{InitiatorConfig, ProtocolConfig, ResponderConfig},
    env::Timestamp,
    error::ConfigError,
    feedback::{Feedback, LedPattern},
    initiator::Initiator,
    input::{ButtonEdge, ClickDecoder, EventCode},
    responder::Responder,
};

/// Inputs fed into a device by its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Advertisement heard while scanning.
    AdvertisementReceived(Advertisement),

    /// Debounced button edge.
    Button(ButtonEdge),

    /// Time passed; fire expired timers.
    Tick,
}

/// Commands for the beacon transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCommand {
    /// Begin passive scanning
    StartScan,
    /// Stop scanning
    StopScan,
    /// Broadcast `advertisement` every `interval`, replacing any current
    /// broadcast
    StartBroadcast {
        /// Vendor-framed packet
        advertisement: Advertisement,
        /// Repetition interval
        interval: Duration,
    },
    /// Stop broadcasting
    StopBroadcast,
}

/// Outputs a device asks its driver to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutput {
    /// Drive the transport
    Radio(RadioCommand),
    /// Set the indicator channels
    Leds(LedPattern),
}

/// Role-specific state.
#[derive(Debug, Clone)]
pub enum Role<I> {
    /// Button-driven originator of events
    Initiator {
        /// Protocol state machine
        machine: Initiator<I>,
        /// Button decoder feeding it
        clicks: ClickDecoder<I>,
    },
    /// Acknowledging observer
    Responder(Responder<I>),
}

/// One device: role, display and transport framing.
#[derive(Debug, Clone)]
pub struct Device<I> {
    role: Role<I>,
    feedback: Feedback<I>,
    company_id: u16,
}

impl<I: Timestamp> Device<I> {
    /// Build an Initiator device.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `protocol` fails validation.
    pub fn initiator(
        identity: &InitiatorConfig,
        protocol: ProtocolConfig,
    ) -> Result<Self, ConfigError> {
        protocol.validate()?;

        let clicks = ClickDecoder::new(protocol.multi_click_window, protocol.long_press_threshold);
        let company_id = protocol.company_id;
        Ok(Self {
            role: Role::Initiator {
                machine: Initiator::new(identity.origin_id, protocol),
                clicks,
            },
            feedback: Feedback::new(identity.feedback_policy),
            company_id,
        })
    }

    /// Build a Responder device.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `protocol` fails validation.
    pub fn responder(
        responder: &ResponderConfig,
        protocol: ProtocolConfig,
    ) -> Result<Self, ConfigError> {
        protocol.validate()?;

        let company_id = protocol.company_id;
        Ok(Self {
            role: Role::Responder(Responder::new(protocol)),
            feedback: Feedback::new(responder.feedback_policy),
            company_id,
        })
    }

    /// Role-specific state.
    #[must_use]
    pub fn role(&self) -> &Role<I> {
        &self.role
    }

    /// The Initiator state machine, if this device is one.
    #[must_use]
    pub fn as_initiator(&self) -> Option<&Initiator<I>> {
        match &self.role {
            Role::Initiator { machine, .. } => Some(machine),
            Role::Responder(_) => None,
        }
    }

    /// The Responder state machine, if this device is one.
    #[must_use]
    pub fn as_responder(&self) -> Option<&Responder<I>> {
        match &self.role {
            Role::Responder(responder) => Some(responder),
            Role::Initiator { .. } => None,
        }
    }

    /// Feedback display state.
    #[must_use]
    pub fn feedback(&self) -> &Feedback<I> {
        &self.feedback
    }

    /// Company id this device accepts and emits.
    #[must_use]
    pub fn company_id(&self) -> u16 {
        self.company_id
    }

    /// Boot the device.
    pub fn start(&mut self, now: I) -> Vec<DeviceOutput> {
        let actions = match &mut self.role {
            Role::Initiator { machine, .. } => machine.start(),
            Role::Responder(responder) => responder.start(),
        };
        self.execute(actions, now)
    }

    /// Process one input.
    pub fn handle(&mut self, event: DeviceEvent, now: I) -> Vec<DeviceOutput> {
        match event {
            DeviceEvent::AdvertisementReceived(advert) => self.handle_advertisement(&advert, now),
            DeviceEvent::Button(edge) => self.handle_button(edge, now),
            DeviceEvent::Tick => self.tick(now),
        }
    }

    /// Process an advertisement heard on the air.
    ///
    /// Foreign vendors and malformed payloads are dropped.
    pub fn handle_advertisement(&mut self, advert: &Advertisement, now: I) -> Vec<DeviceOutput> {
        let packet = match Packet::from_advertisement(advert, self.company_id) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::trace!(%error, "advertisement dropped");
                return Vec::new();
            },
        };

        let actions = match &mut self.role {
            Role::Initiator { machine, .. } => machine.handle_packet(&packet, now),
            Role::Responder(responder) => responder.handle_packet(&packet, now),
        };
        self.execute(actions, now)
    }

    /// Process a button edge. Responders have no button.
    pub fn handle_button(&mut self, edge: ButtonEdge, now: I) -> Vec<DeviceOutput> {
        let Role::Initiator { clicks, .. } = &mut self.role else {
            tracing::trace!(?edge, "button edge on responder ignored");
            return Vec::new();
        };

        match clicks.handle_edge(edge, now) {
            Some(code) => self.send_event(code, now),
            None => Vec::new(),
        }
    }

    /// Announce `code` directly, bypassing the click decoder.
    pub fn send_event(&mut self, code: EventCode, now: I) -> Vec<DeviceOutput> {
        let Role::Initiator { machine, .. } = &mut self.role else {
            tracing::trace!(?code, "responder cannot send events");
            return Vec::new();
        };

        let actions = machine.send_event(code, now);
        self.execute(actions, now)
    }

    /// Fire every timer due at `now`.
    pub fn tick(&mut self, now: I) -> Vec<DeviceOutput> {
        let mut outputs: Vec<_> =
            self.feedback.tick(now).map(DeviceOutput::Leds).into_iter().collect();

        let actions = match &mut self.role {
            Role::Initiator { machine, clicks } => {
                let mut actions = Vec::new();
                if let Some(code) = clicks.tick(now) {
                    actions.extend(machine.send_event(code, now));
                }
                actions.extend(machine.tick(now));
                actions
            },
            Role::Responder(responder) => responder.tick(now),
        };

        outputs.extend(self.execute(actions, now));
        outputs
    }

    /// Earliest deadline across the role, the click decoder and the display.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        let role = match &self.role {
            Role::Initiator { machine, clicks } => {
                [machine.next_deadline(), clicks.next_deadline()].into_iter().flatten().min()
            },
            Role::Responder(responder) => responder.next_deadline(),
        };
        [role, self.feedback.next_deadline()].into_iter().flatten().min()
    }

    fn execute(&mut self, actions: Vec<Action>, now: I) -> Vec<DeviceOutput> {
        let mut outputs = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                Action::StartScan => outputs.push(DeviceOutput::Radio(RadioCommand::StartScan)),
                Action::StopScan => outputs.push(DeviceOutput::Radio(RadioCommand::StopScan)),
                Action::StartBroadcast { packet, interval } => {
                    let advertisement = Advertisement::from_packet(self.company_id, &packet);
                    outputs.push(DeviceOutput::Radio(RadioCommand::StartBroadcast {
                        advertisement,
                        interval,
                    }));
                },
                Action::StopBroadcast => {
                    outputs.push(DeviceOutput::Radio(RadioCommand::StopBroadcast));
                },
                Action::ShowFeedback { code, duration } => {
                    outputs.extend(self.feedback.show(code, duration, now).map(DeviceOutput::Leds));
                },
                Action::ClearFeedback => {
                    outputs.extend(self.feedback.clear().map(DeviceOutput::Leds));
                },
            }
        }
        outputs
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use beacon_proto::DEFAULT_COMPANY_ID;

    use super::*;
    use crate::{feedback::FeedbackPolicy, initiator::InitiatorState};

    fn initiator() -> Device<Instant> {
        Device::initiator(&InitiatorConfig::new(5), ProtocolConfig::default()).unwrap()
    }

    fn responder() -> Device<Instant> {
        Device::responder(&ResponderConfig::default(), ProtocolConfig::default()).unwrap()
    }

    fn advert(packet: Packet) -> Advertisement {
        Advertisement::from_packet(DEFAULT_COMPANY_ID, &packet)
    }

    fn broadcasts(outputs: &[DeviceOutput]) -> Vec<Packet> {
        outputs
            .iter()
            .filter_map(|output| match output {
                DeviceOutput::Radio(RadioCommand::StartBroadcast { advertisement, .. }) => {
                    Packet::from_advertisement(advertisement, DEFAULT_COMPANY_ID).ok()
                },
                _ => None,
            })
            .collect()
    }

    #[test]
    fn both_roles_scan_on_boot() {
        let t0 = Instant::now();
        for mut device in [initiator(), responder()] {
            assert_eq!(device.start(t0), vec![DeviceOutput::Radio(RadioCommand::StartScan)]);
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let protocol = ProtocolConfig { ack_hold: Duration::ZERO, ..ProtocolConfig::default() };

        assert!(Device::<Instant>::responder(&ResponderConfig::default(), protocol).is_err());
    }

    #[test]
    fn double_click_sends_event_code_two() {
        let t0 = Instant::now();
        let mut device = initiator();
        let ms = Duration::from_millis;

        device.handle_button(ButtonEdge::Press, t0);
        device.handle_button(ButtonEdge::Release, t0 + ms(100));
        device.handle_button(ButtonEdge::Press, t0 + ms(300));
        device.handle_button(ButtonEdge::Release, t0 + ms(400));

        assert!(device.tick(t0 + ms(700)).is_empty());
        let outputs = device.tick(t0 + ms(800));

        assert_eq!(broadcasts(&outputs), vec![Packet::Event { origin: 5, code: 2, sequence: 1 }]);
        assert!(outputs.contains(&DeviceOutput::Leds(LedPattern::for_code(2))));
    }

    #[test]
    fn long_press_sends_immediately() {
        let t0 = Instant::now();
        let mut device = initiator();

        device.handle_button(ButtonEdge::Press, t0);
        let outputs = device.handle_button(ButtonEdge::Release, t0 + Duration::from_secs(2));

        assert_eq!(broadcasts(&outputs), vec![Packet::Event { origin: 5, code: 4, sequence: 1 }]);
    }

    #[test]
    fn responder_acks_framed_event() {
        let t0 = Instant::now();
        let mut device = responder();

        let outputs = device
            .handle_advertisement(&advert(Packet::Event { origin: 5, code: 3, sequence: 9 }), t0);

        assert_eq!(outputs[0], DeviceOutput::Leds(LedPattern::for_code(3)));
        assert_eq!(outputs[1], DeviceOutput::Radio(RadioCommand::StopScan));
        assert_eq!(broadcasts(&outputs), vec![Packet::Ack { origin: 5, sequence: 9 }]);
    }

    #[test]
    fn foreign_vendor_never_reaches_protocol() {
        let t0 = Instant::now();
        let mut device = responder();
        let foreign = Advertisement::from_packet(
            0xBEEF,
            &Packet::Event { origin: 5, code: 3, sequence: 9 },
        );

        assert!(device.handle_advertisement(&foreign, t0).is_empty());
        assert_eq!(device.as_responder().and_then(|r| r.last_key()), None);
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let t0 = Instant::now();
        let mut device = responder();

        for data in [&[][..], &[9, 9][..], &[1, 5][..]] {
            let outputs =
                device.handle_advertisement(&Advertisement::new(DEFAULT_COMPANY_ID, data.to_vec()), t0);
            assert!(outputs.is_empty());
        }
    }

    #[test]
    fn responder_feedback_extends_same_color() {
        let t0 = Instant::now();
        let mut device = responder();
        let hold = ProtocolConfig::default().ack_hold;

        device.handle_advertisement(&advert(Packet::Event { origin: 1, code: 2, sequence: 1 }), t0);
        device.tick(t0 + hold);
        let outputs = device.handle_advertisement(
            &advert(Packet::Event { origin: 2, code: 2, sequence: 1 }),
            t0 + hold,
        );

        // Still acknowledged, but the display does not re-render.
        assert_eq!(broadcasts(&outputs).len(), 1);
        assert!(!outputs.iter().any(|output| matches!(output, DeviceOutput::Leds(_))));
        assert_eq!(device.feedback().policy(), FeedbackPolicy::ExtendSameColor);
        assert_eq!(
            device.feedback().next_deadline(),
            Some(t0 + hold + ProtocolConfig::default().receive_feedback)
        );
    }

    #[test]
    fn ack_clears_initiator_feedback() {
        let t0 = Instant::now();
        let mut device = initiator();

        device.send_event(EventCode::Single, t0);
        let outputs = device.handle_advertisement(&advert(Packet::Ack { origin: 5, sequence: 1 }), t0);

        assert!(outputs.contains(&DeviceOutput::Leds(LedPattern::OFF)));
        assert_eq!(device.as_initiator().map(Initiator::state), Some(InitiatorState::Idle));
    }

    #[test]
    fn buttons_on_responder_are_ignored() {
        let t0 = Instant::now();
        let mut device = responder();

        assert!(device.handle_button(ButtonEdge::Press, t0).is_empty());
        assert!(device.send_event(EventCode::Single, t0).is_empty());
    }

    #[test]
    fn next_deadline_covers_all_components() {
        let t0 = Instant::now();
        let mut device = initiator();
        assert_eq!(device.next_deadline(), None);

        device.handle_button(ButtonEdge::Press, t0);
        device.handle_button(ButtonEdge::Release, t0 + Duration::from_millis(100));

        let flush = t0 + Duration::from_millis(500);
        assert_eq!(device.next_deadline(), Some(flush));

        device.tick(flush);
        // Send feedback (500 ms) clears before the event window (1.2 s) ends.
        assert_eq!(device.next_deadline(), Some(flush + Duration::from_millis(500)));
    }

    #[test]
    fn handle_dispatches_events() {
        let t0 = Instant::now();
        let mut device = responder();

        let outputs = device.handle(
            DeviceEvent::AdvertisementReceived(advert(Packet::Event {
                origin: 1,
                code: 1,
                sequence: 1,
            })),
            t0,
        );
        assert_eq!(broadcasts(&outputs).len(), 1);

        let outputs = device.handle(DeviceEvent::Tick, t0 + ProtocolConfig::default().ack_hold);
        assert_eq!(outputs, vec![
            DeviceOutput::Radio(RadioCommand::StopBroadcast),
            DeviceOutput::Radio(RadioCommand::StartScan),
        ]);
    }
}
