//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold,
//! whatever the loss rate, the seed or the button schedule.

use std::collections::HashSet;

use beacon_proto::Packet;

use super::{Invariant, InvariantResult, Observation, SystemSnapshot, Violation};

/// Every Event an Initiator sends carries its own origin and the sequence
/// number following the previous one.
///
/// Sequences start at 1 and wrap from 255 to 0. A skipped or repeated
/// sequence would make the Responder drop a genuine event or accept a
/// repeat as new.
pub struct SequenceAdvance;

impl Invariant for SequenceAdvance {
    fn name(&self) -> &'static str {
        "sequence_advance"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for device in state.initiators() {
            let Some(own_origin) = device.origin else { continue };
            let mut expected: u8 = 0;

            for packet in device.started() {
                let Packet::Event { origin, sequence, .. } = *packet else { continue };
                expected = expected.wrapping_add(1);

                if origin != own_origin {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "device {}: event carries origin {origin}, expected {own_origin}",
                            device.index
                        ),
                    });
                }
                if sequence != expected {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "device {}: sent sequence {sequence}, expected {expected}",
                            device.index
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The Responder only acknowledges events it actually heard.
pub struct AckFollowsReception;

impl Invariant for AckFollowsReception {
    fn name(&self) -> &'static str {
        "ack_follows_reception"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for device in state.responders() {
            let mut heard = HashSet::new();

            for observation in &device.observations {
                match *observation {
                    Observation::Received(Packet::Event { origin, sequence, .. }) => {
                        heard.insert((origin, sequence));
                    },
                    Observation::Started(Packet::Ack { origin, sequence }) => {
                        if !heard.contains(&(origin, sequence)) {
                            return Err(Violation {
                                invariant: self.name(),
                                message: format!(
                                    "device {}: acked ({origin}, {sequence}) without hearing it",
                                    device.index
                                ),
                            });
                        }
                    },
                    _ => {},
                }
            }
        }
        Ok(())
    }
}

/// The Responder never acknowledges the same key twice in a row.
///
/// Initiators repeat each Event for a whole window; every repeat after the
/// first must be suppressed.
pub struct NoRepeatedAck;

impl Invariant for NoRepeatedAck {
    fn name(&self) -> &'static str {
        "no_repeated_ack"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for device in state.responders() {
            let mut previous = None;

            for packet in device.started() {
                let Packet::Ack { origin, sequence } = *packet else { continue };
                if previous == Some((origin, sequence)) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "device {}: acked ({origin}, {sequence}) twice in a row",
                            device.index
                        ),
                    });
                }
                previous = Some((origin, sequence));
            }
        }
        Ok(())
    }
}

/// Initiators never acknowledge and Responders never originate.
pub struct RoleSeparation;

impl Invariant for RoleSeparation {
    fn name(&self) -> &'static str {
        "role_separation"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for device in &state.devices {
            for packet in device.started() {
                let allowed = match (device.origin, packet) {
                    (None, Packet::Ack { .. }) => true,
                    (None, _) => false,
                    (Some(_), Packet::Ack { .. }) => false,
                    (Some(_), _) => true,
                };
                if !allowed {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("device {}: broadcast {packet:?}", device.index),
                    });
                }
            }
        }
        Ok(())
    }
}
