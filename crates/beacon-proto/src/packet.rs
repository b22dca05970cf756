//! Packet layouts and the codec.
//!
//! Every packet is a fixed-size byte string whose first byte is the kind
//! discriminator. Multi-field packets are parsed through `#[repr(C)]` layouts
//! with `zerocopy`, so a short buffer can never be read past its end.
//!
//! ```text
//! Event     [kind=1][origin][code][sequence]
//! Ack       [kind=2][origin][sequence]
//! PeerDead  [kind=3]
//! PeerAlive [kind=4]
//! ```

use bytes::Bytes;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Packet discriminator carried in byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Initiator announces an event
    Event = 1,
    /// Responder confirms an event
    Ack = 2,
    /// Initiator gossips that the Responder stopped answering
    PeerDead = 3,
    /// Initiator announces the Responder answered again
    PeerAlive = 4,
}

impl PacketKind {
    /// Parse a kind byte. `None` if unrecognized.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Event),
            2 => Some(Self::Ack),
            3 => Some(Self::PeerDead),
            4 => Some(Self::PeerAlive),
            _ => None,
        }
    }

    /// Kind byte as sent on the wire.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Minimum buffer length for this kind, including the kind byte.
    #[must_use]
    pub fn wire_size(self) -> usize {
        match self {
            Self::Event => EventWire::SIZE,
            Self::Ack => AckWire::SIZE,
            Self::PeerDead | Self::PeerAlive => 1,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct EventWire {
    kind: u8,
    origin: u8,
    code: u8,
    sequence: u8,
}

impl EventWire {
    const SIZE: usize = 4;
}

#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct AckWire {
    kind: u8,
    origin: u8,
    sequence: u8,
}

impl AckWire {
    const SIZE: usize = 3;
}

/// Encode an Event packet.
#[must_use]
pub fn encode_event(origin: u8, code: u8, sequence: u8) -> [u8; 4] {
    let wire = EventWire { kind: PacketKind::Event.to_u8(), origin, code, sequence };
    let mut out = [0u8; EventWire::SIZE];
    out.copy_from_slice(wire.as_bytes());
    out
}

/// Encode an Ack packet.
#[must_use]
pub fn encode_ack(origin: u8, sequence: u8) -> [u8; 3] {
    let wire = AckWire { kind: PacketKind::Ack.to_u8(), origin, sequence };
    let mut out = [0u8; AckWire::SIZE];
    out.copy_from_slice(wire.as_bytes());
    out
}

/// Encode a PeerDead packet.
#[must_use]
pub fn encode_peer_dead() -> [u8; 1] {
    [PacketKind::PeerDead.to_u8()]
}

/// Encode a PeerAlive packet.
#[must_use]
pub fn encode_peer_alive() -> [u8; 1] {
    [PacketKind::PeerAlive.to_u8()]
}

/// A decoded protocol packet.
///
/// Event codes are carried as raw bytes: the codec validates framing only,
/// and an unknown code is still a well-formed Event that must be acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Packet {
    /// Event announcement from an Initiator
    Event {
        /// Device identity of the sender
        origin: u8,
        /// Event code (1-4 for button gestures)
        code: u8,
        /// Per-origin sequence number, wraps at 256
        sequence: u8,
    },
    /// Acknowledgment of one Event
    Ack {
        /// Origin of the acknowledged Event
        origin: u8,
        /// Sequence of the acknowledged Event
        sequence: u8,
    },
    /// Responder presumed dead
    PeerDead,
    /// Responder answered again
    PeerAlive,
}

impl Packet {
    /// Kind discriminator of this packet.
    #[must_use]
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Event { .. } => PacketKind::Event,
            Self::Ack { .. } => PacketKind::Ack,
            Self::PeerDead => PacketKind::PeerDead,
            Self::PeerAlive => PacketKind::PeerAlive,
        }
    }

    /// Decode a packet from received bytes.
    ///
    /// Bytes past the kind's fixed size are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Empty` if `bytes` is empty
    /// - `ProtocolError::UnknownKind` if byte 0 is not a known kind
    /// - `ProtocolError::Truncated` if `bytes` is shorter than the kind needs
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(&first) = bytes.first() else {
            return Err(ProtocolError::Empty);
        };
        let kind = PacketKind::from_u8(first).ok_or(ProtocolError::UnknownKind(first))?;
        let truncated =
            || ProtocolError::Truncated { kind, expected: kind.wire_size(), actual: bytes.len() };

        match kind {
            PacketKind::Event => {
                let (wire, _) = EventWire::read_from_prefix(bytes).map_err(|_| truncated())?;
                Ok(Self::Event { origin: wire.origin, code: wire.code, sequence: wire.sequence })
            },
            PacketKind::Ack => {
                let (wire, _) = AckWire::read_from_prefix(bytes).map_err(|_| truncated())?;
                Ok(Self::Ack { origin: wire.origin, sequence: wire.sequence })
            },
            PacketKind::PeerDead => Ok(Self::PeerDead),
            PacketKind::PeerAlive => Ok(Self::PeerAlive),
        }
    }

    /// Encode this packet into its fixed-size wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match *self {
            Self::Event { origin, code, sequence } => {
                Bytes::copy_from_slice(&encode_event(origin, code, sequence))
            },
            Self::Ack { origin, sequence } => Bytes::copy_from_slice(&encode_ack(origin, sequence)),
            Self::PeerDead => Bytes::copy_from_slice(&encode_peer_dead()),
            Self::PeerAlive => Bytes::copy_from_slice(&encode_peer_alive()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_layout() {
        assert_eq!(encode_event(5, 2, 9), [1, 5, 2, 9]);
    }

    #[test]
    fn ack_layout() {
        assert_eq!(encode_ack(5, 9), [2, 5, 9]);
    }

    #[test]
    fn liveness_layouts() {
        assert_eq!(encode_peer_dead(), [3]);
        assert_eq!(encode_peer_alive(), [4]);
    }

    #[test]
    fn decode_event() {
        let packet = Packet::decode(&[1, 7, 3, 200]).unwrap();
        assert_eq!(packet, Packet::Event { origin: 7, code: 3, sequence: 200 });
        assert_eq!(packet.kind(), PacketKind::Event);
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let packet = Packet::decode(&[2, 7, 200, 0xFF, 0xFF]).unwrap();
        assert_eq!(packet, Packet::Ack { origin: 7, sequence: 200 });
    }

    #[test]
    fn decode_empty_is_invalid() {
        assert_eq!(Packet::decode(&[]), Err(ProtocolError::Empty));
    }

    #[test]
    fn decode_unknown_kind_is_invalid() {
        assert_eq!(Packet::decode(&[0]), Err(ProtocolError::UnknownKind(0)));
        assert_eq!(Packet::decode(&[9, 1, 2, 3]), Err(ProtocolError::UnknownKind(9)));
    }

    #[test]
    fn decode_short_event_is_invalid() {
        assert_eq!(
            Packet::decode(&[1, 7, 3]),
            Err(ProtocolError::Truncated { kind: PacketKind::Event, expected: 4, actual: 3 })
        );
    }

    #[test]
    fn decode_short_ack_is_invalid() {
        assert_eq!(
            Packet::decode(&[2, 7]),
            Err(ProtocolError::Truncated { kind: PacketKind::Ack, expected: 3, actual: 2 })
        );
    }

    #[test]
    fn unknown_event_code_is_still_an_event() {
        let packet = Packet::decode(&[1, 7, 42, 1]).unwrap();
        assert_eq!(packet, Packet::Event { origin: 7, code: 42, sequence: 1 });
    }

    #[test]
    fn encode_matches_free_functions() {
        let packet = Packet::Event { origin: 1, code: 4, sequence: 255 };
        assert_eq!(packet.encode().as_ref(), &encode_event(1, 4, 255));
        assert_eq!(Packet::PeerAlive.encode().as_ref(), &encode_peer_alive());
    }
}
