//! Error types for packet decoding.
//!
//! Every variant describes a buffer that is not a valid packet. The protocol
//! layer never propagates these: a received buffer that fails to decode is
//! dropped, because foreign and corrupted beacons are normal traffic on a
//! shared broadcast channel.

use thiserror::Error;

use crate::PacketKind;

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Reasons a buffer is not a valid packet.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer has no kind byte.
    #[error("empty packet")]
    Empty,

    /// Kind byte is not one of the known packet kinds.
    #[error("unknown packet kind: {0:#04x}")]
    UnknownKind(u8),

    /// Buffer is shorter than the declared kind requires.
    #[error("truncated {kind:?} packet: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Kind declared by byte 0
        kind: PacketKind,
        /// Minimum size for that kind
        expected: usize,
        /// Actual buffer length
        actual: usize,
    },

    /// Advertisement carries another vendor's company identifier.
    #[error("foreign vendor: expected company id {expected:#06x}, got {actual:#06x}")]
    ForeignVendor {
        /// Company id this deployment listens for
        expected: u16,
        /// Company id found in the advertisement
        actual: u16,
    },

    /// Manufacturer data is too short to hold a company identifier.
    #[error("manufacturer data too short: {0} bytes")]
    ManufacturerDataTooShort(usize),
}
