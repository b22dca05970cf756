//! Wire format for the beacon signalling protocol.
//!
//! Devices exchange four fixed-size packets over a connectionless broadcast
//! channel. This crate owns their byte layout and the vendor framing that
//! separates this protocol's beacons from everything else on the air.
//!
//! # Components
//!
//! - [`Packet`]: decoded packet value and codec
//! - [`Advertisement`]: company id + payload as carried by the transport
//! - [`ProtocolError`]: reasons a buffer is not a valid packet

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod advert;
pub mod errors;
mod packet;

pub use advert::{Advertisement, DEFAULT_COMPANY_ID};
pub use errors::{ProtocolError, Result};
pub use packet::{
    Packet, PacketKind, encode_ack, encode_event, encode_peer_alive, encode_peer_dead,
};
