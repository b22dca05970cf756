//! Fuzz target for Packet::decode
//!
//! Arbitrary bytes must decode to a packet or an error, never panic. A
//! decoded packet re-encodes to the prefix it was read from; trailing bytes
//! are ignored.

#![no_main]

use beacon_proto::Packet;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = Packet::decode(data) {
        let encoded = packet.encode();
        assert_eq!(encoded.len(), packet.kind().wire_size());
        assert!(data.starts_with(&encoded), "decoded packet must re-encode to its prefix");
    }
});
