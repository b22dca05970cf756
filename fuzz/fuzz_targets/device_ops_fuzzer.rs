//! Fuzz target for the device state machines
//!
//! Drives one Initiator device and one Responder device with arbitrary
//! button edges, received packets (well-formed or raw bytes) and clock
//! advances.
//!
//! # Invariants
//!
//! - No input panics a device
//! - The Initiator's sequence moves by at most one per input
//! - The Responder never acknowledges the same (origin, sequence) twice in a
//!   row
//! - A due deadline is consumed by `tick`: the next deadline is in the future

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use beacon_core::{
    ButtonEdge, Device, DeviceEvent, DeviceOutput, InitiatorConfig, ProtocolConfig, RadioCommand,
    ResponderConfig,
};
use beacon_harness::SimInstant;
use beacon_proto::{Advertisement, Packet, DEFAULT_COMPANY_ID};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum DeviceOp {
    Press,
    Release,
    Packet(PacketChoice),
    Raw { company_id: u16, data: Vec<u8> },
    Advance { millis: u16 },
}

#[derive(Debug, Clone, Arbitrary)]
enum PacketChoice {
    Event { origin: u8, code: u8, sequence: u8 },
    Ack { origin: u8, sequence: u8 },
    PeerDead,
    PeerAlive,
}

impl PacketChoice {
    fn packet(&self) -> Packet {
        match *self {
            Self::Event { origin, code, sequence } => Packet::Event { origin, code, sequence },
            Self::Ack { origin, sequence } => Packet::Ack { origin, sequence },
            Self::PeerDead => Packet::PeerDead,
            Self::PeerAlive => Packet::PeerAlive,
        }
    }
}

fn acks(outputs: &[DeviceOutput]) -> Vec<Packet> {
    outputs
        .iter()
        .filter_map(|output| match output {
            DeviceOutput::Radio(RadioCommand::StartBroadcast { advertisement, .. }) => {
                Packet::from_advertisement(advertisement, DEFAULT_COMPANY_ID).ok()
            },
            _ => None,
        })
        .filter(|packet| matches!(packet, Packet::Ack { .. }))
        .collect()
}

fuzz_target!(|ops: Vec<DeviceOp>| {
    let protocol = ProtocolConfig::default();
    let Ok(mut initiator) = Device::initiator(&InitiatorConfig::new(1), protocol.clone()) else {
        return;
    };
    let Ok(mut responder) = Device::responder(&ResponderConfig::default(), protocol) else {
        return;
    };

    let mut now = SimInstant::ZERO;
    initiator.start(now);
    responder.start(now);
    let mut last_ack = None;

    for op in ops {
        let before = initiator.as_initiator().map(|machine| machine.sequence()).unwrap_or(0);

        let event = match op {
            DeviceOp::Press => DeviceEvent::Button(ButtonEdge::Press),
            DeviceOp::Release => DeviceEvent::Button(ButtonEdge::Release),
            DeviceOp::Packet(choice) => DeviceEvent::AdvertisementReceived(
                Advertisement::from_packet(DEFAULT_COMPANY_ID, &choice.packet()),
            ),
            DeviceOp::Raw { company_id, data } => {
                DeviceEvent::AdvertisementReceived(Advertisement::new(company_id, data))
            },
            DeviceOp::Advance { millis } => {
                now += Duration::from_millis(u64::from(millis));
                DeviceEvent::Tick
            },
        };

        initiator.handle(event.clone(), now);
        for packet in acks(&responder.handle(event, now)) {
            assert_ne!(Some(packet), last_ack, "responder repeated an ack");
            last_ack = Some(packet);
        }

        let after = initiator.as_initiator().map(|machine| machine.sequence()).unwrap_or(0);
        assert!(after == before || after == before.wrapping_add(1));

        for deadline in [initiator.next_deadline(), responder.next_deadline()].into_iter().flatten() {
            assert!(deadline > now, "tick left a due deadline behind");
        }
    }
});
