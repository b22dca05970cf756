//! Property-based tests for the Initiator and Responder state machines.
//!
//! Random interleavings of sends, acks, gossip and elapsed time must never
//! break sequencing or leave timers behind.

use std::time::{Duration, Instant};

use beacon_core::{
    Action, EventCode, Initiator, InitiatorState, ProtocolConfig, Responder,
};
use beacon_proto::Packet;
use proptest::prelude::*;

const ORIGIN: u8 = 5;

#[derive(Debug, Clone)]
enum Op {
    Send(EventCode),
    AckCurrent,
    AckStale,
    PeerDead,
    PeerAlive,
    Advance(u64),
}

fn arb_code() -> impl Strategy<Value = EventCode> {
    prop_oneof![
        Just(EventCode::Single),
        Just(EventCode::Double),
        Just(EventCode::Triple),
        Just(EventCode::LongPress),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_code().prop_map(Op::Send),
        2 => Just(Op::AckCurrent),
        1 => Just(Op::AckStale),
        1 => Just(Op::PeerDead),
        1 => Just(Op::PeerAlive),
        4 => (1u64..8_000).prop_map(Op::Advance),
    ]
}

fn sent_events(actions: &[Action]) -> Vec<(u8, u8)> {
    actions
        .iter()
        .filter_map(|action| match action {
            Action::StartBroadcast { packet: Packet::Event { origin, sequence, .. }, .. } => {
                Some((*origin, *sequence))
            },
            _ => None,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: every broadcast Event advances the sequence by exactly one
    /// and carries the Initiator's origin.
    #[test]
    fn prop_sequence_advances_by_one_per_event(ops in prop::collection::vec(arb_op(), 1..80)) {
        let t0 = Instant::now();
        let mut now = t0;
        let mut initiator = Initiator::new(ORIGIN, ProtocolConfig::default());
        let mut expected: u8 = 0;

        for op in ops {
            let actions = match op {
                Op::Send(code) => initiator.send_event(code, now),
                Op::AckCurrent => initiator.handle_packet(
                    &Packet::Ack { origin: ORIGIN, sequence: initiator.sequence() },
                    now,
                ),
                Op::AckStale => initiator.handle_packet(
                    &Packet::Ack { origin: ORIGIN, sequence: initiator.sequence().wrapping_sub(1) },
                    now,
                ),
                Op::PeerDead => initiator.handle_packet(&Packet::PeerDead, now),
                Op::PeerAlive => initiator.handle_packet(&Packet::PeerAlive, now),
                Op::Advance(ms) => {
                    now += Duration::from_millis(ms);
                    initiator.tick(now)
                },
            };

            for (origin, sequence) in sent_events(&actions) {
                expected = expected.wrapping_add(1);
                prop_assert_eq!(origin, ORIGIN);
                prop_assert_eq!(sequence, expected);
            }
            prop_assert_eq!(initiator.sequence(), expected);
        }
    }

    /// Property: a send while awaiting an ack has no effect at all.
    #[test]
    fn prop_busy_send_is_inert(ops in prop::collection::vec(arb_op(), 1..60), code in arb_code()) {
        let t0 = Instant::now();
        let mut now = t0;
        let mut initiator = Initiator::new(ORIGIN, ProtocolConfig::default());

        for op in ops {
            match op {
                Op::Send(code) => { initiator.send_event(code, now); },
                Op::AckCurrent => {
                    let ack = Packet::Ack { origin: ORIGIN, sequence: initiator.sequence() };
                    initiator.handle_packet(&ack, now);
                },
                Op::AckStale | Op::PeerDead | Op::PeerAlive => {},
                Op::Advance(ms) => {
                    now += Duration::from_millis(ms);
                    initiator.tick(now);
                },
            }

            if initiator.state() == InitiatorState::AwaitingAck {
                let sequence = initiator.sequence();
                let deadline = initiator.next_deadline();
                prop_assert!(initiator.send_event(code, now).is_empty());
                prop_assert_eq!(initiator.sequence(), sequence);
                prop_assert_eq!(initiator.next_deadline(), deadline);
            }
        }
    }

    /// Property: left alone long enough, an Initiator always settles in Idle
    /// with no timers pending and nothing on the air.
    #[test]
    fn prop_initiator_settles(ops in prop::collection::vec(arb_op(), 1..60)) {
        let config = ProtocolConfig::default();
        let t0 = Instant::now();
        let mut now = t0;
        let mut initiator = Initiator::new(ORIGIN, config.clone());

        for op in ops {
            match op {
                Op::Send(code) => { initiator.send_event(code, now); },
                Op::AckCurrent => {
                    let ack = Packet::Ack { origin: ORIGIN, sequence: initiator.sequence() };
                    initiator.handle_packet(&ack, now);
                },
                Op::AckStale => {},
                Op::PeerDead => { initiator.handle_packet(&Packet::PeerDead, now); },
                Op::PeerAlive => { initiator.handle_packet(&Packet::PeerAlive, now); },
                Op::Advance(ms) => {
                    now += Duration::from_millis(ms);
                    initiator.tick(now);
                },
            }
        }

        // Ack timeout can lead into a full holdoff; cover both.
        now += config.ack_timeout + config.peer_dead_holdoff + config.peer_alive_pulse;
        while let Some(deadline) = initiator.next_deadline() {
            prop_assert!(deadline <= now);
            initiator.tick(deadline);
        }

        prop_assert_eq!(initiator.state(), InitiatorState::Idle);
        prop_assert_eq!(initiator.on_air(), None);
    }

    /// Property: the Responder acknowledges exactly the keys it accepts, and
    /// never the same key twice in a row.
    #[test]
    fn prop_responder_never_repeats_an_ack(
        events in prop::collection::vec((0u8..3, 0u8..3, 0u64..1_500), 1..80)
    ) {
        let config = ProtocolConfig::default();
        let t0 = Instant::now();
        let mut now = t0;
        let mut responder = Responder::new(config);
        let mut last_acked: Option<(u8, u8)> = None;

        for (origin, sequence, gap_ms) in events {
            now += Duration::from_millis(gap_ms);
            responder.tick(now);

            let actions = responder.handle_packet(&Packet::Event { origin, code: 1, sequence }, now);
            for action in actions {
                if let Action::StartBroadcast { packet: Packet::Ack { origin: o, sequence: s }, .. } = action {
                    prop_assert_eq!((o, s), (origin, sequence));
                    prop_assert_ne!(Some((o, s)), last_acked);
                    last_acked = Some((o, s));
                }
            }
        }
    }
}

#[test]
fn sequence_wraps_after_255() {
    let t0 = Instant::now();
    let mut initiator = Initiator::new(ORIGIN, ProtocolConfig::default());
    let mut seen = Vec::new();

    for _ in 0..512 {
        let actions = initiator.send_event(EventCode::Single, t0);
        seen.extend(sent_events(&actions).into_iter().map(|(_, sequence)| sequence));
        let ack = Packet::Ack { origin: ORIGIN, sequence: initiator.sequence() };
        initiator.handle_packet(&ack, t0);
    }

    let expected: Vec<u8> = (1..=255).chain(0..=255).chain([0]).collect();
    assert_eq!(seen, expected);
}
