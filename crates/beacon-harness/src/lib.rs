//! Deterministic simulation harness for beacon protocol testing.
//!
//! Runs real [`beacon_core::Device`]s against a virtual clock and a lossy
//! simulated air, so multi-device scenarios (lost acks, a silent Responder,
//! gossip between Initiators) are reproducible from a seed.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the protocol
//! invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod invariants;
pub mod sim_env;

pub use cluster::{
    CLICK_GAP, CLICK_HOLD, Cluster, ClusterConfig, LONG_PRESS_HOLD, RESPONDER, TraceEntry,
    TraceEvent,
};
pub use invariants::{
    AckFollowsReception, DeviceSnapshot, Invariant, InvariantRegistry, InvariantResult,
    NoRepeatedAck, Observation, RoleSeparation, SequenceAdvance, SystemSnapshot, Violation,
};
pub use sim_env::{SimEnv, SimInstant};
