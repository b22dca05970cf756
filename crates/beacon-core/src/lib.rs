//! Beacon Core
//!
//! Sans-IO state machines for the beacon signalling protocol: Initiators
//! announce button events over a connectionless broadcast channel, a
//! Responder acknowledges them, and Initiators that stop hearing acks warn
//! each other that the Responder is gone.
//!
//! # Architecture
//!
//! Nothing in this crate performs I/O or reads a clock. Handlers take the
//! current instant and return actions; drivers (the async runtime in
//! `beacon-node`, the simulator in `beacon-harness`) execute them and call
//! `tick(now)` at `next_deadline()`.
//!
//! # Components
//!
//! - [`Initiator`]: event sender with ack timeout and liveness gossip
//! - [`Responder`]: dedup and acknowledgment
//! - [`ClickDecoder`]: press/release edges to event codes
//! - [`Feedback`]: timed indicator patterns under a [`FeedbackPolicy`]
//! - [`Device`]: one role plus its display and vendor framing
//! - [`Environment`]: time and randomness for drivers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod action;
pub mod config;
pub mod device;
pub mod env;
pub mod error;
pub mod feedback;
pub mod initiator;
pub mod input;
pub mod responder;
pub mod timer;

pub use action::Action;
pub use config::{InitiatorConfig, ProtocolConfig, ResponderConfig};
pub use device::{Device, DeviceEvent, DeviceOutput, RadioCommand, Role};
pub use env::{Environment, Timestamp};
pub use error::ConfigError;
pub use feedback::{Feedback, FeedbackPolicy, LedPattern};
pub use initiator::{Initiator, InitiatorState};
pub use input::{ButtonEdge, ClickDecoder, EventCode};
pub use responder::{DedupKey, Responder, ResponderState};
pub use timer::Timers;
