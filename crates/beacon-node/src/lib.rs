//! Beacon protocol node runtime.
//!
//! Async glue that runs [`beacon_core`]'s action-based devices against real
//! time and a real (or in-memory) radio. The state machines stay Sans-IO;
//! [`Runtime`] feeds them button edges, received advertisements and deadline
//! ticks, and applies their outputs.
//!
//! # Components
//!
//! - [`Runtime`]: one device bound to its [`Radio`], [`Indicator`] and button
//! - [`MemoryAir`]: in-process broadcast medium with configurable loss
//! - [`run_deployment`]: a Responder plus Initiators driven by [`ClickPlan`]s
//! - [`SystemEnv`]: production environment (tokio time, OS RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod air;
mod deployment;
mod error;
pub mod plan;
mod radio;
mod runtime;
mod system_env;

pub use air::{AirError, AirRadio, MemoryAir};
pub use deployment::{DeploymentConfig, DeploymentReport, NodeDevice, run_deployment};
pub use error::NodeError;
pub use plan::{ClickPlan, PlanError};
pub use radio::{Indicator, Radio, TracingIndicator};
pub use runtime::Runtime;
pub use system_env::SystemEnv;
