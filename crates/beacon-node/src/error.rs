//! Node error types.

use beacon_core::ConfigError;
use thiserror::Error;

/// Errors that stop a device runtime or a deployment.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Invalid protocol or deployment configuration.
    ///
    /// Fatal at startup; fix the configuration and restart.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The radio failed.
    #[error("radio error: {0}")]
    Radio(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A device task panicked or was cancelled.
    #[error("device task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// A click plan refers to an Initiator that does not exist.
    #[error("click plan targets initiator {index}, deployment has {count}")]
    UnknownInitiator {
        /// 1-based initiator index from the plan
        index: usize,
        /// Number of initiators deployed
        count: usize,
    },
}

impl NodeError {
    /// Wrap a transport error.
    pub fn radio(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Radio(Box::new(error))
    }
}
