//! Production Environment implementation using tokio time and OS randomness.
//!
//! # Capabilities
//!
//! - Tokio's monotonic clock (`tokio::time::Instant`), which follows the
//!   paused test clock under `#[tokio::test(start_paused = true)]`
//! - OS cryptographic RNG (getrandom)
//! - Tokio async sleep

use std::time::Duration;

use beacon_core::Environment;

/// Production environment using tokio time and the OS RNG.
///
/// # Panics
///
/// `random_bytes` panics if the OS RNG fails. RNG failure indicates an
/// OS-level fault; nothing on this device can continue meaningfully.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}
