//! Environment abstraction for deterministic testing.
//!
//! Decouples drivers from system resources (time, randomness). State machines
//! in this crate never hold an environment: they receive `now` as a parameter.
//! Drivers use the environment to read the clock, to sleep until the next
//! deadline, and to draw randomness (simulated packet loss).

use std::{fmt::Debug, future::Future, ops::Add, time::Duration};

/// Instant type usable by the protocol state machines.
///
/// Production uses a real monotonic clock, simulation a virtual one. Adding a
/// `Duration` yields a deadline; subtracting two instants yields the elapsed
/// time between them.
pub trait Timestamp:
    Copy
    + Ord
    + Debug
    + Send
    + Sync
    + Add<Duration, Output = Self>
    + std::ops::Sub<Output = Duration>
{
}

impl<T> Timestamp for T where
    T: Copy
        + Ord
        + Debug
        + Send
        + Sync
        + Add<Duration, Output = Self>
        + std::ops::Sub<Output = Duration>
{
}

/// Abstract environment providing time, randomness, and sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - Given the same seed, a simulated environment produces the same random
///   sequence
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    type Instant: Timestamp;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only drivers call this; protocol logic is driven by `tick(now)`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Returns `true` with probability `p` (clamped to `0.0..=1.0`).
    ///
    /// Used to simulate beacon loss.
    fn chance(&self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        let sample = (self.random_u64() >> 11) as f64 / (1u64 << 53) as f64;
        sample < p
    }
}
