//! Beacon transport and indicator seams.
//!
//! A [`Radio`] is what a device uses to scan and broadcast: on hardware a BLE
//! advertiser/scanner, in tests and demos the [`crate::MemoryAir`]. An
//! [`Indicator`] shows [`LedPattern`]s.

use std::time::Duration;

use beacon_core::LedPattern;
use beacon_proto::Advertisement;

/// Connectionless broadcast transport.
///
/// A broadcast repeats every `interval` until stopped or replaced by the
/// next `start_broadcast`. `recv` yields only advertisements heard while
/// scanning; a radio never hears its own broadcasts.
pub trait Radio: Send {
    /// Transport failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Begin passive scanning.
    fn start_scan(&mut self) -> Result<(), Self::Error>;

    /// Stop scanning.
    fn stop_scan(&mut self) -> Result<(), Self::Error>;

    /// Broadcast `advertisement` every `interval`, replacing any current
    /// broadcast.
    fn start_broadcast(
        &mut self,
        advertisement: Advertisement,
        interval: Duration,
    ) -> Result<(), Self::Error>;

    /// Stop broadcasting. A no-op if nothing is being broadcast.
    fn stop_broadcast(&mut self) -> Result<(), Self::Error>;

    /// Next advertisement heard while scanning.
    ///
    /// Must be cancel safe: the runtime polls it inside `tokio::select!`.
    fn recv(&mut self) -> impl Future<Output = Result<Advertisement, Self::Error>> + Send;
}

/// Visual feedback surface.
pub trait Indicator: Send {
    /// Set the channels to `pattern`.
    fn render(&mut self, pattern: LedPattern);
}

/// Indicator that logs every pattern change.
#[derive(Debug, Clone)]
pub struct TracingIndicator {
    label: String,
}

impl TracingIndicator {
    /// Indicator logging under `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl Indicator for TracingIndicator {
    fn render(&mut self, pattern: LedPattern) {
        tracing::info!(
            device = %self.label,
            red = pattern.red,
            green = pattern.green,
            blue = pattern.blue,
            "indicator"
        );
    }
}
