//! In-process broadcast medium.
//!
//! Every [`AirRadio`] created from one [`MemoryAir`] shares a tokio broadcast
//! channel. A broadcasting radio runs a task that re-sends its advertisement
//! every interval; each receiving radio independently drops a transmission
//! with the configured loss probability, and discards everything it hears
//! while not scanning.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use beacon_proto::Advertisement;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::radio::Radio;

/// Transmissions buffered per receiver before the slowest one lags.
const AIR_CAPACITY: usize = 1024;

/// Errors from the in-memory air.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirError {
    /// Every sender is gone; nothing can be heard any more.
    #[error("air closed")]
    Closed,
}

#[derive(Debug, Clone)]
struct Transmission {
    from: u64,
    advertisement: Advertisement,
}

/// Shared in-memory air.
#[derive(Debug, Clone)]
pub struct MemoryAir {
    sender: broadcast::Sender<Transmission>,
    loss: f64,
    rng: Arc<Mutex<ChaCha8Rng>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryAir {
    /// Air where each reception is lost with probability `loss`, drawn from
    /// an RNG seeded with `seed`.
    #[must_use]
    pub fn new(loss: f64, seed: u64) -> Self {
        let (sender, _) = broadcast::channel(AIR_CAPACITY);
        Self {
            sender,
            loss: if loss.is_nan() { 0.0 } else { loss.clamp(0.0, 1.0) },
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Lossless air.
    #[must_use]
    pub fn lossless() -> Self {
        Self::new(0.0, 0)
    }

    /// Attach a new radio. It hears every transmission sent from now on.
    #[must_use]
    pub fn radio(&self) -> AirRadio {
        AirRadio {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            air: self.clone(),
            receiver: self.sender.subscribe(),
            scanning: false,
            broadcaster: None,
        }
    }

    fn lost(&self) -> bool {
        if self.loss <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_bool(self.loss)
    }
}

/// One device's radio on a [`MemoryAir`].
#[derive(Debug)]
pub struct AirRadio {
    id: u64,
    air: MemoryAir,
    receiver: broadcast::Receiver<Transmission>,
    scanning: bool,
    broadcaster: Option<JoinHandle<()>>,
}

impl AirRadio {
    /// Whether the radio is scanning.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Whether a broadcast is running.
    #[must_use]
    pub fn is_broadcasting(&self) -> bool {
        self.broadcaster.is_some()
    }
}

impl Radio for AirRadio {
    type Error = AirError;

    fn start_scan(&mut self) -> Result<(), AirError> {
        self.scanning = true;
        Ok(())
    }

    fn stop_scan(&mut self) -> Result<(), AirError> {
        self.scanning = false;
        Ok(())
    }

    fn start_broadcast(
        &mut self,
        advertisement: Advertisement,
        interval: Duration,
    ) -> Result<(), AirError> {
        self.stop_broadcast()?;

        let sender = self.air.sender.clone();
        let transmission = Transmission { from: self.id, advertisement };
        self.broadcaster = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // No receivers is not an error: nobody is listening yet.
                let _ = sender.send(transmission.clone());
            }
        }));
        Ok(())
    }

    fn stop_broadcast(&mut self) -> Result<(), AirError> {
        if let Some(task) = self.broadcaster.take() {
            task.abort();
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Advertisement, AirError> {
        loop {
            let transmission = match self.receiver.recv().await {
                Ok(transmission) => transmission,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(radio = self.id, skipped, "receiver lagged, transmissions dropped");
                    continue;
                },
                Err(RecvError::Closed) => return Err(AirError::Closed),
            };

            if transmission.from == self.id || !self.scanning {
                continue;
            }
            if self.air.lost() {
                tracing::trace!(radio = self.id, from = transmission.from, "transmission lost");
                continue;
            }
            return Ok(transmission.advertisement);
        }
    }
}

impl Drop for AirRadio {
    fn drop(&mut self) {
        if let Some(task) = self.broadcaster.take() {
            task.abort();
        }
    }
}
