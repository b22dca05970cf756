//! Async device runtime.
//!
//! Drives one [`Device`] from three sources: button edges, advertisements
//! heard by the [`Radio`], and the device's own next deadline. Outputs are
//! applied to the radio and the [`Indicator`] in the order the device emitted
//! them.

use beacon_core::{ButtonEdge, Device, DeviceEvent, DeviceOutput, Environment, RadioCommand};
use tokio::sync::mpsc;

use crate::{
    error::NodeError,
    radio::{Indicator, Radio},
};

/// One device bound to its radio, indicator and button.
pub struct Runtime<E: Environment, R, D> {
    env: E,
    device: Device<E::Instant>,
    radio: R,
    indicator: D,
    buttons: mpsc::Receiver<ButtonEdge>,
}

impl<E, R, D> Runtime<E, R, D>
where
    E: Environment,
    R: Radio,
    D: Indicator,
{
    /// Bind `device` to its peripherals.
    ///
    /// A Responder has no button; pass a receiver whose sender is dropped.
    pub fn new(
        env: E,
        device: Device<E::Instant>,
        radio: R,
        indicator: D,
        buttons: mpsc::Receiver<ButtonEdge>,
    ) -> Self {
        Self { env, device, radio, indicator, buttons }
    }

    /// Run until `shutdown` resolves, then return the device for inspection.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Radio`] if the radio fails to execute a command
    /// or to receive. The device state at that point is lost.
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<Device<E::Instant>, NodeError> {
        let Self { env, mut device, mut radio, mut indicator, mut buttons } = self;
        let mut shutdown = std::pin::pin!(shutdown);
        let mut buttons_open = true;

        let outputs = device.start(env.now());
        execute(&mut radio, &mut indicator, outputs)?;

        loop {
            let deadline = wait_until(env.clone(), device.next_deadline());

            let event = tokio::select! {
                biased;

                () = &mut shutdown => {
                    tracing::debug!("runtime shutting down");
                    break;
                }

                edge = buttons.recv(), if buttons_open => match edge {
                    Some(edge) => DeviceEvent::Button(edge),
                    None => {
                        buttons_open = false;
                        continue;
                    },
                },

                heard = radio.recv() => DeviceEvent::AdvertisementReceived(heard.map_err(NodeError::radio)?),

                () = deadline => DeviceEvent::Tick,
            };

            let outputs = device.handle(event, env.now());
            execute(&mut radio, &mut indicator, outputs)?;
        }

        radio.stop_broadcast().map_err(NodeError::radio)?;
        radio.stop_scan().map_err(NodeError::radio)?;
        Ok(device)
    }
}

async fn wait_until<E: Environment>(env: E, deadline: Option<E::Instant>) {
    let Some(deadline) = deadline else {
        return std::future::pending().await;
    };

    let now = env.now();
    if deadline > now {
        env.sleep(deadline - now).await;
    }
}

fn execute<R: Radio, D: Indicator>(
    radio: &mut R,
    indicator: &mut D,
    outputs: Vec<DeviceOutput>,
) -> Result<(), NodeError> {
    for output in outputs {
        match output {
            DeviceOutput::Radio(command) => {
                tracing::trace!(?command, "radio command");
                match command {
                    RadioCommand::StartScan => radio.start_scan(),
                    RadioCommand::StopScan => radio.stop_scan(),
                    RadioCommand::StartBroadcast { advertisement, interval } => {
                        radio.start_broadcast(advertisement, interval)
                    },
                    RadioCommand::StopBroadcast => radio.stop_broadcast(),
                }
                .map_err(NodeError::radio)?;
            },
            DeviceOutput::Leds(pattern) => indicator.render(pattern),
        }
    }
    Ok(())
}
