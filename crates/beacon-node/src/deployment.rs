//! In-process deployment: one Responder and several Initiators sharing a
//! [`MemoryAir`], driven by scripted clicks.

use std::time::Duration;

use beacon_core::{Device, Environment, InitiatorConfig, ProtocolConfig, ResponderConfig};
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use tracing::Instrument;

use crate::{
    air::MemoryAir,
    error::NodeError,
    plan::{ClickPlan, DEFAULT_LONG_PRESS_HOLD},
    radio::TracingIndicator,
    runtime::Runtime,
    system_env::SystemEnv,
};

/// Device state machine on the tokio clock.
pub type NodeDevice = Device<Instant>;

/// Shape of a deployment run.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    /// Number of Initiators, with origin ids `1..=initiators`
    pub initiators: u8,
    /// Probability that one receiver misses one transmission
    pub loss: f64,
    /// Seed for the loss RNG
    pub seed: u64,
    /// Timing shared by every device
    pub protocol: ProtocolConfig,
    /// Scripted gestures
    pub clicks: Vec<ClickPlan>,
    /// Hold time of scripted long presses
    pub long_press_hold: Duration,
    /// Delay before the Responder powers up
    pub responder_offline: Duration,
    /// Total run time
    pub run_for: Duration,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            initiators: 1,
            loss: 0.0,
            seed: 0,
            protocol: ProtocolConfig::default(),
            clicks: Vec::new(),
            long_press_hold: DEFAULT_LONG_PRESS_HOLD,
            responder_offline: Duration::ZERO,
            run_for: Duration::from_secs(10),
        }
    }
}

/// Final device states after a run.
#[derive(Debug)]
pub struct DeploymentReport {
    /// The Responder, if it powered up before the run ended
    pub responder: Option<NodeDevice>,
    /// Initiators in origin order
    pub initiators: Vec<NodeDevice>,
}

/// Run a deployment to completion on the current tokio runtime.
///
/// # Errors
///
/// - [`NodeError::UnknownInitiator`] if a click targets a missing Initiator
/// - [`NodeError::Config`] if the protocol timing is invalid
/// - [`NodeError::Radio`] or [`NodeError::Join`] if a device task fails
pub async fn run_deployment(config: DeploymentConfig) -> Result<DeploymentReport, NodeError> {
    if let Some(plan) = config.clicks.iter().find(|plan| plan.initiator > config.initiators) {
        return Err(NodeError::UnknownInitiator {
            index: usize::from(plan.initiator),
            count: usize::from(config.initiators),
        });
    }
    config.protocol.validate()?;

    let env = SystemEnv::new();
    let air = MemoryAir::new(config.loss, config.seed);
    let start = env.now();
    let end = start + config.run_for;

    tracing::info!(
        initiators = config.initiators,
        loss = config.loss,
        seed = config.seed,
        "deployment starting"
    );

    let responder = {
        let env = env.clone();
        let air = air.clone();
        let protocol = config.protocol.clone();
        let power_up = start + config.responder_offline;
        tokio::spawn(
            async move {
                if power_up >= end {
                    tracing::info!("responder stays offline for the whole run");
                    return Ok::<_, NodeError>(None);
                }
                tokio::time::sleep_until(power_up).await;
                tracing::info!("responder powered up");

                let device = Device::responder(&ResponderConfig::default(), protocol)?;
                // No button: the sender is dropped straight away.
                let (_, buttons) = mpsc::channel(1);
                let runtime =
                    Runtime::new(env, device, air.radio(), TracingIndicator::new("responder"), buttons);
                runtime.run(tokio::time::sleep_until(end)).await.map(Some)
            }
            .instrument(tracing::info_span!("node", device = "responder")),
        )
    };

    let mut initiators = Vec::with_capacity(usize::from(config.initiators));
    let mut feeders = Vec::new();
    for origin in 1..=config.initiators {
        let label = format!("initiator-{origin}");
        let device = Device::initiator(&InitiatorConfig::new(origin), config.protocol.clone())?;
        let (press, buttons) = mpsc::channel(64);

        let runtime = Runtime::new(
            env.clone(),
            device,
            air.radio(),
            TracingIndicator::new(label.clone()),
            buttons,
        );
        initiators.push(tokio::spawn(
            runtime
                .run(tokio::time::sleep_until(end))
                .instrument(tracing::info_span!("node", device = %label)),
        ));

        let mut edges: Vec<_> = config
            .clicks
            .iter()
            .filter(|plan| plan.initiator == origin)
            .flat_map(|plan| plan.edges(config.long_press_hold))
            .collect();
        edges.sort_by_key(|(offset, _)| *offset);
        if edges.is_empty() {
            continue;
        }
        feeders.push(tokio::spawn(async move {
            for (offset, edge) in edges {
                tokio::time::sleep_until(start + offset).await;
                if press.send(edge).await.is_err() {
                    break;
                }
            }
        }));
    }

    let responder = responder.await??;
    let mut finished = Vec::with_capacity(initiators.len());
    for handle in initiators {
        finished.push(handle.await??);
    }
    abort_all(feeders);

    tracing::info!("deployment finished");
    Ok(DeploymentReport { responder, initiators: finished })
}

fn abort_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        handle.abort();
    }
}
