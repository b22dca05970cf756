//! Beacon node binary.
//!
//! Runs an in-process deployment of one Responder and several Initiators on
//! a shared in-memory air, pressing buttons according to click plans.
//!
//! # Usage
//!
//! ```bash
//! # Two initiators, initiator 1 double-clicks after one second
//! beacon-node --initiators 2 --click 1:double@1
//!
//! # Responder powered off: the initiator times out and raises the alarm
//! beacon-node --click 1:single@0.5 --responder-offline 30 --run-secs 20
//! ```

use std::time::Duration;

use beacon_core::{Environment, ProtocolConfig, config::DEFAULT_ACK_HOLD};
use beacon_node::{ClickPlan, DeploymentConfig, SystemEnv, run_deployment};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Beacon signalling deployment
#[derive(Parser, Debug)]
#[command(name = "beacon-node")]
#[command(about = "In-process beacon signalling deployment")]
#[command(version)]
struct Args {
    /// Number of Initiators
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..))]
    initiators: u8,

    /// Probability that a receiver misses one transmission (0.0 - 1.0)
    #[arg(long, default_value_t = 0.0)]
    loss: f64,

    /// How long the Responder broadcasts each Ack, in milliseconds
    #[arg(long, default_value_t = DEFAULT_ACK_HOLD.as_millis() as u64)]
    ack_hold_ms: u64,

    /// Scripted gesture, `<initiator>:<single|double|triple|long>@<seconds>`
    #[arg(short, long = "click")]
    clicks: Vec<ClickPlan>,

    /// Hold time of scripted long presses, in milliseconds
    #[arg(long, default_value_t = 2000)]
    long_press: u64,

    /// Seconds before the Responder powers up
    #[arg(long, default_value_t = 0.0)]
    responder_offline: f64,

    /// Total run time in seconds
    #[arg(long, default_value_t = 10.0)]
    run_secs: f64,

    /// Seed for the loss RNG (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let seed = args.seed.unwrap_or_else(|| SystemEnv::new().random_u64());
    let config = DeploymentConfig {
        initiators: args.initiators,
        loss: args.loss,
        seed,
        protocol: ProtocolConfig {
            ack_hold: Duration::from_millis(args.ack_hold_ms),
            ..ProtocolConfig::default()
        },
        clicks: args.clicks,
        long_press_hold: Duration::from_millis(args.long_press),
        responder_offline: Duration::try_from_secs_f64(args.responder_offline)?,
        run_for: Duration::try_from_secs_f64(args.run_secs)?,
    };

    tracing::info!("beacon node starting, seed {seed}");

    let report = run_deployment(config).await?;

    match report.responder.as_ref().and_then(|device| device.as_responder()) {
        Some(responder) => tracing::info!(
            state = ?responder.state(),
            last = ?responder.last_key(),
            "responder final state"
        ),
        None => tracing::info!("responder never powered up"),
    }
    for initiator in report.initiators.iter().filter_map(|device| device.as_initiator()) {
        tracing::info!(
            origin = initiator.origin_id(),
            state = ?initiator.state(),
            sequence = initiator.sequence(),
            "initiator final state"
        );
    }

    Ok(())
}
