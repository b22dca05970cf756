//! Simulated deployment: one Responder and N Initiators sharing a lossy air.
//!
//! The cluster is event-driven. Each [`Cluster::step`] jumps the virtual
//! clock to the next instant anything happens (a scheduled input, a device
//! timer, a periodic transmission) and processes everything due at that
//! instant. Every transmission reaches every other powered, scanning device
//! independently, with the configured loss probability.
//!
//! Device 0 is always the Responder; Initiator `i` (0-based) is device
//! `i + 1` and uses origin id `i + 1`.

use std::{collections::BTreeMap, time::Duration};

use beacon_core::{
    ButtonEdge, ConfigError, Device, DeviceOutput, Environment, EventCode, InitiatorConfig,
    LedPattern, ProtocolConfig, RadioCommand, ResponderConfig,
};
use beacon_proto::{Advertisement, Packet};
use serde::{Deserialize, Serialize};

use crate::{
    invariants::{DeviceSnapshot, Observation, SystemSnapshot},
    sim_env::{SimEnv, SimInstant},
};

/// Index of the Responder in every cluster.
pub const RESPONDER: usize = 0;

/// Hold time of a simulated short click.
pub const CLICK_HOLD: Duration = Duration::from_millis(100);

/// Gap between simulated clicks of one gesture.
pub const CLICK_GAP: Duration = Duration::from_millis(150);

/// Hold time of a simulated long press.
pub const LONG_PRESS_HOLD: Duration = Duration::from_secs(2);

/// Shape of a simulated deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of Initiators
    pub initiators: usize,
    /// Probability that one transmission is missed by one receiver
    pub loss: f64,
    /// RNG seed
    pub seed: u64,
    /// Timing shared by every device
    pub protocol: ProtocolConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { initiators: 1, loss: 0.0, seed: 0, protocol: ProtocolConfig::default() }
    }
}

/// Radio-level event recorded by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// Device started broadcasting
    BroadcastStarted(Packet),
    /// Device stopped broadcasting
    BroadcastStopped,
    /// Device heard a transmission from `from`
    Delivered {
        /// Transmitting device
        from: usize,
        /// Decoded packet
        packet: Packet,
    },
    /// Transmission from `from` was lost before reaching the device
    Lost {
        /// Transmitting device
        from: usize,
        /// Decoded packet
        packet: Packet,
    },
    /// Device indicator changed
    Leds(LedPattern),
    /// Device button edge
    Button(ButtonEdge),
    /// Device powered on or off
    Power(bool),
}

/// One entry of the cluster trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// When it happened
    pub at: SimInstant,
    /// Device it happened at
    pub device: usize,
    /// What happened
    pub event: TraceEvent,
}

#[derive(Debug, Clone, Copy)]
enum Scheduled {
    Button(ButtonEdge),
    Power(bool),
}

#[derive(Debug, Clone)]
struct Broadcast {
    advertisement: Advertisement,
    packet: Packet,
    interval: Duration,
    next_tx: SimInstant,
}

#[derive(Debug)]
struct SimNode {
    device: Device<SimInstant>,
    powered: bool,
    scanning: bool,
    broadcast: Option<Broadcast>,
    leds: LedPattern,
}

impl SimNode {
    fn new(device: Device<SimInstant>) -> Self {
        Self { device, powered: true, scanning: false, broadcast: None, leds: LedPattern::OFF }
    }
}

/// Simulated deployment of devices on a shared air.
pub struct Cluster {
    env: SimEnv,
    loss: f64,
    nodes: Vec<SimNode>,
    /// Pending inputs keyed by (instant, insertion order)
    inputs: BTreeMap<(SimInstant, u64), (usize, Scheduled)>,
    next_input: u64,
    trace: Vec<TraceEntry>,
}

impl Cluster {
    /// Boot a cluster of one Responder and `config.initiators` Initiators.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the protocol configuration is invalid.
    pub fn new(config: &ClusterConfig) -> Result<Self, ConfigError> {
        let env = SimEnv::with_seed(config.seed);

        let mut nodes = vec![SimNode::new(Device::responder(
            &ResponderConfig::default(),
            config.protocol.clone(),
        )?)];
        for i in 0..config.initiators {
            let origin = u8::try_from(i + 1).unwrap_or(u8::MAX);
            let device = Device::initiator(&InitiatorConfig::new(origin), config.protocol.clone())?;
            nodes.push(SimNode::new(device));
        }

        let mut cluster = Self {
            env,
            loss: config.loss.clamp(0.0, 1.0),
            nodes,
            inputs: BTreeMap::new(),
            next_input: 0,
            trace: Vec::new(),
        };

        let now = cluster.now();
        for index in 0..cluster.nodes.len() {
            let outputs = cluster.nodes[index].device.start(now);
            cluster.apply_outputs(index, outputs, now);
        }
        Ok(cluster)
    }

    /// Device index of the `i`-th Initiator (0-based).
    #[must_use]
    pub fn initiator(i: usize) -> usize {
        i + 1
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> SimInstant {
        self.env.now()
    }

    /// Simulation environment.
    #[must_use]
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Number of devices, Responder included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the cluster has no devices. Never true: the Responder always
    /// exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Device at `index`.
    #[must_use]
    pub fn device(&self, index: usize) -> &Device<SimInstant> {
        &self.nodes[index].device
    }

    /// Indicator pattern currently shown by device `index`.
    #[must_use]
    pub fn leds(&self, index: usize) -> LedPattern {
        self.nodes[index].leds
    }

    /// Whether device `index` is scanning.
    #[must_use]
    pub fn is_scanning(&self, index: usize) -> bool {
        self.nodes[index].scanning
    }

    /// Packet device `index` is broadcasting, if any.
    #[must_use]
    pub fn broadcasting(&self, index: usize) -> Option<Packet> {
        self.nodes[index].broadcast.as_ref().map(|broadcast| broadcast.packet)
    }

    /// Everything that happened so far.
    #[must_use]
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Power device `index` on or off immediately.
    ///
    /// A powered-off device keeps its state and timers but neither transmits
    /// nor receives.
    pub fn set_powered(&mut self, index: usize, powered: bool) {
        let now = self.now();
        self.nodes[index].powered = powered;
        self.record(now, index, TraceEvent::Power(powered));
    }

    /// Power device `index` on or off at `at`.
    pub fn schedule_power(&mut self, index: usize, at: SimInstant, powered: bool) {
        self.schedule(index, at, Scheduled::Power(powered));
    }

    /// Press the button of device `index` at `at` for `hold`.
    pub fn schedule_click(&mut self, index: usize, at: SimInstant, hold: Duration) {
        self.schedule(index, at, Scheduled::Button(ButtonEdge::Press));
        self.schedule(index, at + hold, Scheduled::Button(ButtonEdge::Release));
    }

    /// Perform the button gesture for `code` on device `index` starting at
    /// `at`. Returns the instant of the last release.
    pub fn schedule_gesture(&mut self, index: usize, code: EventCode, at: SimInstant) -> SimInstant {
        let clicks = match code {
            EventCode::Single => 1,
            EventCode::Double => 2,
            EventCode::Triple => 3,
            EventCode::LongPress => {
                self.schedule_click(index, at, LONG_PRESS_HOLD);
                return at + LONG_PRESS_HOLD;
            },
        };

        let mut press = at;
        let mut released = at;
        for _ in 0..clicks {
            self.schedule_click(index, press, CLICK_HOLD);
            released = press + CLICK_HOLD;
            press = released + CLICK_GAP;
        }
        released
    }

    /// Instant of the next thing that will happen, if anything will.
    #[must_use]
    pub fn next_event_time(&self) -> Option<SimInstant> {
        let input = self.inputs.keys().next().map(|(at, _)| *at);
        let timers = self.nodes.iter().filter_map(|node| node.device.next_deadline());
        let air = self
            .nodes
            .iter()
            .filter(|node| node.powered)
            .filter_map(|node| node.broadcast.as_ref().map(|broadcast| broadcast.next_tx));

        input.into_iter().chain(timers).chain(air).min()
    }

    /// Advance to the next event and process everything due then.
    ///
    /// Returns `false` if nothing is left to happen.
    pub fn step(&mut self) -> bool {
        let Some(at) = self.next_event_time() else {
            return false;
        };
        self.env.advance_to(at);

        while let Some(entry) = self.inputs.first_entry() {
            if entry.key().0 > at {
                break;
            }
            let (index, input) = entry.remove();
            self.apply_input(index, input, at);
        }

        for index in 0..self.nodes.len() {
            if self.nodes[index].device.next_deadline().is_some_and(|deadline| deadline <= at) {
                let outputs = self.nodes[index].device.tick(at);
                self.apply_outputs(index, outputs, at);
            }
        }

        for index in 0..self.nodes.len() {
            let node = &self.nodes[index];
            if node.powered && node.broadcast.as_ref().is_some_and(|b| b.next_tx <= at) {
                self.transmit(index, at);
            }
        }

        true
    }

    /// Process every event up to and including `until`, then move the clock
    /// to `until`.
    pub fn run_until(&mut self, until: SimInstant) {
        while self.next_event_time().is_some_and(|at| at <= until) {
            self.step();
        }
        self.env.advance_to(until);
    }

    /// Run for `duration` from now.
    pub fn run_for(&mut self, duration: Duration) {
        let until = self.now() + duration;
        self.run_until(until);
    }

    /// Radio history of every device.
    #[must_use]
    pub fn snapshot(&self) -> SystemSnapshot {
        let mut devices: Vec<_> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| match node.device.as_initiator() {
                Some(initiator) => DeviceSnapshot::initiator(index, initiator.origin_id()),
                None => DeviceSnapshot::responder(index),
            })
            .collect();

        for entry in &self.trace {
            let observation = match entry.event {
                TraceEvent::BroadcastStarted(packet) => Observation::Started(packet),
                TraceEvent::Delivered { packet, .. } => Observation::Received(packet),
                _ => continue,
            };
            devices[entry.device].record(observation);
        }

        SystemSnapshot::from_devices(devices)
    }

    /// Packets device `index` started broadcasting, in order.
    #[must_use]
    pub fn started_by(&self, index: usize) -> Vec<Packet> {
        self.trace
            .iter()
            .filter(|entry| entry.device == index)
            .filter_map(|entry| match entry.event {
                TraceEvent::BroadcastStarted(packet) => Some(packet),
                _ => None,
            })
            .collect()
    }

    fn schedule(&mut self, index: usize, at: SimInstant, input: Scheduled) {
        self.inputs.insert((at, self.next_input), (index, input));
        self.next_input += 1;
    }

    fn apply_input(&mut self, index: usize, input: Scheduled, at: SimInstant) {
        match input {
            Scheduled::Button(edge) => {
                self.record(at, index, TraceEvent::Button(edge));
                let outputs = self.nodes[index].device.handle_button(edge, at);
                self.apply_outputs(index, outputs, at);
            },
            Scheduled::Power(powered) => {
                self.nodes[index].powered = powered;
                self.record(at, index, TraceEvent::Power(powered));
            },
        }
    }

    fn transmit(&mut self, from: usize, at: SimInstant) {
        let Some(broadcast) = self.nodes[from].broadcast.as_mut() else {
            return;
        };
        broadcast.next_tx = at + broadcast.interval;
        let advertisement = broadcast.advertisement.clone();
        let packet = broadcast.packet;

        for to in 0..self.nodes.len() {
            let node = &self.nodes[to];
            if to == from || !node.powered || !node.scanning {
                continue;
            }

            if self.env.chance(self.loss) {
                self.record(at, to, TraceEvent::Lost { from, packet });
                continue;
            }

            self.record(at, to, TraceEvent::Delivered { from, packet });
            let outputs = self.nodes[to].device.handle_advertisement(&advertisement, at);
            self.apply_outputs(to, outputs, at);
        }
    }

    fn apply_outputs(&mut self, index: usize, outputs: Vec<DeviceOutput>, at: SimInstant) {
        for output in outputs {
            match output {
                DeviceOutput::Radio(RadioCommand::StartScan) => self.nodes[index].scanning = true,
                DeviceOutput::Radio(RadioCommand::StopScan) => self.nodes[index].scanning = false,
                DeviceOutput::Radio(RadioCommand::StartBroadcast { advertisement, interval }) => {
                    let Ok(packet) = Packet::decode(&advertisement.data) else {
                        tracing::warn!(device = index, "device broadcast an undecodable packet");
                        continue;
                    };
                    self.record(at, index, TraceEvent::BroadcastStarted(packet));
                    self.nodes[index].broadcast =
                        Some(Broadcast { advertisement, packet, interval, next_tx: at });
                },
                DeviceOutput::Radio(RadioCommand::StopBroadcast) => {
                    if self.nodes[index].broadcast.take().is_some() {
                        self.record(at, index, TraceEvent::BroadcastStopped);
                    }
                },
                DeviceOutput::Leds(pattern) => {
                    self.nodes[index].leds = pattern;
                    self.record(at, index, TraceEvent::Leds(pattern));
                },
            }
        }
    }

    fn record(&mut self, at: SimInstant, device: usize, event: TraceEvent) {
        tracing::trace!(?at, device, ?event, "sim");
        self.trace.push(TraceEntry { at, device, event });
    }
}
