//! Observable state snapshots for invariant checking.
//!
//! A snapshot records what each device put on the air and what it heard, in
//! order. Invariants operate on snapshots rather than on a live cluster so a
//! check always sees one consistent history.

use beacon_proto::Packet;

/// One observable radio event at a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The device started broadcasting `Packet`.
    Started(Packet),
    /// The device heard `Packet` while scanning.
    Received(Packet),
}

/// Snapshot of the whole simulated system.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-device histories.
    pub devices: Vec<DeviceSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no devices).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot from device histories.
    pub fn from_devices(devices: Vec<DeviceSnapshot>) -> Self {
        Self { devices }
    }

    /// Add a device history.
    pub fn add_device(&mut self, device: DeviceSnapshot) {
        self.devices.push(device);
    }

    /// Devices acting as Responder.
    pub fn responders(&self) -> impl Iterator<Item = &DeviceSnapshot> {
        self.devices.iter().filter(|device| device.origin.is_none())
    }

    /// Devices acting as Initiator.
    pub fn initiators(&self) -> impl Iterator<Item = &DeviceSnapshot> {
        self.devices.iter().filter(|device| device.origin.is_some())
    }
}

/// Snapshot of one device's radio history.
#[derive(Debug, Clone, Default)]
pub struct DeviceSnapshot {
    /// Index of the device in its cluster.
    pub index: usize,
    /// Origin id for Initiators, `None` for the Responder.
    pub origin: Option<u8>,
    /// Radio history, oldest first.
    pub observations: Vec<Observation>,
}

impl DeviceSnapshot {
    /// Snapshot of an Initiator.
    pub fn initiator(index: usize, origin: u8) -> Self {
        Self { index, origin: Some(origin), observations: Vec::new() }
    }

    /// Snapshot of a Responder.
    pub fn responder(index: usize) -> Self {
        Self { index, origin: None, observations: Vec::new() }
    }

    /// Append an observation.
    pub fn with(mut self, observation: Observation) -> Self {
        self.observations.push(observation);
        self
    }

    /// Record an observation.
    pub fn record(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Packets this device started broadcasting, in order.
    pub fn started(&self) -> impl Iterator<Item = &Packet> {
        self.observations.iter().filter_map(|observation| match observation {
            Observation::Started(packet) => Some(packet),
            Observation::Received(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot() {
        let snapshot = SystemSnapshot::empty();
        assert!(snapshot.devices.is_empty());
    }

    #[test]
    fn roles_are_split_by_origin() {
        let mut snapshot = SystemSnapshot::empty();
        snapshot.add_device(DeviceSnapshot::responder(0));
        snapshot.add_device(DeviceSnapshot::initiator(1, 1));
        snapshot.add_device(DeviceSnapshot::initiator(2, 2));

        assert_eq!(snapshot.responders().count(), 1);
        assert_eq!(snapshot.initiators().count(), 2);
    }

    #[test]
    fn started_filters_receptions() {
        let device = DeviceSnapshot::responder(0)
            .with(Observation::Received(Packet::Event { origin: 1, code: 1, sequence: 1 }))
            .with(Observation::Started(Packet::Ack { origin: 1, sequence: 1 }));

        assert_eq!(device.started().collect::<Vec<_>>(), vec![&Packet::Ack {
            origin: 1,
            sequence: 1
        }]);
    }
}
