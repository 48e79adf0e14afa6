//! In-memory controller fleet.
//!
//! [`SimulatedFleet`] implements [`Connector`] over a set of
//! [`SimulatedDevice`]s held in memory. It backs the test suite and the
//! command-line bench mode, where a fleet is described by a JSON fixture:
//!
//! ```json
//! {
//!   "10.0.0.1": {
//!     "tags": [
//!       { "name": "Program:Main.Speed", "declared_type": "DINT", "value": 1500 }
//!     ]
//!   },
//!   "10.0.0.2": { "reachable": false }
//! }
//! ```
//!
//! Every write is recorded so callers can inspect what reached a device.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::client::{ClientConfig, Connector, TagSession};
use crate::error::{Result, TagError};
use crate::tag::TagInfo;
use crate::value::TagValue;

/// A tag held by a simulated device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTag {
    /// Tag name.
    pub name: String,
    /// Declared type.
    pub declared_type: String,
    /// Current value.
    pub value: TagValue,
}

fn reachable_default() -> bool {
    true
}

/// One simulated controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedDevice {
    /// Tags in enumeration order.
    #[serde(default)]
    pub tags: Vec<SimulatedTag>,
    /// Whether connections succeed.
    #[serde(default = "reachable_default")]
    pub reachable: bool,
    /// Processor slot the device insists on, if any.
    #[serde(default)]
    pub required_slot: Option<u8>,
    /// Whether tag enumeration times out.
    #[serde(default)]
    pub list_times_out: bool,
    /// Whether writes time out.
    #[serde(default)]
    pub writes_time_out: bool,
    /// Every successful write, in order.
    #[serde(skip)]
    pub writes: Vec<(String, TagValue)>,
    /// Number of sessions opened.
    #[serde(skip)]
    pub sessions_opened: usize,
    /// Number of sessions closed.
    #[serde(skip)]
    pub sessions_closed: usize,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            reachable: true,
            required_slot: None,
            list_times_out: false,
            writes_time_out: false,
            writes: Vec::new(),
            sessions_opened: 0,
            sessions_closed: 0,
        }
    }
}

impl SimulatedDevice {
    /// Creates a reachable device without tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a device that refuses connections.
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::default()
        }
    }

    /// Adds a tag.
    pub fn with_tag(
        mut self,
        name: impl Into<String>,
        declared_type: impl Into<String>,
        value: TagValue,
    ) -> Self {
        self.tags.push(SimulatedTag {
            name: name.into(),
            declared_type: declared_type.into(),
            value,
        });
        self
    }

    /// Requires sessions to route to `slot`.
    pub fn with_required_slot(mut self, slot: u8) -> Self {
        self.required_slot = Some(slot);
        self
    }

    /// Makes tag enumeration time out.
    pub fn with_list_timeout(mut self) -> Self {
        self.list_times_out = true;
        self
    }

    /// Makes writes time out.
    pub fn with_write_timeout(mut self) -> Self {
        self.writes_time_out = true;
        self
    }

    /// Current value of a tag.
    pub fn value(&self, name: &str) -> Option<&TagValue> {
        self.tags.iter().find(|tag| tag.name == name).map(|tag| &tag.value)
    }

    /// Values written to `name`, oldest first.
    pub fn writes_to(&self, name: &str) -> Vec<TagValue> {
        self.writes
            .iter()
            .filter(|(tag, _)| tag == name)
            .map(|(_, value)| value.clone())
            .collect()
    }
}

type DeviceMap = HashMap<String, SimulatedDevice>;

/// A shared, cloneable set of simulated devices keyed by address.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFleet {
    devices: Arc<Mutex<DeviceMap>>,
}

impl SimulatedFleet {
    /// Creates an empty fleet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a fleet from a JSON fixture file.
    ///
    /// # Errors
    ///
    /// Returns `TagError::Io` or `TagError::Json` if the file cannot be read
    /// or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses a fleet from a JSON fixture.
    pub fn from_json(text: &str) -> Result<Self> {
        let devices: DeviceMap = serde_json::from_str(text)?;
        Ok(Self {
            devices: Arc::new(Mutex::new(devices)),
        })
    }

    /// Adds or replaces a device.
    pub fn insert(&self, ip: impl Into<String>, device: SimulatedDevice) {
        self.lock().insert(ip.into(), device);
    }

    /// Returns a copy of a device's current state.
    pub fn device(&self, ip: &str) -> Option<SimulatedDevice> {
        self.lock().get(ip).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, DeviceMap> {
        self.devices.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Connector for SimulatedFleet {
    type Session = SimulatedSession;

    fn connect(&self, ip: &str, config: &ClientConfig) -> Result<SimulatedSession> {
        let mut devices = self.lock();
        let device = devices
            .get_mut(ip)
            .ok_or_else(|| TagError::connection(ip, "no route to host"))?;
        if !device.reachable {
            return Err(TagError::connection(ip, "connection refused"));
        }
        if let Some(slot) = device.required_slot {
            if config.slot != Some(slot) {
                return Err(TagError::connection(
                    ip,
                    format!("processor expected in slot {}", slot),
                ));
            }
        }
        device.sessions_opened += 1;

        Ok(SimulatedSession {
            ip: ip.to_string(),
            devices: Arc::clone(&self.devices),
            open: true,
        })
    }
}

/// Session with one simulated device.
#[derive(Debug)]
pub struct SimulatedSession {
    ip: String,
    devices: Arc<Mutex<DeviceMap>>,
    open: bool,
}

impl SimulatedSession {
    fn with_device<T>(&self, f: impl FnOnce(&mut SimulatedDevice) -> Result<T>) -> Result<T> {
        if !self.open {
            return Err(TagError::connection(&self.ip, "session closed"));
        }
        let mut devices = self.devices.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let device = devices
            .get_mut(&self.ip)
            .ok_or_else(|| TagError::connection(&self.ip, "device vanished"))?;
        f(device)
    }
}

impl TagSession for SimulatedSession {
    fn list_tags(&mut self) -> Result<Vec<TagInfo>> {
        self.with_device(|device| {
            if device.list_times_out {
                return Err(TagError::Timeout);
            }
            Ok(device
                .tags
                .iter()
                .map(|tag| TagInfo::new(tag.name.clone(), tag.declared_type.clone()))
                .collect())
        })
    }

    fn read_tag(&mut self, name: &str) -> Result<TagValue> {
        self.with_device(|device| {
            device
                .value(name)
                .cloned()
                .ok_or_else(|| TagError::UnknownTag(name.to_string()))
        })
    }

    fn write_tag(&mut self, name: &str, value: &TagValue) -> Result<()> {
        self.with_device(|device| {
            if device.writes_time_out {
                return Err(TagError::Timeout);
            }
            let tag = device
                .tags
                .iter_mut()
                .find(|tag| tag.name == name)
                .ok_or_else(|| TagError::UnknownTag(name.to_string()))?;
            tag.value = value.clone();
            device.writes.push((name.to_string(), value.clone()));
            Ok(())
        })
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let mut devices = self.devices.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(device) = devices.get_mut(&self.ip) {
            device.sessions_closed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> SimulatedFleet {
        let fleet = SimulatedFleet::new();
        fleet.insert(
            "10.0.0.1",
            SimulatedDevice::new().with_tag("Program:P.X", "DINT", TagValue::Int(1)),
        );
        fleet.insert("10.0.0.2", SimulatedDevice::unreachable());
        fleet
    }

    #[test]
    fn test_connect_unknown_and_unreachable() {
        let fleet = fleet();
        let config = ClientConfig::default();
        assert!(matches!(
            fleet.connect("10.0.0.9", &config),
            Err(TagError::Connection { .. })
        ));
        assert!(matches!(
            fleet.connect("10.0.0.2", &config),
            Err(TagError::Connection { .. })
        ));
    }

    #[test]
    fn test_required_slot() {
        let fleet = SimulatedFleet::new();
        fleet.insert("10.0.0.3", SimulatedDevice::new().with_required_slot(2));
        assert!(fleet.connect("10.0.0.3", &ClientConfig::default()).is_err());
        assert!(fleet
            .connect("10.0.0.3", &ClientConfig::default().emulated())
            .is_ok());
    }

    #[test]
    fn test_write_is_recorded() {
        let fleet = fleet();
        let mut session = fleet.connect("10.0.0.1", &ClientConfig::default()).unwrap();
        session.write_tag("Program:P.X", &TagValue::Int(5)).unwrap();
        session.close();

        let device = fleet.device("10.0.0.1").unwrap();
        assert_eq!(device.value("Program:P.X"), Some(&TagValue::Int(5)));
        assert_eq!(device.writes_to("Program:P.X"), vec![TagValue::Int(5)]);
        assert_eq!(device.sessions_opened, 1);
        assert_eq!(device.sessions_closed, 1);
    }

    #[test]
    fn test_closed_session_rejects_calls() {
        let fleet = fleet();
        let mut session = fleet.connect("10.0.0.1", &ClientConfig::default()).unwrap();
        session.close();
        assert!(session.read_tag("Program:P.X").is_err());
    }

    #[test]
    fn test_unknown_tag_write() {
        let fleet = fleet();
        let mut session = fleet.connect("10.0.0.1", &ClientConfig::default()).unwrap();
        let err = session.write_tag("Nope", &TagValue::Int(1)).unwrap_err();
        assert!(matches!(err, TagError::UnknownTag(_)));
    }

    #[test]
    fn test_from_json_fixture() {
        let fleet = SimulatedFleet::from_json(
            r#"{
                "10.0.0.1": { "tags": [
                    {
                        "name": "Program:P.T",
                        "declared_type": "TIMER",
                        "value": [0,0,0,0,5,0,0,0,10,0,0,0]
                    }
                ] },
                "10.0.0.2": { "reachable": false }
            }"#,
        )
        .unwrap();
        let device = fleet.device("10.0.0.1").unwrap();
        assert!(device.reachable);
        assert_eq!(
            device.value("Program:P.T"),
            Some(&TagValue::Raw(vec![0, 0, 0, 0, 5, 0, 0, 0, 10, 0, 0, 0]))
        );
        assert!(!fleet.device("10.0.0.2").unwrap().reachable);
    }
}
