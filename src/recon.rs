//! Fleet reconnaissance.
//!
//! For every address in the fleet, in order, [`Reconnaissance`] opens a
//! session, enumerates the program-scoped tags, reads and expands each one,
//! and closes the session. A device that cannot be reached, times out, or
//! answers with values of the wrong shape is reported as
//! [`DeviceStatus::Unresponsive`] and the scan moves on to the next device.
//!
//! # Example
//!
//! ```
//! use tagflood::{ClientConfig, Reconnaissance, TagValue};
//! use tagflood::simulator::{SimulatedDevice, SimulatedFleet};
//!
//! let fleet = SimulatedFleet::new();
//! fleet.insert(
//!     "10.0.0.1",
//!     SimulatedDevice::new().with_tag("Program:Main.Speed", "DINT", TagValue::Int(1200)),
//! );
//! fleet.insert("10.0.0.2", SimulatedDevice::unreachable());
//!
//! let recon = Reconnaissance::new(&fleet, ClientConfig::default());
//! let report = recon.run(&["10.0.0.1", "10.0.0.2"]);
//!
//! assert_eq!(report.snapshots.len(), 1);
//! assert_eq!(report.unresponsive.len(), 1);
//! ```

use tracing::{debug, info, warn};

use crate::client::{ClientConfig, Connector, TagSession};
use crate::error::{Result, TagError};
use crate::sheet::DeviceSnapshot;
use crate::store::TabularStore;
use crate::tag::TagSet;

/// Outcome of scanning one device.
#[derive(Debug)]
pub enum DeviceStatus {
    /// The device answered; its snapshot is attached.
    Responsive(DeviceSnapshot),
    /// The device was dropped from this run.
    Unresponsive {
        /// Device address.
        ip: String,
        /// Why it was dropped.
        reason: TagError,
    },
}

/// Result of one reconnaissance run.
#[derive(Debug, Default)]
pub struct ReconReport {
    /// Snapshots of responsive devices, in fleet order.
    pub snapshots: Vec<DeviceSnapshot>,
    /// Dropped devices with the reason, in fleet order.
    pub unresponsive: Vec<(String, TagError)>,
}

impl ReconReport {
    /// Returns whether no device responded.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Writes the snapshots to `store`.
    ///
    /// # Errors
    ///
    /// Returns `TagError::EmptyResult` without touching the store when no
    /// device responded, or any error raised by the store.
    pub fn persist<S: TabularStore + ?Sized>(&self, store: &S) -> Result<()> {
        if self.is_empty() {
            return Err(TagError::EmptyResult);
        }
        store.write_snapshots(&self.snapshots)
    }
}

impl FromIterator<DeviceStatus> for ReconReport {
    fn from_iter<I: IntoIterator<Item = DeviceStatus>>(iter: I) -> Self {
        let mut report = ReconReport::default();
        for status in iter {
            match status {
                DeviceStatus::Responsive(snapshot) => report.snapshots.push(snapshot),
                DeviceStatus::Unresponsive { ip, reason } => report.unresponsive.push((ip, reason)),
            }
        }
        report
    }
}

/// Splits a comma- or newline-separated address list.
///
/// # Example
///
/// ```
/// use tagflood::parse_fleet;
///
/// let fleet = parse_fleet("10.0.0.1, 10.0.0.2,\n10.0.0.3\n");
/// assert_eq!(fleet, ["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
/// ```
pub fn parse_fleet(text: &str) -> Vec<String> {
    text.split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .collect()
}

/// Scans a fleet of controllers.
#[derive(Debug)]
pub struct Reconnaissance<C> {
    connector: C,
    config: ClientConfig,
}

impl<C: Connector> Reconnaissance<C> {
    /// Creates a scanner using `connector` for every device.
    pub fn new(connector: C, config: ClientConfig) -> Self {
        Self { connector, config }
    }

    /// Scans every address in order and collects the results.
    pub fn run<S: AsRef<str>>(&self, fleet: &[S]) -> ReconReport {
        info!(devices = fleet.len(), "Started gathering tags");
        let report: ReconReport = fleet.iter().map(|ip| self.scan_device(ip.as_ref())).collect();
        info!(
            responsive = report.snapshots.len(),
            unresponsive = report.unresponsive.len(),
            "Reconnaissance finished"
        );
        report
    }

    /// Scans a single device.
    pub fn scan_device(&self, ip: &str) -> DeviceStatus {
        match self.snapshot(ip) {
            Ok(snapshot) => {
                info!(ip, rows = snapshot.rows.len(), "Device scanned");
                DeviceStatus::Responsive(snapshot)
            }
            Err(reason) => {
                warn!(ip, error = %reason, "Device is not responding. Skipping...");
                DeviceStatus::Unresponsive {
                    ip: ip.to_string(),
                    reason,
                }
            }
        }
    }

    fn snapshot(&self, ip: &str) -> Result<DeviceSnapshot> {
        let mut session = self.connector.connect(ip, &self.config)?;
        let result = collect_tags(&mut session);
        session.close();
        Ok(DeviceSnapshot::from_tags(ip, result?))
    }
}

/// Reads and expands every program-scoped tag of an open session.
///
/// Tags with a malformed buffer are skipped; any other error aborts the
/// device.
fn collect_tags<S: TagSession>(session: &mut S) -> Result<TagSet> {
    let mut tags = TagSet::new();
    let listed = session.list_tags()?;
    for info in listed.iter().filter(|info| info.is_program_scoped()) {
        let value = session.read_tag(&info.name)?;
        match tags.push_expanded(info, value) {
            Ok(rows) => debug!(tag = %info.name, rows, "Tag expanded"),
            Err(err @ TagError::MalformedBuffer { .. }) => {
                warn!(tag = %info.name, error = %err, "Skipping tag");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(tags)
}
