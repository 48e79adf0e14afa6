//! Repeated value injection.
//!
//! [`FloodEngine`] replays a workbook onto its devices again and again.
//! Each iteration visits the devices in sheet order, opens a fresh session,
//! writes every row in row order and closes the session. Rows with an empty
//! `Step` write their `Value` every time; rows with a `Step` write their
//! `StartValue` and then advance it by `Step`.
//!
//! The loop runs until its [`CancelToken`] fires. Cancellation is honoured
//! between iterations only, so an iteration that has started always finishes
//! its devices. Values already written are left in place.
//!
//! # Example
//!
//! ```
//! use tagflood::{
//!     CancelToken, ClientConfig, DeviceSnapshot, FloodConfig, FloodEngine, FloodPlan, FloodRow,
//!     TagValue,
//! };
//! use tagflood::simulator::{SimulatedDevice, SimulatedFleet};
//!
//! let fleet = SimulatedFleet::new();
//! fleet.insert(
//!     "10.0.0.1",
//!     SimulatedDevice::new().with_tag("Program:Main.C.PRE", "COUNTER", TagValue::Int(0)),
//! );
//!
//! let plan = FloodPlan::new(vec![DeviceSnapshot {
//!     ip: "10.0.0.1".into(),
//!     rows: vec![FloodRow::new("Program:Main.C.PRE", "COUNTER", TagValue::Int(0))
//!         .with_ramp(TagValue::Int(10), TagValue::Int(2))],
//! }]);
//! let config = FloodConfig::default().with_max_iterations(3);
//! let mut engine = FloodEngine::new(&fleet, ClientConfig::default(), plan, config)?;
//! let summary = engine.run(&CancelToken::new());
//!
//! assert_eq!(summary.iterations, 3);
//! let written = fleet.device("10.0.0.1").unwrap().writes_to("Program:Main.C.PRE");
//! assert_eq!(written, [TagValue::Int(10), TagValue::Int(12), TagValue::Int(14)]);
//! # Ok::<(), tagflood::TagError>(())
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::client::{ClientConfig, Connector, TagSession};
use crate::error::{Result, TagError};
use crate::sheet::DeviceSnapshot;
use crate::store::TabularStore;

/// Default number of iterations between progress notices.
pub const DEFAULT_PROGRESS_EVERY: u64 = 1000;

const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Cooperative cancellation flag shared between the loop and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` or until cancelled, whichever comes first.
    ///
    /// Returns `true` if the token fired.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// Loop timing.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodConfig {
    /// Pause after every iteration.
    pub interval: Duration,
    /// Iterations between progress notices.
    pub progress_every: u64,
    /// Stop after this many iterations; `None` runs until cancelled.
    pub max_iterations: Option<u64>,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            interval: Duration::ZERO,
            progress_every: DEFAULT_PROGRESS_EVERY,
            max_iterations: None,
        }
    }
}

impl FloodConfig {
    /// Creates a configuration pausing `interval` between iterations.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Creates a configuration from an operator-supplied interval in seconds.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidParameter` for negative, infinite or NaN values.
    ///
    /// # Example
    ///
    /// ```
    /// use tagflood::FloodConfig;
    /// use std::time::Duration;
    ///
    /// assert_eq!(FloodConfig::from_secs(0.25).unwrap().interval, Duration::from_millis(250));
    /// assert!(FloodConfig::from_secs(-1.0).is_err());
    /// ```
    pub fn from_secs(secs: f64) -> Result<Self> {
        let interval = Duration::try_from_secs_f64(secs).map_err(|_| {
            TagError::invalid_parameter("interval", "must be a non-negative number of seconds")
        })?;
        Ok(Self::new(interval))
    }

    /// Sets the progress notice cadence (at least 1).
    pub fn with_progress_every(mut self, iterations: u64) -> Self {
        self.progress_every = iterations.max(1);
        self
    }

    /// Bounds the loop to `iterations`.
    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
}

/// Devices and rows to inject, in injection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloodPlan {
    devices: Vec<DeviceSnapshot>,
}

impl FloodPlan {
    /// Creates a plan from per-device sheets.
    pub fn new(devices: Vec<DeviceSnapshot>) -> Self {
        Self { devices }
    }

    /// Loads every sheet of a workbook.
    pub fn load<S: TabularStore + ?Sized>(store: &S) -> Result<Self> {
        store.read_snapshots().map(Self::new)
    }

    /// Checks every row before any device is contacted.
    ///
    /// # Errors
    ///
    /// Returns the first row error found, naming the row's tag.
    pub fn validate(&self) -> Result<()> {
        for device in &self.devices {
            for row in &device.rows {
                row.validate()?;
            }
        }
        Ok(())
    }

    /// Devices in order, with their current ramp state.
    pub fn devices(&self) -> &[DeviceSnapshot] {
        &self.devices
    }
}

/// What happened during one iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// Devices whose rows were all written.
    pub devices_written: usize,
    /// Devices skipped after a failure.
    pub devices_skipped: usize,
    /// Rows written across all devices.
    pub rows_written: usize,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloodSummary {
    /// Completed iterations.
    pub iterations: u64,
    /// Rows written across all iterations.
    pub rows_written: u64,
    /// Device visits skipped after a failure.
    pub devices_skipped: u64,
    /// Progress notices logged.
    pub progress_notices: u64,
}

/// Drives a [`FloodPlan`] onto the fleet.
#[derive(Debug)]
pub struct FloodEngine<C> {
    connector: C,
    client: ClientConfig,
    plan: FloodPlan,
    config: FloodConfig,
    iterations: u64,
}

impl<C: Connector> FloodEngine<C> {
    /// Creates an engine after validating `plan`.
    ///
    /// # Errors
    ///
    /// Returns the plan validation error; no device is contacted.
    pub fn new(
        connector: C,
        client: ClientConfig,
        plan: FloodPlan,
        config: FloodConfig,
    ) -> Result<Self> {
        plan.validate()?;
        Ok(Self {
            connector,
            client,
            plan,
            config,
            iterations: 0,
        })
    }

    /// The plan with its current ramp state.
    pub fn plan(&self) -> &FloodPlan {
        &self.plan
    }

    /// Iterations completed so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Runs until `cancel` fires or the iteration limit is reached.
    pub fn run(&mut self, cancel: &CancelToken) -> FloodSummary {
        let mut summary = FloodSummary::default();
        info!(devices = self.plan.devices.len(), "Flooding...");

        while !cancel.is_cancelled() {
            if self
                .config
                .max_iterations
                .is_some_and(|max| self.iterations >= max)
            {
                break;
            }

            let report = self.inject_once();
            summary.rows_written += report.rows_written as u64;
            summary.devices_skipped += report.devices_skipped as u64;

            let cancelled = cancel.sleep(self.config.interval);
            self.iterations += 1;
            if self.iterations % self.config.progress_every.max(1) == 0 {
                info!(iterations = self.iterations, "Flood progress");
                summary.progress_notices += 1;
            }
            if cancelled {
                break;
            }
        }

        summary.iterations = self.iterations;
        info!(iterations = summary.iterations, "Flood stopped");
        summary
    }

    /// Runs a single iteration over every device.
    pub fn inject_once(&mut self) -> IterationReport {
        let mut report = IterationReport::default();
        for device in &mut self.plan.devices {
            match inject_device(&self.connector, &self.client, device) {
                Ok(rows) => {
                    report.devices_written += 1;
                    report.rows_written += rows;
                }
                Err(err) => {
                    warn!(ip = %device.ip, error = %err, "Skipping device for this iteration");
                    report.devices_skipped += 1;
                }
            }
        }
        report
    }
}

/// Writes every row of one device through a fresh session.
///
/// Ramp state of a row advances only after its value was written.
fn inject_device<C: Connector>(
    connector: &C,
    client: &ClientConfig,
    device: &mut DeviceSnapshot,
) -> Result<usize> {
    let mut session = connector.connect(&device.ip, client)?;
    let mut written = 0;
    let result = device.rows.iter_mut().try_for_each(|row| {
        let value = row.current_value()?;
        debug!(tag = %row.tag, %value, "Writing");
        session.write_tag(&row.tag, &value)?;
        row.advance()?;
        written += 1;
        Ok::<(), TagError>(())
    });
    session.close();
    result.map(|()| written)
}
