//! # tagflood
//!
//! Tag reconnaissance and value injection for fleets of PLCs.
//!
//! The crate has two jobs:
//!
//! - **Reconnaissance**: enumerate the program-scoped tags of every
//!   controller in a fleet, decode counters, timers and PID blocks into
//!   named fields, and save one sheet per responsive device.
//! - **Flood**: replay an (operator-edited) workbook onto the fleet in a
//!   loop, writing static values or ramping values up by a fixed step every
//!   iteration, until cancelled.
//!
//! The controller protocol is not part of this crate. A backend implements
//! [`Connector`] and [`TagSession`]; the [`simulator`] module provides an
//! in-memory implementation.
//!
//! ## Quick Start
//!
//! ```
//! use tagflood::{ClientConfig, JsonWorkbook, Reconnaissance, TagValue};
//! use tagflood::simulator::{SimulatedDevice, SimulatedFleet};
//!
//! let fleet = SimulatedFleet::new();
//! fleet.insert(
//!     "10.0.0.1",
//!     SimulatedDevice::new()
//!         .with_tag("Program:Main.Speed", "DINT", TagValue::Int(1500))
//!         .with_tag("Program:Main.Run", "BOOL", TagValue::Bool(true)),
//! );
//!
//! let recon = Reconnaissance::new(&fleet, ClientConfig::default());
//! let report = recon.run(&["10.0.0.1"]);
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = JsonWorkbook::new(dir.path().join("tags.json"));
//! report.persist(&store)?;
//! # Ok::<(), tagflood::TagError>(())
//! ```
//!
//! ## Composite Types
//!
//! | Declared type | Reported rows |
//! |---------------|---------------|
//! | `COUNTER` | `<tag>.PRE` |
//! | `TIMER` | `<tag>.PRE` |
//! | `PID` | `<tag>.SP` … `<tag>.PE` (21 rows) |
//! | other | `<tag>` as read |
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, TagError>`]. During reconnaissance a
//! connection failure, timeout or type mismatch drops that device only; a
//! malformed structure buffer drops that tag only. During a flood a failing
//! device is skipped for the current iteration.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod client;
pub mod codec;
mod error;
mod flood;
mod recon;
mod sheet;
pub mod simulator;
mod store;
mod tag;
pub mod utils;
mod value;

// Public re-exports
pub use client::{
    ClientConfig, Connector, TagSession, DEFAULT_PORT, DEFAULT_TIMEOUT, EMULATOR_SLOT,
};
pub use error::{Result, TagError};
pub use flood::{
    CancelToken, FloodConfig, FloodEngine, FloodPlan, FloodSummary, IterationReport,
    DEFAULT_PROGRESS_EVERY,
};
pub use recon::{parse_fleet, DeviceStatus, ReconReport, Reconnaissance};
pub use sheet::{DeviceSnapshot, FloodRow, COLUMNS};
pub use store::{JsonWorkbook, TabularStore};
pub use tag::{expand, TagInfo, TagKind, TagRow, TagSet, PID_TYPE_LABEL, PROGRAM_SCOPE_MARKER};
pub use value::TagValue;
