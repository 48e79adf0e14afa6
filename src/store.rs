//! Persisted snapshot workbooks.
//!
//! A workbook holds one labeled sheet per device, in fleet order. The
//! [`TabularStore`] trait keeps the orchestration code independent of the
//! file format; [`JsonWorkbook`] stores the workbook as a single JSON
//! document:
//!
//! ```json
//! {
//!   "sheets": [
//!     {
//!       "name": "10.0.0.1",
//!       "rows": [
//!         { "Tag": "Program:Main.C1.PRE", "TagType": "COUNTER", "Value": 100, "Step": null, "StartValue": null }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TagError};
use crate::sheet::{DeviceSnapshot, FloodRow};

/// Reads and writes per-device sheets.
pub trait TabularStore {
    /// Writes one sheet per snapshot, replacing any previous workbook.
    fn write_snapshots(&self, snapshots: &[DeviceSnapshot]) -> Result<()>;

    /// Loads every sheet, preserving sheet and row order.
    fn read_snapshots(&self) -> Result<Vec<DeviceSnapshot>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Sheet {
    name: String,
    rows: Vec<FloodRow>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Workbook {
    sheets: Vec<Sheet>,
}

/// A workbook stored as one JSON file.
#[derive(Debug, Clone)]
pub struct JsonWorkbook {
    path: PathBuf,
}

impl JsonWorkbook {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn check_unique_labels<'a>(labels: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label) {
            return Err(TagError::invalid_parameter(
                "sheet",
                format!("duplicate sheet '{}'", label),
            ));
        }
    }
    Ok(())
}

impl TabularStore for JsonWorkbook {
    fn write_snapshots(&self, snapshots: &[DeviceSnapshot]) -> Result<()> {
        check_unique_labels(snapshots.iter().map(|s| s.ip.as_str()))?;
        let workbook = Workbook {
            sheets: snapshots
                .iter()
                .map(|snapshot| Sheet {
                    name: snapshot.ip.clone(),
                    rows: snapshot.rows.clone(),
                })
                .collect(),
        };
        let text = serde_json::to_string_pretty(&workbook)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    fn read_snapshots(&self) -> Result<Vec<DeviceSnapshot>> {
        let text = std::fs::read_to_string(&self.path)?;
        let workbook: Workbook = serde_json::from_str(&text)?;
        check_unique_labels(workbook.sheets.iter().map(|s| s.name.as_str()))?;
        Ok(workbook
            .sheets
            .into_iter()
            .map(|sheet| DeviceSnapshot {
                ip: sheet.name,
                rows: sheet.rows,
            })
            .collect())
    }
}
