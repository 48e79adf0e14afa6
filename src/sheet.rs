//! Per-device sheets: the editable form of a reconnaissance snapshot.
//!
//! A sheet row carries the tag, its type label and value, plus two columns
//! left empty by reconnaissance for the operator to fill in:
//!
//! | Column | Meaning |
//! |--------|---------|
//! | `Tag` | tag or sub-tag name |
//! | `TagType` | declared type label |
//! | `Value` | value written when `Step` is empty |
//! | `Step` | ramp increment; empty for a static value |
//! | `StartValue` | first ramp value, advanced by `Step` after every write |

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TagError};
use crate::tag::{TagRow, TagSet};
use crate::value::TagValue;

/// Column headers in sheet order.
pub const COLUMNS: [&str; 5] = ["Tag", "TagType", "Value", "Step", "StartValue"];

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<TagValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = Option::<TagValue>::deserialize(deserializer)?;
    Ok(cell.filter(|value| !value.is_blank()))
}

/// One editable sheet row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodRow {
    /// Tag name.
    #[serde(rename = "Tag")]
    pub tag: String,
    /// Declared type label.
    #[serde(rename = "TagType")]
    pub tag_type: String,
    /// Static value.
    #[serde(rename = "Value")]
    pub value: TagValue,
    /// Ramp increment; `None` means static injection.
    #[serde(rename = "Step", default, deserialize_with = "blank_as_none")]
    pub step: Option<TagValue>,
    /// Next ramp value.
    #[serde(rename = "StartValue", default, deserialize_with = "blank_as_none")]
    pub start_value: Option<TagValue>,
}

impl FloodRow {
    /// Creates a static row.
    pub fn new(tag: impl Into<String>, tag_type: impl Into<String>, value: TagValue) -> Self {
        Self {
            tag: tag.into(),
            tag_type: tag_type.into(),
            value,
            step: None,
            start_value: None,
        }
    }

    /// Turns the row into a ramp starting at `start` and advancing by `step`.
    pub fn with_ramp(mut self, start: TagValue, step: TagValue) -> Self {
        self.start_value = Some(start);
        self.step = Some(step);
        self
    }

    /// Returns whether the row ramps rather than repeating `value`.
    pub fn is_ramp(&self) -> bool {
        self.step.is_some()
    }

    /// Returns the value to write this iteration without touching ramp state.
    ///
    /// Static rows return `value`. Ramp rows return the current start value.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidParameter` for a ramp without a start value.
    ///
    /// # Example
    ///
    /// ```
    /// use tagflood::{FloodRow, TagValue};
    ///
    /// let mut row = FloodRow::new("Program:P.C.PRE", "COUNTER", TagValue::Int(0))
    ///     .with_ramp(TagValue::Int(10), TagValue::Int(2));
    /// assert_eq!(row.current_value().unwrap(), TagValue::Int(10));
    /// row.advance().unwrap();
    /// assert_eq!(row.current_value().unwrap(), TagValue::Int(12));
    /// ```
    pub fn current_value(&self) -> Result<TagValue> {
        if self.step.is_none() {
            return Ok(self.value.clone());
        }
        self.start_value
            .clone()
            .ok_or_else(|| TagError::invalid_parameter(&self.tag, "ramp rows need a StartValue"))
    }

    /// Moves a ramp row on to `start + step`. Static rows are unchanged.
    ///
    /// Call only after the current value was written.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidParameter` for a ramp without a start value,
    /// or `TagError::TypeMismatch` if the sum cannot be computed. State is
    /// left untouched on error.
    pub fn advance(&mut self) -> Result<()> {
        let Some(step) = &self.step else {
            return Ok(());
        };
        let Some(current) = &self.start_value else {
            return Err(TagError::invalid_parameter(
                &self.tag,
                "ramp rows need a StartValue",
            ));
        };
        let next = current
            .checked_add(step)
            .map_err(|_| TagError::type_mismatch(&self.tag, "numeric StartValue and Step"))?;
        self.start_value = Some(next);
        Ok(())
    }

    /// Checks that a ramp row can produce at least one value.
    pub fn validate(&self) -> Result<()> {
        match (&self.step, &self.start_value) {
            (None, _) => Ok(()),
            (Some(_), None) => Err(TagError::invalid_parameter(
                &self.tag,
                "ramp rows need a StartValue",
            )),
            (Some(step), Some(start)) if !(step.is_numeric() && start.is_numeric()) => Err(
                TagError::type_mismatch(&self.tag, "numeric StartValue and Step"),
            ),
            _ => Ok(()),
        }
    }
}

impl From<TagRow> for FloodRow {
    fn from(row: TagRow) -> Self {
        FloodRow::new(row.name, row.declared_type, row.value)
    }
}

/// One device's rows, labeled by address.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    /// Controller address; also the sheet label.
    pub ip: String,
    /// Rows in tag order.
    pub rows: Vec<FloodRow>,
}

impl DeviceSnapshot {
    /// Builds a snapshot from expanded tags, with empty `Step` and `StartValue`.
    pub fn from_tags(ip: impl Into<String>, tags: TagSet) -> Self {
        Self {
            ip: ip.into(),
            rows: tags.into_rows().into_iter().map(FloodRow::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_row_repeats_value() {
        let mut row = FloodRow::new("T", "DINT", TagValue::Int(7));
        for _ in 0..3 {
            assert_eq!(row.current_value().unwrap(), TagValue::Int(7));
            row.advance().unwrap();
        }
        assert_eq!(row.start_value, None);
    }

    #[test]
    fn test_ramp_progression() {
        let mut row = FloodRow::new("T", "DINT", TagValue::Int(0))
            .with_ramp(TagValue::Int(10), TagValue::Int(2));
        assert_eq!(row.current_value().unwrap(), TagValue::Int(10));
        assert_eq!(row.current_value().unwrap(), TagValue::Int(10));
        row.advance().unwrap();
        assert_eq!(row.start_value, Some(TagValue::Int(12)));
        assert_eq!(row.current_value().unwrap(), TagValue::Int(12));
        row.advance().unwrap();
        assert_eq!(row.start_value, Some(TagValue::Int(14)));
    }

    #[test]
    fn test_ramp_without_start_is_rejected() {
        let mut row = FloodRow::new("T", "DINT", TagValue::Int(0));
        row.step = Some(TagValue::Int(1));
        assert!(row.validate().is_err());
        assert!(matches!(
            row.current_value(),
            Err(TagError::InvalidParameter { .. })
        ));
        assert!(row.advance().is_err());
    }

    #[test]
    fn test_non_numeric_ramp_is_rejected() {
        let mut row = FloodRow::new("T", "STRING", TagValue::from("a"))
            .with_ramp(TagValue::from("a"), TagValue::Int(1));
        assert!(row.validate().is_err());
        assert!(row.advance().is_err());
        assert_eq!(row.start_value, Some(TagValue::from("a")));
    }

    #[test]
    fn test_blank_cells_read_as_empty() {
        let row: FloodRow = serde_json::from_str(
            r#"{"Tag":"T","TagType":"DINT","Value":3,"Step":"","StartValue":null}"#,
        )
        .unwrap();
        assert_eq!(row.step, None);
        assert_eq!(row.start_value, None);

        let row: FloodRow =
            serde_json::from_str(r#"{"Tag":"T","TagType":"DINT","Value":3}"#).unwrap();
        assert!(!row.is_ramp());
    }

    #[test]
    fn test_snapshot_rows_have_empty_edit_columns() {
        let tags: TagSet = vec![TagRow::new("A", "DINT", 1), TagRow::new("B", "BOOL", true)]
            .into_iter()
            .collect();
        let snapshot = DeviceSnapshot::from_tags("10.0.0.1", tags);
        assert_eq!(snapshot.rows.len(), 2);
        assert!(snapshot
            .rows
            .iter()
            .all(|row| row.step.is_none() && row.start_value.is_none()));
    }
}
