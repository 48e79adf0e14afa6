//! Scalar tag values.
//!
//! [`TagValue`] is what a tag read returns and what a tag write sends.
//! Structured types (counters, timers, PID blocks) come back as
//! [`TagValue::Raw`] and are only interpreted by the [`codec`](crate::codec).

use serde::{Deserialize, Serialize};

use crate::error::{Result, TagError};

/// A single tag value.
///
/// Serialized untagged so that workbook cells read naturally:
/// `true`, `42`, `1.5`, `"text"`, or a byte array for raw buffers.
/// Non-finite reals have no JSON number form and are written as
/// `{"real": "NaN"}`, `{"real": "inf"}` or `{"real": "-inf"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Cell", into = "Cell")]
pub enum TagValue {
    /// BOOL.
    Bool(bool),
    /// Any integer type (SINT, INT, DINT, LINT).
    Int(i64),
    /// REAL / LREAL.
    Real(f64),
    /// STRING.
    Text(String),
    /// Undecoded structure bytes.
    Raw(Vec<u8>),
}

impl TagValue {
    /// Returns whether the value is numeric (`Int` or `Real`).
    pub fn is_numeric(&self) -> bool {
        matches!(self, TagValue::Int(_) | TagValue::Real(_))
    }

    /// Returns the raw bytes if this is a structure buffer.
    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            TagValue::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns whether a workbook cell holding this value should count as empty.
    pub fn is_blank(&self) -> bool {
        match self {
            TagValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Adds a ramp step to this value.
    ///
    /// Integer plus integer stays an integer; any mix with a real becomes a real.
    ///
    /// # Errors
    ///
    /// Returns `TagError::TypeMismatch` if either side is not numeric or the
    /// integer sum overflows.
    ///
    /// # Example
    ///
    /// ```
    /// use tagflood::TagValue;
    ///
    /// let next = TagValue::Int(10).checked_add(&TagValue::Int(2)).unwrap();
    /// assert_eq!(next, TagValue::Int(12));
    ///
    /// let next = TagValue::Int(1).checked_add(&TagValue::Real(0.5)).unwrap();
    /// assert_eq!(next, TagValue::Real(1.5));
    /// ```
    pub fn checked_add(&self, step: &TagValue) -> Result<TagValue> {
        match (self, step) {
            (TagValue::Int(a), TagValue::Int(b)) => a
                .checked_add(*b)
                .map(TagValue::Int)
                .ok_or_else(|| TagError::type_mismatch("ramp", "sum within the i64 range")),
            (TagValue::Int(a), TagValue::Real(b)) => Ok(TagValue::Real(*a as f64 + b)),
            (TagValue::Real(a), TagValue::Int(b)) => Ok(TagValue::Real(a + *b as f64)),
            (TagValue::Real(a), TagValue::Real(b)) => Ok(TagValue::Real(a + b)),
            _ => Err(TagError::type_mismatch("ramp", "numeric start value and step")),
        }
    }
}

/// Workbook cell form of a [`TagValue`].
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Cell {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    Raw(Vec<u8>),
    NonFinite { real: String },
}

impl From<TagValue> for Cell {
    fn from(value: TagValue) -> Self {
        match value {
            TagValue::Bool(v) => Cell::Bool(v),
            TagValue::Int(v) => Cell::Int(v),
            TagValue::Real(v) if v.is_finite() => Cell::Real(v),
            TagValue::Real(v) => Cell::NonFinite {
                real: v.to_string(),
            },
            TagValue::Text(v) => Cell::Text(v),
            TagValue::Raw(bytes) => Cell::Raw(bytes),
        }
    }
}

impl TryFrom<Cell> for TagValue {
    type Error = TagError;

    fn try_from(cell: Cell) -> Result<Self> {
        Ok(match cell {
            Cell::Bool(v) => TagValue::Bool(v),
            Cell::Int(v) => TagValue::Int(v),
            Cell::Real(v) => TagValue::Real(v),
            Cell::Text(v) => TagValue::Text(v),
            Cell::Raw(bytes) => TagValue::Raw(bytes),
            Cell::NonFinite { real } => real.parse().map(TagValue::Real).map_err(|_| {
                TagError::invalid_parameter("real", format!("'{}' is not a real", real))
            })?,
        })
    }
}

impl std::fmt::Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagValue::Bool(v) => write!(f, "{}", v),
            TagValue::Int(v) => write!(f, "{}", v),
            TagValue::Real(v) => write!(f, "{}", v),
            TagValue::Text(v) => write!(f, "{}", v),
            TagValue::Raw(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl From<i32> for TagValue {
    fn from(value: i32) -> Self {
        TagValue::Int(i64::from(value))
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}

impl From<f32> for TagValue {
    fn from(value: f32) -> Self {
        TagValue::Real(f64::from(value))
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Real(value)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}
