//! Tag rows and composite-type expansion.
//!
//! A controller enumerates its tags as `(name, declared type)` pairs. After
//! reading each tag, the structured ones are flattened into addressable
//! sub-tags:
//!
//! | Declared type | Rows emitted |
//! |---------------|--------------|
//! | `COUNTER`, `TIMER` | one row `<tag>.PRE` holding the preset |
//! | `PID` | 21 rows `<tag>.<FIELD>`, none for `<tag>` itself |
//! | anything else | one row with the value as read |
//!
//! Expansion appends to a fresh [`TagSet`] per source tag, so rows for one
//! source tag are always contiguous and in discovery order.
//!
//! # Example
//!
//! ```
//! use tagflood::{TagInfo, TagSet, TagValue};
//!
//! let mut set = TagSet::new();
//! let timer = [0, 0, 0, 0, 5, 0, 0, 0, 10, 0, 0, 0];
//! set.push_expanded(&TagInfo::new("Program:Main.T1", "TIMER"), TagValue::Raw(timer.to_vec()))
//!     .unwrap();
//! set.push_expanded(&TagInfo::new("Program:Main.Speed", "DINT"), TagValue::Int(1500))
//!     .unwrap();
//!
//! let names: Vec<&str> = set.names().collect();
//! assert_eq!(names, ["Program:Main.T1.PRE", "Program:Main.Speed"]);
//! ```

use serde::{Deserialize, Serialize};

use crate::codec::{decode, DecodedStruct, StructKind};
use crate::error::{Result, TagError};
use crate::value::TagValue;

/// Substring that marks a tag as belonging to a user program.
pub const PROGRAM_SCOPE_MARKER: &str = "Program";

/// Type label given to every PID sub-tag row.
pub const PID_TYPE_LABEL: &str = "PID";

/// A tag as enumerated by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Full tag name.
    pub name: String,
    /// Declared data type (e.g. `DINT`, `COUNTER`).
    pub declared_type: String,
}

impl TagInfo {
    /// Creates a new tag description.
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    /// Returns whether this tag has a name and type and lives in program scope.
    ///
    /// # Example
    ///
    /// ```
    /// use tagflood::TagInfo;
    ///
    /// assert!(TagInfo::new("Program:MainProgram.Count", "DINT").is_program_scoped());
    /// assert!(!TagInfo::new("Local:1:I", "AB:1756_DI:I:0").is_program_scoped());
    /// assert!(!TagInfo::new("Program:MainProgram.X", "").is_program_scoped());
    /// ```
    pub fn is_program_scoped(&self) -> bool {
        !self.name.is_empty()
            && !self.declared_type.is_empty()
            && self.name.contains(PROGRAM_SCOPE_MARKER)
    }

    /// Classifies the declared type.
    pub fn kind(&self) -> TagKind {
        TagKind::classify(&self.declared_type)
    }
}

/// Expansion class of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// A structure reported through its preset only.
    Preset(StructKind),
    /// A PID block expanded into all of its fields.
    Pid,
    /// Any other type, reported as read.
    Generic,
}

impl TagKind {
    /// Classifies a declared type name, ignoring ASCII case.
    ///
    /// # Example
    ///
    /// ```
    /// use tagflood::TagKind;
    /// use tagflood::codec::StructKind;
    ///
    /// assert_eq!(TagKind::classify("COUNTER"), TagKind::Preset(StructKind::Counter));
    /// assert_eq!(TagKind::classify("pid"), TagKind::Pid);
    /// assert_eq!(TagKind::classify("REAL"), TagKind::Generic);
    /// ```
    pub fn classify(declared_type: &str) -> Self {
        let declared = declared_type.trim();
        if declared.eq_ignore_ascii_case("COUNTER") {
            TagKind::Preset(StructKind::Counter)
        } else if declared.eq_ignore_ascii_case("TIMER") {
            TagKind::Preset(StructKind::Timer)
        } else if declared.eq_ignore_ascii_case("PID") {
            TagKind::Pid
        } else {
            TagKind::Generic
        }
    }
}

/// One reported tag value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRow {
    /// Tag (or sub-tag) name.
    pub name: String,
    /// Declared type label.
    pub declared_type: String,
    /// Value as read or decoded.
    pub value: TagValue,
}

impl TagRow {
    /// Creates a new row.
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        value: impl Into<TagValue>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            value: value.into(),
        }
    }
}

/// Expands one read tag into its report rows.
///
/// # Errors
///
/// - `TagError::TypeMismatch` if a structured type was not read as a raw buffer
/// - `TagError::MalformedBuffer` if the buffer is too short for its layout
pub fn expand(info: &TagInfo, value: TagValue) -> Result<Vec<TagRow>> {
    match info.kind() {
        TagKind::Preset(structure) => {
            let pre = match decode(raw_buffer(info, &value, structure)?, structure)? {
                DecodedStruct::Counter(counter) => counter.pre,
                DecodedStruct::Timer(timer) => timer.pre,
                DecodedStruct::Pid(_) => {
                    return Err(TagError::type_mismatch(&info.name, "preset structure"))
                }
            };
            Ok(vec![TagRow::new(
                format!("{}.PRE", info.name),
                info.declared_type.clone(),
                pre,
            )])
        }
        TagKind::Pid => {
            let buffer = raw_buffer(info, &value, StructKind::Pid)?;
            let DecodedStruct::Pid(pid) = decode(buffer, StructKind::Pid)? else {
                return Err(TagError::type_mismatch(&info.name, "PID structure"));
            };
            Ok(pid
                .fields()
                .into_iter()
                .map(|(field, value)| {
                    TagRow::new(format!("{}.{}", info.name, field), PID_TYPE_LABEL, value)
                })
                .collect())
        }
        TagKind::Generic => Ok(vec![TagRow::new(
            info.name.clone(),
            info.declared_type.clone(),
            value,
        )]),
    }
}

fn raw_buffer<'a>(info: &TagInfo, value: &'a TagValue, structure: StructKind) -> Result<&'a [u8]> {
    value
        .as_raw()
        .ok_or_else(|| TagError::type_mismatch(&info.name, format!("{} buffer", structure)))
}

/// Ordered tag rows of one device.
///
/// Names, types and values are projections of the same row vector and can
/// never drift apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagSet {
    rows: Vec<TagRow>,
}

impl TagSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands `info` and appends the resulting rows.
    ///
    /// Returns the number of rows appended. On error nothing is appended.
    pub fn push_expanded(&mut self, info: &TagInfo, value: TagValue) -> Result<usize> {
        let rows = expand(info, value)?;
        let count = rows.len();
        self.rows.extend(rows);
        Ok(count)
    }

    /// Appends a row as is.
    pub fn push(&mut self, row: TagRow) {
        self.rows.push(row);
    }

    /// Rows in order.
    pub fn rows(&self) -> &[TagRow] {
        &self.rows
    }

    /// Consumes the set, returning its rows.
    pub fn into_rows(self) -> Vec<TagRow> {
        self.rows
    }

    /// Row names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|row| row.name.as_str())
    }

    /// Row type labels in order.
    pub fn types(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|row| row.declared_type.as_str())
    }

    /// Row values in order.
    pub fn values(&self) -> impl Iterator<Item = &TagValue> + '_ {
        self.rows.iter().map(|row| &row.value)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<TagRow> for TagSet {
    fn from_iter<I: IntoIterator<Item = TagRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
