//! Decoding of structured tag buffers.
//!
//! Counters, timers and PID blocks are read from the controller as raw byte
//! buffers with a fixed memory layout. This module turns those buffers into
//! typed structures. Decoding is pure: no I/O, no state.
//!
//! # Layout
//!
//! Every structure begins with a 32-bit status word holding the flag bits.
//! Numeric members follow, little-endian, four bytes each.
//!
//! | Structure | Offset 0 | Offset 4.. | Status flags (bit) | Size |
//! |-----------|----------|------------|--------------------|------|
//! | Counter | status | PRE, ACC (i32) | CU 31, CD 30, DN 29, OV 28, UN 27 | 12 |
//! | Timer | status | PRE, ACC (i32) | EN 31, TT 30, DN 29 | 12 |
//! | PID | status | SP..UPD (12 × f32) | EN 31 … PE 23 | 52 |
//!
//! # Example
//!
//! ```
//! use tagflood::codec::{decode, DecodedStruct, StructKind};
//!
//! let buffer = [0x00, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00];
//! match decode(&buffer, StructKind::Timer).unwrap() {
//!     DecodedStruct::Timer(timer) => {
//!         assert_eq!(timer.pre, 5);
//!         assert_eq!(timer.acc, 10);
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use crate::error::{Result, TagError};
use crate::utils::{get_bit, read_f32_le, read_i32_le, read_u32_le};
use crate::value::TagValue;

/// Byte length of a counter or timer buffer.
pub const COUNTER_TIMER_SIZE: usize = 12;

/// Byte length of a PID buffer.
pub const PID_SIZE: usize = 52;

/// Number of named PID fields.
pub const PID_FIELD_COUNT: usize = 21;

/// PID field names in declaration order: the twelve reals, then the nine flags.
pub const PID_FIELD_NAMES: [&str; PID_FIELD_COUNT] = [
    "SP", "KP", "KI", "KD", "BIAS", "MAXS", "MINS", "DB", "SO", "MAXO", "MINO", "UPD", "EN", "CT",
    "CL", "PVT", "DOE", "SWM", "CA", "MO", "PE",
];

/// Structured types with a known memory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructKind {
    /// COUNTER.
    Counter,
    /// TIMER.
    Timer,
    /// PID.
    Pid,
}

impl StructKind {
    /// Minimum buffer length for this structure.
    pub fn size(self) -> usize {
        match self {
            StructKind::Counter | StructKind::Timer => COUNTER_TIMER_SIZE,
            StructKind::Pid => PID_SIZE,
        }
    }

    /// Name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            StructKind::Counter => "Counter",
            StructKind::Timer => "Timer",
            StructKind::Pid => "PID",
        }
    }
}

impl std::fmt::Display for StructKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded COUNTER structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    /// Preset.
    pub pre: i32,
    /// Accumulated count.
    pub acc: i32,
    /// Count-up enabled.
    pub cu: bool,
    /// Count-down enabled.
    pub cd: bool,
    /// Done.
    pub dn: bool,
    /// Overflow.
    pub ov: bool,
    /// Underflow.
    pub un: bool,
}

/// Decoded TIMER structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    /// Preset.
    pub pre: i32,
    /// Accumulated time.
    pub acc: i32,
    /// Enabled.
    pub en: bool,
    /// Timing.
    pub tt: bool,
    /// Done.
    pub dn: bool,
}

/// Decoded PID structure.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub struct Pid {
    pub sp: f32,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub bias: f32,
    pub maxs: f32,
    pub mins: f32,
    pub db: f32,
    pub so: f32,
    pub maxo: f32,
    pub mino: f32,
    pub upd: f32,
    pub en: bool,
    pub ct: bool,
    pub cl: bool,
    pub pvt: bool,
    pub doe: bool,
    pub swm: bool,
    pub ca: bool,
    pub mo: bool,
    pub pe: bool,
}

impl Pid {
    /// Returns every field paired with its name, in [`PID_FIELD_NAMES`] order.
    pub fn fields(&self) -> [(&'static str, TagValue); PID_FIELD_COUNT] {
        let values: [TagValue; PID_FIELD_COUNT] = [
            self.sp.into(),
            self.kp.into(),
            self.ki.into(),
            self.kd.into(),
            self.bias.into(),
            self.maxs.into(),
            self.mins.into(),
            self.db.into(),
            self.so.into(),
            self.maxo.into(),
            self.mino.into(),
            self.upd.into(),
            self.en.into(),
            self.ct.into(),
            self.cl.into(),
            self.pvt.into(),
            self.doe.into(),
            self.swm.into(),
            self.ca.into(),
            self.mo.into(),
            self.pe.into(),
        ];
        let mut index = 0;
        values.map(|value| {
            let name = PID_FIELD_NAMES[index];
            index += 1;
            (name, value)
        })
    }
}

/// A decoded structure.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedStruct {
    /// COUNTER.
    Counter(Counter),
    /// TIMER.
    Timer(Timer),
    /// PID.
    Pid(Pid),
}

/// Decodes `buffer` according to the layout of `kind`.
///
/// # Errors
///
/// Returns `TagError::MalformedBuffer` if `buffer` is shorter than
/// [`StructKind::size`]. Trailing bytes beyond the layout are ignored.
pub fn decode(buffer: &[u8], kind: StructKind) -> Result<DecodedStruct> {
    let name = kind.name();
    if buffer.len() < kind.size() {
        return Err(TagError::malformed_buffer(name, kind.size(), buffer.len()));
    }
    let status = read_u32_le(buffer, 0, name)?;

    let decoded = match kind {
        StructKind::Counter => DecodedStruct::Counter(Counter {
            pre: read_i32_le(buffer, 4, name)?,
            acc: read_i32_le(buffer, 8, name)?,
            cu: get_bit(status, 31),
            cd: get_bit(status, 30),
            dn: get_bit(status, 29),
            ov: get_bit(status, 28),
            un: get_bit(status, 27),
        }),
        StructKind::Timer => DecodedStruct::Timer(Timer {
            pre: read_i32_le(buffer, 4, name)?,
            acc: read_i32_le(buffer, 8, name)?,
            en: get_bit(status, 31),
            tt: get_bit(status, 30),
            dn: get_bit(status, 29),
        }),
        StructKind::Pid => {
            let real = |index: usize| read_f32_le(buffer, 4 + 4 * index, name);
            DecodedStruct::Pid(Pid {
                sp: real(0)?,
                kp: real(1)?,
                ki: real(2)?,
                kd: real(3)?,
                bias: real(4)?,
                maxs: real(5)?,
                mins: real(6)?,
                db: real(7)?,
                so: real(8)?,
                maxo: real(9)?,
                mino: real(10)?,
                upd: real(11)?,
                en: get_bit(status, 31),
                ct: get_bit(status, 30),
                cl: get_bit(status, 29),
                pvt: get_bit(status, 28),
                doe: get_bit(status, 27),
                swm: get_bit(status, 26),
                ca: get_bit(status, 25),
                mo: get_bit(status, 24),
                pe: get_bit(status, 23),
            })
        }
    };
    Ok(decoded)
}
