//! Alternative readings of numeric payloads.
//!
//! The wire format only records the width of a numeric value, not its type.
//! A fixed32 may be an `int32`, a `uint32` or a `float`; a fixed64 may be an
//! `int64`, a `uint64` or a `double`. We produce every plausible reading and
//! leave the choice to whoever looks at the output.
//!
//! Varints are reported as decoded. Zig-zag decoding is not attempted since
//! nothing in the payload says whether a field is `sint32`/`sint64`.

use crate::scanner::FieldValue;
use std::fmt;

/// One reading of a numeric payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interpretation {
    /// Two's-complement signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// IEEE-754 single precision
    Float(f32),
    /// IEEE-754 double precision
    Double(f64),
}

impl Interpretation {
    /// Name of the reading
    pub fn label(&self) -> &'static str {
        match self {
            Interpretation::Int(_) => "int",
            Interpretation::Uint(_) => "uint",
            Interpretation::Float(_) => "float",
            Interpretation::Double(_) => "double",
        }
    }

    /// The value without its label.
    ///
    /// Floating-point values far from 1 are written in exponent form.
    pub fn value_text(&self) -> String {
        match self {
            Interpretation::Int(v) => v.to_string(),
            Interpretation::Uint(v) => v.to_string(),
            Interpretation::Float(v) => real_text(*v, v.abs() as f64),
            Interpretation::Double(v) => real_text(*v, v.abs()),
        }
    }
}

fn real_text<T: fmt::Display + fmt::LowerExp>(value: T, magnitude: f64) -> String {
    if magnitude.is_finite() && magnitude != 0.0 && !(1e-6..1e16).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.value_text())
    }
}

/// Readings of four little-endian bytes.
///
/// The unsigned reading is only included when it differs from the signed one.
pub fn interpret_fixed32(bytes: [u8; 4]) -> Vec<Interpretation> {
    let signed = i32::from_le_bytes(bytes);
    let unsigned = u32::from_le_bytes(bytes);

    let mut out = vec![Interpretation::Int(signed as i64)];
    if signed < 0 {
        out.push(Interpretation::Uint(unsigned as u64));
    }
    out.push(Interpretation::Float(f32::from_le_bytes(bytes)));
    out
}

/// Readings of eight little-endian bytes.
///
/// The unsigned reading is only included when it exceeds `i64::MAX`.
pub fn interpret_fixed64(bytes: [u8; 8]) -> Vec<Interpretation> {
    let signed = i64::from_le_bytes(bytes);
    let unsigned = u64::from_le_bytes(bytes);

    let mut out = vec![Interpretation::Int(signed)];
    if signed < 0 {
        out.push(Interpretation::Uint(unsigned));
    }
    out.push(Interpretation::Double(f64::from_le_bytes(bytes)));
    out
}

/// Readings of a varint: just the decoded value.
pub fn interpret_varint(value: u64) -> Vec<Interpretation> {
    vec![Interpretation::Uint(value)]
}

/// Display text for a numeric field, `None` for length-delimited payloads.
///
/// Varints are printed bare; fixed-width values list every reading.
pub fn describe(value: &FieldValue) -> Option<String> {
    let readings = match value {
        FieldValue::Varint(v) => {
            let text: Vec<String> = interpret_varint(*v)
                .iter()
                .map(Interpretation::value_text)
                .collect();
            return Some(text.join(", "));
        }
        FieldValue::Fixed32(bytes) => interpret_fixed32(*bytes),
        FieldValue::Fixed64(bytes) => interpret_fixed64(*bytes),
        FieldValue::Len(_) => return None,
    };

    Some(
        readings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    )
}
