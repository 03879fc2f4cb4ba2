//! Numeric values, their default text form and custom formats.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::fmt;

use facet::Facet;

use crate::write::JsonWrite;

/// A JSON number in one of the native widths, or an arbitrary-precision
/// decimal kept as text.
///
/// Numbers compare by value, so `Number::I32(5) == Number::I64(5)` and
/// `Number::I8(2) == Number::F64(2.0)`. Integers are compared exactly;
/// anything involving a fraction is compared at `f64` precision.
#[derive(Debug, Clone, Facet)]
#[repr(u8)]
pub enum Number {
    /// `i8`
    I8(i8),
    /// `i16`
    I16(i16),
    /// `i32`
    I32(i32),
    /// `i64`
    I64(i64),
    /// `i128`
    I128(i128),
    /// `u8`
    U8(u8),
    /// `u16`
    U16(u16),
    /// `u32`
    U32(u32),
    /// `u64`
    U64(u64),
    /// `u128`
    U128(u128),
    /// `f32`
    F32(f32),
    /// `f64`
    F64(f64),
    /// Arbitrary precision decimal
    Big(BigNumber),
}

/// The runtime kind of a [`Number`]; custom formats are registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum NumberKind {
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Big,
}

impl NumberKind {
    /// Parse a kind from its lowercase Rust type name (`"f32"`, `"big"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "i8" => NumberKind::I8,
            "i16" => NumberKind::I16,
            "i32" => NumberKind::I32,
            "i64" => NumberKind::I64,
            "i128" => NumberKind::I128,
            "u8" => NumberKind::U8,
            "u16" => NumberKind::U16,
            "u32" => NumberKind::U32,
            "u64" => NumberKind::U64,
            "u128" => NumberKind::U128,
            "f32" => NumberKind::F32,
            "f64" => NumberKind::F64,
            "big" => NumberKind::Big,
            _ => return None,
        })
    }
}

macro_rules! number_from {
    ($($t:ty => $v:ident),* $(,)?) => {
        $(
            impl From<$t> for Number {
                fn from(n: $t) -> Self {
                    Number::$v(n)
                }
            }
        )*
    };
}

number_from! {
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, i128 => I128,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, u128 => U128,
    f32 => F32, f64 => F64, BigNumber => Big,
}

impl Number {
    /// The kind of this number.
    pub fn kind(&self) -> NumberKind {
        match self {
            Number::I8(_) => NumberKind::I8,
            Number::I16(_) => NumberKind::I16,
            Number::I32(_) => NumberKind::I32,
            Number::I64(_) => NumberKind::I64,
            Number::I128(_) => NumberKind::I128,
            Number::U8(_) => NumberKind::U8,
            Number::U16(_) => NumberKind::U16,
            Number::U32(_) => NumberKind::U32,
            Number::U64(_) => NumberKind::U64,
            Number::U128(_) => NumberKind::U128,
            Number::F32(_) => NumberKind::F32,
            Number::F64(_) => NumberKind::F64,
            Number::Big(_) => NumberKind::Big,
        }
    }

    /// Lossy conversion to `f64`.
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::I8(n) => *n as f64,
            Number::I16(n) => *n as f64,
            Number::I32(n) => *n as f64,
            Number::I64(n) => *n as f64,
            Number::I128(n) => *n as f64,
            Number::U8(n) => *n as f64,
            Number::U16(n) => *n as f64,
            Number::U32(n) => *n as f64,
            Number::U64(n) => *n as f64,
            Number::U128(n) => *n as f64,
            Number::F32(n) => *n as f64,
            Number::F64(n) => *n,
            Number::Big(b) => b.to_f64(),
        }
    }

    /// The value as `i64`, if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::I8(n) => Some(*n as i64),
            Number::I16(n) => Some(*n as i64),
            Number::I32(n) => Some(*n as i64),
            Number::I64(n) => Some(*n),
            Number::I128(n) => i64::try_from(*n).ok(),
            Number::U8(n) => Some(*n as i64),
            Number::U16(n) => Some(*n as i64),
            Number::U32(n) => Some(*n as i64),
            Number::U64(n) => i64::try_from(*n).ok(),
            Number::U128(n) => i64::try_from(*n).ok(),
            Number::F32(_) | Number::F64(_) => None,
            Number::Big(b) if b.is_integer() => b.as_str().parse().ok(),
            Number::Big(_) => None,
        }
    }

    /// The value as `i128`, if it is an integer that fits.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Number::I128(n) => Some(*n),
            Number::U64(n) => Some(i128::from(*n)),
            Number::U128(n) => i128::try_from(*n).ok(),
            Number::F32(_) | Number::F64(_) => None,
            Number::Big(b) if b.is_integer() => b.as_str().parse().ok(),
            Number::Big(_) => None,
            _ => self.as_i64().map(i128::from),
        }
    }

    /// Returns true for floating values (native or big) with a fraction or
    /// exponent part.
    pub fn is_float(&self) -> bool {
        match self {
            Number::F32(_) | Number::F64(_) => true,
            Number::Big(b) => !b.is_integer(),
            _ => false,
        }
    }

    /// Returns true unless this is a NaN or infinite float.
    pub fn is_finite(&self) -> bool {
        match self {
            Number::F32(f) => f.is_finite(),
            Number::F64(f) => f.is_finite(),
            _ => true,
        }
    }

    /// Writes the default text form. Non-finite floats are written as the
    /// quoted strings `"NaN"`, `"Infinity"` and `"-Infinity"`.
    pub fn write_default<W: JsonWrite + ?Sized>(&self, out: &mut W) {
        match self {
            Number::I8(n) => out.write(itoa::Buffer::new().format(*n).as_bytes()),
            Number::I16(n) => out.write(itoa::Buffer::new().format(*n).as_bytes()),
            Number::I32(n) => out.write(itoa::Buffer::new().format(*n).as_bytes()),
            Number::I64(n) => out.write(itoa::Buffer::new().format(*n).as_bytes()),
            Number::I128(n) => out.write(itoa::Buffer::new().format(*n).as_bytes()),
            Number::U8(n) => out.write(itoa::Buffer::new().format(*n).as_bytes()),
            Number::U16(n) => out.write(itoa::Buffer::new().format(*n).as_bytes()),
            Number::U32(n) => out.write(itoa::Buffer::new().format(*n).as_bytes()),
            Number::U64(n) => out.write(itoa::Buffer::new().format(*n).as_bytes()),
            Number::U128(n) => out.write(itoa::Buffer::new().format(*n).as_bytes()),
            Number::F32(f) => match non_finite(*f as f64) {
                Some(s) => out.write_str(s),
                None => out.write_str(&canonical_float(ryu::Buffer::new().format_finite(*f))),
            },
            Number::F64(f) => match non_finite(*f) {
                Some(s) => out.write_str(s),
                None => out.write_str(&canonical_float(ryu::Buffer::new().format_finite(*f))),
            },
            Number::Big(b) => out.write_str(b.as_str()),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.as_i128(), other.as_i128()) {
            return a == b;
        }
        match (self, other) {
            (Number::Big(a), Number::Big(b)) if a.is_integer() && b.is_integer() => a == b,
            // single precision values compare at single precision, so 1.1f32
            // equals the 1.1 it is written as
            (Number::F32(a), b) | (b, Number::F32(a)) => *a == b.to_f64() as f32,
            _ => self.to_f64() == other.to_f64(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        self.write_default(&mut s);
        f.write_str(s.trim_matches('"'))
    }
}

fn non_finite(f: f64) -> Option<&'static str> {
    if f.is_nan() {
        Some("\"NaN\"")
    } else if f == f64::INFINITY {
        Some("\"Infinity\"")
    } else if f == f64::NEG_INFINITY {
        Some("\"-Infinity\"")
    } else {
        None
    }
}

/// Rewrites a shortest round-trip float (as produced by `ryu`) into the
/// canonical layout: plain decimal with at least one
/// fraction digit for magnitudes in `[1e-3, 1e7)`, otherwise `d.dddE±n`.
pub(crate) fn canonical_float(shortest: &str) -> String {
    let (neg, rest) = match shortest.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, shortest),
    };
    let (mantissa, exp) = match rest.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (rest, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let mut digits: String = int_part.chars().chain(frac_part.chars()).collect();
    let mut point = int_part.len() as i32;
    let leading = digits.len() - digits.trim_start_matches('0').len();
    digits.drain(..leading);
    point -= leading as i32;
    let trimmed = digits.trim_end_matches('0').len();
    digits.truncate(trimmed);

    let mut out = String::new();
    if neg {
        out.push('-');
    }
    if digits.is_empty() {
        out.push_str("0.0");
        return out;
    }

    let sci = point - 1 + exp;
    if (-3..7).contains(&sci) {
        if sci >= 0 {
            let int_len = (sci + 1) as usize;
            if digits.len() <= int_len {
                out.push_str(&digits);
                out.extend(core::iter::repeat_n('0', int_len - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            }
        } else {
            out.push_str("0.");
            out.extend(core::iter::repeat_n('0', (-sci - 1) as usize));
            out.push_str(&digits);
        }
    } else {
        out.push_str(&digits[..1]);
        out.push('.');
        if digits.len() > 1 {
            out.push_str(&digits[1..]);
        } else {
            out.push('0');
        }
        out.push('E');
        out.push_str(itoa::Buffer::new().format(sci));
    }
    out
}

/// Returns true if `s` matches the JSON number grammar exactly.
pub fn is_json_number(s: &str) -> bool {
    let b = s.as_bytes();
    let mut i = 0;
    if b.get(i) == Some(&b'-') {
        i += 1;
    }
    match b.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            while b.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
        }
        _ => return false,
    }
    if b.get(i) == Some(&b'.') {
        i += 1;
        let start = i;
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return false;
        }
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(b.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let start = i;
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return false;
        }
    }
    i == b.len()
}

/// An arbitrary-precision decimal, stored as its validated literal text.
///
/// Output reproduces the literal exactly (`12345.67890` keeps its trailing
/// zero).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Facet)]
pub struct BigNumber(String);

impl BigNumber {
    /// Wrap a decimal literal, or `None` if it is not a JSON number.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        is_json_number(&text).then_some(BigNumber(text))
    }

    /// The literal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the literal has no fraction or exponent part.
    pub fn is_integer(&self) -> bool {
        !self.0.contains(['.', 'e', 'E'])
    }

    /// Lossy conversion to `f64`.
    pub fn to_f64(&self) -> f64 {
        lexical_parse_float::FromLexical::from_lexical(self.0.as_bytes()).unwrap_or(f64::NAN)
    }
}

impl fmt::Display for BigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for BigNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigNumber::new(s).ok_or(())
    }
}

/// A custom number format, registered per [`NumberKind`] in a
/// [`Config`](crate::Config).
///
/// The returned text is written verbatim, so it must be a valid JSON value.
pub trait NumberFormat: Send + Sync {
    /// Format `n`.
    fn format(&self, n: &Number) -> String;
}

impl<F> NumberFormat for F
where
    F: Fn(&Number) -> String + Send + Sync,
{
    fn format(&self, n: &Number) -> String {
        self(n)
    }
}

impl fmt::Debug for dyn NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NumberFormat")
    }
}

/// Shared handle to a number format.
pub type NumberFormatRef = Arc<dyn NumberFormat>;

/// A fixed-point decimal format without grouping separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalFormat {
    /// Digits after the point are rounded to at most this many
    pub max_fraction_digits: usize,
    /// Trailing zeros are kept down to this many fraction digits
    pub min_fraction_digits: usize,
}

impl DecimalFormat {
    /// A format rounding to at most `max` fraction digits.
    pub fn with_max_fraction_digits(max: usize) -> Self {
        DecimalFormat {
            max_fraction_digits: max,
            min_fraction_digits: 0,
        }
    }
}

impl NumberFormat for DecimalFormat {
    fn format(&self, n: &Number) -> String {
        if !n.is_float() {
            let mut s = n.to_string();
            if self.min_fraction_digits > 0 {
                s.push('.');
                s.extend(core::iter::repeat_n('0', self.min_fraction_digits));
            }
            return s;
        }
        let v = n.to_f64();
        if !v.is_finite() {
            let mut s = String::new();
            n.write_default(&mut s);
            return s;
        }
        let mut s = alloc::format!("{:.*}", self.max_fraction_digits, v);
        if let Some(point) = s.find('.') {
            let keep = point + 1 + self.min_fraction_digits;
            while s.len() > keep && s.ends_with('0') {
                s.pop();
            }
            if s.ends_with('.') {
                s.pop();
            }
        }
        if s == "-0" {
            s = "0".to_string();
        }
        s
    }
}
