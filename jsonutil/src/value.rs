//! The parser's output, which the encoder also accepts.

use alloc::string::String;
use alloc::vec::Vec;

use chrono::{DateTime, Utc};
use facet::Facet;
use indexmap::IndexMap;

use crate::number::Number;

/// A parsed JSON value.
///
/// Objects keep their members in input order. `NaN` and the infinities parse
/// to [`Number::F64`] and are written back as strings.
#[derive(Debug, Clone, PartialEq, Facet)]
#[repr(u8)]
pub enum JsonValue {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// Any number
    Number(Number),
    /// A string
    String(String),
    /// An array
    Array(#[facet(recursive_type)] Vec<JsonValue>),
    /// An object
    Object(#[facet(recursive_type)] IndexMap<String, JsonValue>),
    /// A date literal, or a date string when date decoding is on
    Date(DateTime<Utc>),
    /// An all-numeric array, when primitive arrays are enabled
    PrimitiveArray(PrimitiveArray),
}

/// A numeric array stored at the narrowest width that holds every element
/// exactly.
#[derive(Debug, Clone, PartialEq, Facet)]
#[repr(u8)]
pub enum PrimitiveArray {
    /// Every element fits in `i8`
    I8(Vec<i8>),
    /// Every element fits in `i16`
    I16(Vec<i16>),
    /// Every element fits in `i32`
    I32(Vec<i32>),
    /// Integers that need 64 bits
    I64(Vec<i64>),
    /// Floats that print the same at single precision
    F32(Vec<f32>),
    /// Any other floats
    F64(Vec<f64>),
}

impl PrimitiveArray {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            PrimitiveArray::I8(v) => v.len(),
            PrimitiveArray::I16(v) => v.len(),
            PrimitiveArray::I32(v) => v.len(),
            PrimitiveArray::I64(v) => v.len(),
            PrimitiveArray::F32(v) => v.len(),
            PrimitiveArray::F64(v) => v.len(),
        }
    }

    /// Returns true if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Narrow `numbers` to a fixed-width array, or `None` if some element
    /// would not read back unchanged: integers that do not fit in `i64`,
    /// non-finite floats, arbitrary-precision fractions, and integers that
    /// share the array with floats but have no exact `f64`.
    pub(crate) fn narrowest(numbers: &[&Number]) -> Option<Self> {
        if numbers.iter().all(|n| !n.is_float()) {
            let ints = numbers
                .iter()
                .map(|n| n.as_i64())
                .collect::<Option<Vec<i64>>>()?;
            let (min, max) = ints
                .iter()
                .fold((0, 0), |(lo, hi), &n| (n.min(lo), n.max(hi)));
            let fits = |lo: i64, hi: i64| min >= lo && max <= hi;
            return Some(if fits(i8::MIN.into(), i8::MAX.into()) {
                PrimitiveArray::I8(ints.into_iter().map(|n| n as i8).collect())
            } else if fits(i16::MIN.into(), i16::MAX.into()) {
                PrimitiveArray::I16(ints.into_iter().map(|n| n as i16).collect())
            } else if fits(i32::MIN.into(), i32::MAX.into()) {
                PrimitiveArray::I32(ints.into_iter().map(|n| n as i32).collect())
            } else {
                PrimitiveArray::I64(ints)
            });
        }

        let floats = numbers
            .iter()
            .map(|n| exact_f64(n))
            .collect::<Option<Vec<f64>>>()?;
        let single = floats
            .iter()
            .all(|&f| alloc::format!("{}", f as f32) == alloc::format!("{f}"));
        Some(if single {
            PrimitiveArray::F32(floats.into_iter().map(|f| f as f32).collect())
        } else {
            PrimitiveArray::F64(floats)
        })
    }
}

/// `n` as a finite `f64` that converts back to exactly `n`.
fn exact_f64(n: &Number) -> Option<f64> {
    let f = match n {
        Number::F32(f) => f64::from(*f),
        Number::F64(f) => *f,
        Number::Big(b) if !b.is_integer() => return None,
        _ => {
            let i = n.as_i128()?;
            let f = i as f64;
            if f as i128 != i {
                return None;
            }
            f
        }
    };
    f.is_finite().then_some(f)
}

impl JsonValue {
    /// Returns true for `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number, if this is one.
    pub fn as_number(&self) -> Option<&Number> {
        match self {
            JsonValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// The number as `f64`, if this is one.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(Number::to_f64)
    }

    /// The number as `i64`, if this is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(Number::as_i64)
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The elements, if this is a generic array.
    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The members, if this is an object.
    pub fn as_object(&self) -> Option<&IndexMap<String, JsonValue>> {
        match self {
            JsonValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The date, if this is one.
    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            JsonValue::Date(d) => Some(d),
            _ => None,
        }
    }

    /// The member `key` of an object.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object().and_then(|o| o.get(key))
    }
}

impl From<bool> for JsonValue {
    fn from(b: bool) -> Self {
        JsonValue::Bool(b)
    }
}

macro_rules! from_number {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for JsonValue {
                fn from(n: $t) -> Self {
                    JsonValue::Number(n.into())
                }
            }
        )*
    };
}

from_number!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, Number);

impl From<String> for JsonValue {
    fn from(s: String) -> Self {
        JsonValue::String(s)
    }
}

impl From<&str> for JsonValue {
    fn from(s: &str) -> Self {
        JsonValue::String(s.into())
    }
}

impl From<Vec<JsonValue>> for JsonValue {
    fn from(items: Vec<JsonValue>) -> Self {
        JsonValue::Array(items)
    }
}

impl From<IndexMap<String, JsonValue>> for JsonValue {
    fn from(members: IndexMap<String, JsonValue>) -> Self {
        JsonValue::Object(members)
    }
}

impl From<DateTime<Utc>> for JsonValue {
    fn from(d: DateTime<Utc>) -> Self {
        JsonValue::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrow(values: &[Number]) -> Option<PrimitiveArray> {
        let refs: Vec<&Number> = values.iter().collect();
        PrimitiveArray::narrowest(&refs)
    }

    #[test]
    fn integers_pick_the_narrowest_width() {
        let small = [1i64, 2, -3, 4].map(Number::I64);
        assert_eq!(narrow(&small), Some(PrimitiveArray::I8(vec![1, 2, -3, 4])));
        let wide = [1i64, 40000].map(Number::I64);
        assert_eq!(narrow(&wide), Some(PrimitiveArray::I32(vec![1, 40000])));
        let huge = [1i64, i64::MAX].map(Number::I64);
        assert!(matches!(narrow(&huge), Some(PrimitiveArray::I64(_))));
    }

    #[test]
    fn floats_stay_single_only_when_lossless() {
        let short = [1.1, 2.2, -3.134, 4.0].map(Number::F64);
        assert!(matches!(narrow(&short), Some(PrimitiveArray::F32(_))));
        let long = [1.1, 2.2, -3.134598765, 4.0].map(Number::F64);
        assert!(matches!(narrow(&long), Some(PrimitiveArray::F64(_))));
    }

    #[test]
    fn lossy_floats_are_not_narrowed() {
        assert_eq!(narrow(&[Number::F64(f64::INFINITY)]), None);
        assert_eq!(narrow(&[Number::F64(1.0), Number::F64(f64::NAN)]), None);
        let inf = crate::number::BigNumber::new("1e400").map(Number::Big);
        assert_eq!(narrow(&inf.into_iter().collect::<Vec<_>>()), None);
        let precise = crate::number::BigNumber::new("0.10000000000000000001").map(Number::Big);
        assert_eq!(narrow(&precise.into_iter().collect::<Vec<_>>()), None);

        let unsafe_int = [Number::I64(9_007_199_254_740_993), Number::F64(0.5)];
        assert_eq!(narrow(&unsafe_int), None);
        let safe_int = [Number::I64(9_007_199_254_740_992), Number::F64(0.5)];
        assert_eq!(
            narrow(&safe_int),
            Some(PrimitiveArray::F64(vec![9_007_199_254_740_992.0, 0.5]))
        );
        let near_max = [Number::I64(i64::MAX), Number::F64(0.5)];
        assert_eq!(narrow(&near_max), None);
    }

    #[test]
    fn oversized_integers_are_not_narrowed() {
        let big = crate::number::BigNumber::new("123456789012345678901234567890");
        let big = big.map(Number::Big);
        let values: Vec<Number> = big.into_iter().collect();
        assert_eq!(narrow(&values), None);
    }
}
