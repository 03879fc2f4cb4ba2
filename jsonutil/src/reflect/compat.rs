//! Declared-type compatibility between a field and a same-named getter.
//!
//! A getter stands in for a field when the type it returns is related to the
//! field's type, or when both land in the same JSON category. A shape is
//! related to the shapes it wraps: the `T` of an `Option<T>`, the pointee of
//! a smart pointer, and the inner type of a transparent wrapper.

use alloc::vec::Vec;

use facet::Facet;
use facet_core::{Def, ScalarType, Shape};

use crate::number::{BigNumber, Number};
use crate::value::PrimitiveArray;

/// The JSON categories a declared type can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Category {
    Number,
    Bool,
    Text,
    Array,
    Map,
}

/// `shape` followed by every shape it wraps, outermost first.
pub(crate) fn closure(shape: &'static Shape) -> Vec<&'static Shape> {
    let mut seen: Vec<&'static Shape> = Vec::new();
    let mut next = Some(shape);
    while let Some(s) = next {
        if seen.contains(&s) {
            break;
        }
        seen.push(s);
        next = match s.def {
            Def::Option(od) => Some(od.t),
            Def::Pointer(pd) => pd.pointee(),
            _ => s.inner,
        };
    }
    seen
}

pub(crate) fn category(shape: &'static Shape) -> Option<Category> {
    if shape == Number::SHAPE || shape == BigNumber::SHAPE {
        return Some(Category::Number);
    }
    if shape == PrimitiveArray::SHAPE {
        return Some(Category::Array);
    }
    match shape.def {
        Def::List(_) | Def::Array(_) | Def::Slice(_) | Def::Set(_) => return Some(Category::Array),
        Def::Map(_) => return Some(Category::Map),
        _ => {}
    }
    match shape.scalar_type()? {
        ScalarType::Bool => Some(Category::Bool),
        ScalarType::Char | ScalarType::Str | ScalarType::String | ScalarType::CowStr => {
            Some(Category::Text)
        }
        ScalarType::F32
        | ScalarType::F64
        | ScalarType::U8
        | ScalarType::U16
        | ScalarType::U32
        | ScalarType::U64
        | ScalarType::U128
        | ScalarType::USize
        | ScalarType::I8
        | ScalarType::I16
        | ScalarType::I32
        | ScalarType::I64
        | ScalarType::I128
        | ScalarType::ISize => Some(Category::Number),
        _ => None,
    }
}

/// Returns true if a getter returning `getter` can stand in for a field of
/// type `field`.
pub fn is_compatible(field: &'static Shape, getter: &'static Shape) -> bool {
    let getter_types = closure(getter);
    let field_types = closure(field);
    if field_types.iter().any(|f| getter_types.contains(f)) {
        return true;
    }
    let categories = |types: &[&'static Shape]| -> Vec<Category> {
        types.iter().filter_map(|s| category(s)).collect()
    };
    let field_categories = categories(&field_types);
    categories(&getter_types)
        .iter()
        .any(|c| field_categories.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::string::String;
    use alloc::sync::Arc;
    use chrono::{DateTime, Utc};
    use std::collections::{HashMap, HashSet};

    fn compatible<F: Facet<'static>, G: Facet<'static>>() -> bool {
        is_compatible(F::SHAPE, G::SHAPE)
    }

    #[test]
    fn wrappers_are_unwrapped() {
        let shapes = closure(<Option<Arc<i32>>>::SHAPE);
        assert_eq!(shapes.len(), 3);
        assert_eq!(shapes.last().copied(), Some(i32::SHAPE));
    }

    #[test]
    fn related_and_same_category_types_are_compatible() {
        assert!(compatible::<i32, i32>());
        assert!(compatible::<i32, f64>());
        assert!(compatible::<Number, BigNumber>());
        assert!(compatible::<u8, Number>());
        assert!(compatible::<String, &'static str>());
        assert!(compatible::<char, String>());
        assert!(compatible::<Vec<i32>, HashSet<String>>());
        assert!(compatible::<[u8; 4], PrimitiveArray>());
        assert!(compatible::<HashMap<String, i32>, BTreeMap<String, bool>>());
        assert!(compatible::<Option<i32>, i64>());
        assert!(compatible::<Arc<String>, String>());
        assert!(compatible::<DateTime<Utc>, Option<DateTime<Utc>>>());
    }

    #[test]
    fn unrelated_types_are_not() {
        assert!(!compatible::<i32, String>());
        assert!(!compatible::<bool, i8>());
        assert!(!compatible::<DateTime<Utc>, String>());
        assert!(!compatible::<Vec<i32>, HashMap<String, i32>>());
    }
}
