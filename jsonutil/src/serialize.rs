//! The encoder: walks a [`Peek`] depth first and writes JSON text.
//!
//! Containers, records and the targets of smart pointers are tracked by
//! identity while they are being written; reaching one of them again before
//! it is finished is reported as [`JsonErrorKind::DataStructureLoop`]
//! instead of recursing forever. On error, whatever was already written to
//! the sink is a malformed fragment.

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Utc};
use facet::Facet;
use facet_core::{Def, ScalarType, StructKind, Type, UserType};
use facet_reflect::{Peek, ValueId};
use tracing::trace;

use crate::config::Config;
use crate::date::DateEncoding;
use crate::error::{JsonError, JsonErrorKind, ReflectError, ReflectErrorCause, Result};
use crate::escape::{escape_property_name, write_string};
use crate::ident::{IdentifierGrammar, is_reserved_word, is_valid_identifier};
use crate::number::{BigNumber, Number, is_json_number};
use crate::reflect::{MemberValue, TypeRegistry, project};
use crate::value::{JsonValue, PrimitiveArray};
use crate::write::{JsonWrite, StdWriteAdapter};

/// Serializes a value to a JSON string using the process-wide defaults.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
///
/// let mut scores = BTreeMap::new();
/// scores.insert("alice", vec![3, 4]);
/// scores.insert("bob", vec![]);
/// assert_eq!(jsonutil::to_string(&scores).unwrap(), r#"{"alice":[3,4],"bob":[]}"#);
/// ```
pub fn to_string<'f, T: Facet<'f> + ?Sized>(value: &T) -> Result<String> {
    to_string_with_config(value, &Config::new())
}

/// Serializes a value to a JSON string.
pub fn to_string_with_config<'f, T: Facet<'f> + ?Sized>(value: &T, cfg: &Config) -> Result<String> {
    peek_to_string(Peek::new(value), cfg)
}

/// Serializes an already reflected value to a JSON string.
pub fn peek_to_string(peek: Peek<'_, '_>, cfg: &Config) -> Result<String> {
    let mut out = String::new();
    Encoder::new(cfg, &mut out).value(peek, 0)?;
    Ok(out)
}

/// Serializes a value and writes it to the given sink.
pub fn to_writer<'f, T: Facet<'f> + ?Sized, W: JsonWrite>(
    value: &T,
    writer: W,
    cfg: &Config,
) -> Result<()> {
    Encoder::new(cfg, writer).value(Peek::new(value), 0)
}

/// Serializes a value and writes it to a `std::io::Write` writer, which is
/// flushed and handed back.
///
/// # Example
///
/// ```
/// let cfg = jsonutil::Config::builtin();
/// let buffer = jsonutil::to_writer_std(Vec::new(), &["a", "b"], &cfg).unwrap();
/// assert_eq!(buffer, br#"["a","b"]"#);
/// ```
pub fn to_writer_std<'f, W: std::io::Write, T: Facet<'f> + ?Sized>(
    writer: W,
    value: &T,
    cfg: &Config,
) -> Result<W> {
    let mut adapter = StdWriteAdapter::new(writer);
    to_writer(value, &mut adapter, cfg)?;
    Ok(adapter.into_result()?)
}

fn unreadable(peek: Peek<'_, '_>) -> JsonError {
    ReflectError::new(peek.shape().to_string(), None, ReflectErrorCause::Unreadable).into()
}

/// The native number behind a numeric scalar.
fn scalar_number(peek: Peek<'_, '_>) -> Option<Number> {
    macro_rules! read {
        ($t:ty) => {
            peek.get::<$t>().ok().map(|n| Number::from(*n))
        };
    }
    match peek.scalar_type()? {
        ScalarType::I8 => read!(i8),
        ScalarType::I16 => read!(i16),
        ScalarType::I32 => read!(i32),
        ScalarType::I64 => read!(i64),
        ScalarType::I128 => read!(i128),
        ScalarType::ISize => peek.get::<isize>().ok().map(|n| Number::I64(*n as i64)),
        ScalarType::U8 => read!(u8),
        ScalarType::U16 => read!(u16),
        ScalarType::U32 => read!(u32),
        ScalarType::U64 => read!(u64),
        ScalarType::U128 => read!(u128),
        ScalarType::USize => peek.get::<usize>().ok().map(|n| Number::U64(*n as u64)),
        ScalarType::F32 => read!(f32),
        ScalarType::F64 => read!(f64),
        _ => None,
    }
}

struct Encoder<'c, W> {
    cfg: &'c Config,
    out: W,
    in_progress: HashSet<ValueId>,
}

impl<'c, W: JsonWrite> Encoder<'c, W> {
    fn new(cfg: &'c Config, out: W) -> Self {
        Encoder {
            cfg,
            out,
            in_progress: HashSet::new(),
        }
    }

    /// Run `f` with `peek` marked as in progress. The mark is removed
    /// however `f` returns.
    fn with_visit(
        &mut self,
        peek: Peek<'_, '_>,
        f: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let id = peek.id();
        if !self.in_progress.insert(id) {
            return Err(JsonError::without_span(JsonErrorKind::DataStructureLoop {
                type_name: peek.shape().to_string(),
            }));
        }
        let result = f(self);
        self.in_progress.remove(&id);
        result
    }

    fn value(&mut self, peek: Peek<'_, '_>, depth: usize) -> Result<()> {
        let shape = peek.shape();
        trace!(%shape, depth, "writing value");

        if let Some(emit) = TypeRegistry::emitter(shape) {
            trace!(%shape, "delegating to registered emitter");
            return emit(peek, self.cfg, &mut self.out);
        }
        if let Ok(json) = peek.get::<JsonValue>() {
            return self.json_value(json, depth);
        }
        if let Ok(n) = peek.get::<Number>() {
            self.number(n);
            return Ok(());
        }
        if let Ok(big) = peek.get::<BigNumber>() {
            self.number(&Number::Big(big.clone()));
            return Ok(());
        }
        if let Ok(array) = peek.get::<PrimitiveArray>() {
            return self.primitive_array(array, depth);
        }
        if let Ok(date) = peek.get::<DateTime<Utc>>() {
            return self.date(date);
        }
        if let Ok(date) = peek.get::<DateTime<FixedOffset>>() {
            return self.date(&date.with_timezone(&Utc));
        }
        if shape.is_transparent() {
            let inner = peek
                .into_struct()
                .ok()
                .and_then(|s| s.field(0).ok())
                .ok_or_else(|| unreadable(peek))?;
            return self.value(inner, depth);
        }

        match (shape.def, shape.ty) {
            (Def::Scalar, _) => self.scalar(peek),
            (Def::List(_) | Def::Array(_) | Def::Slice(_), _) => self.with_visit(peek, |enc| {
                let items = peek.into_list_like().map_err(|_| unreadable(peek))?;
                enc.seq(items.iter(), depth)
            }),
            (Def::Set(_), _) => self.with_visit(peek, |enc| {
                let items = peek.into_set().map_err(|_| unreadable(peek))?;
                enc.seq(items.iter(), depth)
            }),
            (Def::Map(_), _) => self.with_visit(peek, |enc| {
                let map = peek.into_map().map_err(|_| unreadable(peek))?;
                let mut entries = Vec::with_capacity(map.len());
                for (key, value) in map.iter() {
                    entries.push((Cow::Owned(enc.map_key(key)?), value));
                }
                enc.object(entries, depth)
            }),
            (Def::Option(_), _) => match peek.into_option().ok().and_then(|o| o.value()) {
                Some(inner) => self.value(inner, depth),
                None => {
                    self.out.write(b"null");
                    Ok(())
                }
            },
            (Def::Pointer(_), _) => {
                if let Some(text) = peek.as_str() {
                    self.string(text);
                    return Ok(());
                }
                let inner = peek
                    .into_pointer()
                    .ok()
                    .and_then(|p| p.borrow_inner())
                    .ok_or_else(|| unreadable(peek))?;
                self.value(inner, depth)
            }
            (_, Type::User(UserType::Struct(sd))) => match sd.kind {
                StructKind::Unit => {
                    self.out.write(b"null");
                    Ok(())
                }
                StructKind::Tuple | StructKind::TupleStruct => {
                    let fields = peek.into_struct().map_err(|_| unreadable(peek))?;
                    let items: Vec<_> = (0..fields.field_count())
                        .filter_map(|i| fields.field(i).ok())
                        .collect();
                    self.seq(items.into_iter(), depth)
                }
                StructKind::Struct => self.with_visit(peek, |enc| enc.record(peek, depth)),
            },
            (_, Type::User(UserType::Enum(_))) => self.variant(peek, depth),
            (_, Type::Pointer(_)) => {
                if let Some(text) = peek.as_str() {
                    self.string(text);
                } else {
                    trace!(%shape, "writing opaque pointer as null");
                    self.out.write(b"null");
                }
                Ok(())
            }
            _ => {
                trace!(%shape, "writing unsupported shape as null");
                self.out.write(b"null");
                Ok(())
            }
        }
    }

    fn scalar(&mut self, peek: Peek<'_, '_>) -> Result<()> {
        match peek.scalar_type() {
            Some(ScalarType::Unit) => self.out.write(b"null"),
            Some(ScalarType::Bool) => {
                let b = peek.get::<bool>().map_err(|_| unreadable(peek))?;
                self.out.write(if *b { b"true" } else { b"false" });
            }
            Some(ScalarType::Char) => {
                let c = peek.get::<char>().map_err(|_| unreadable(peek))?;
                write_string(&mut self.out, c.encode_utf8(&mut [0; 4]), self.cfg);
            }
            _ => {
                if let Some(n) = scalar_number(peek) {
                    self.number(&n);
                } else if let Some(text) = peek.as_str() {
                    self.string(text);
                } else if peek.shape().vtable.has_display() {
                    self.string(&peek.to_string());
                } else {
                    trace!(shape = %peek.shape(), "writing opaque scalar as null");
                    self.out.write(b"null");
                }
            }
        }
        Ok(())
    }

    /// The property name a map key is written under.
    fn map_key(&mut self, key: Peek<'_, '_>) -> Result<String> {
        if let Some(text) = key.as_str() {
            return Ok(text.to_string());
        }
        if let Some(n) = scalar_number(key) {
            return Ok(n.to_string());
        }
        if key.scalar_type().is_some() && key.shape().vtable.has_display() {
            return Ok(key.to_string());
        }
        if let Ok(opt) = key.into_option() {
            return match opt.value() {
                Some(inner) => self.map_key(inner),
                None => Ok("null".to_string()),
            };
        }
        if let Ok(e) = key.into_enum()
            && let Ok(variant) = e.active_variant()
            && variant.data.fields.is_empty()
        {
            return Ok(variant.name.to_string());
        }
        peek_to_string(key, self.cfg)
    }

    /// Unit variants are written as their name, others as a one-member
    /// object keyed by the name.
    fn variant(&mut self, peek: Peek<'_, '_>, depth: usize) -> Result<()> {
        let e = peek.into_enum().map_err(|_| unreadable(peek))?;
        let variant = e.active_variant().map_err(|_| unreadable(peek))?;
        let fields: Vec<_> = (0..variant.data.fields.len())
            .filter_map(|i| e.field(i).ok().flatten())
            .collect();
        if variant.data.fields.is_empty() {
            write_string(&mut self.out, variant.name, self.cfg);
            return Ok(());
        }
        if fields.len() != variant.data.fields.len() {
            return Err(unreadable(peek));
        }
        self.with_visit(peek, |enc| {
            enc.out.write(b"{");
            enc.write_newline();
            enc.write_indent(depth + 1);
            let name = escape_property_name(variant.name, enc.cfg)?;
            enc.write_name(&name);
            enc.write_colon();
            match variant.data.kind {
                StructKind::Struct => {
                    let named = variant
                        .data
                        .fields
                        .iter()
                        .zip(fields)
                        .map(|(f, v)| (Cow::Borrowed(f.name), v))
                        .collect();
                    enc.object(named, depth + 1)?;
                }
                _ if fields.len() == 1 => enc.value(fields[0], depth + 1)?,
                _ => enc.seq(fields.into_iter(), depth + 1)?,
            }
            enc.write_newline();
            enc.write_indent(depth);
            enc.out.write(b"}");
            Ok(())
        })
    }

    fn json_value(&mut self, value: &JsonValue, depth: usize) -> Result<()> {
        match value {
            JsonValue::Null => self.out.write(b"null"),
            JsonValue::Bool(true) => self.out.write(b"true"),
            JsonValue::Bool(false) => self.out.write(b"false"),
            JsonValue::Number(n) => self.number(n),
            JsonValue::String(s) => self.string(s),
            JsonValue::Array(items) => return self.value(Peek::new(items), depth),
            JsonValue::Object(members) => return self.value(Peek::new(members), depth),
            JsonValue::Date(d) => return self.date(d),
            JsonValue::PrimitiveArray(p) => return self.primitive_array(p, depth),
        }
        Ok(())
    }

    fn primitive_array(&mut self, array: &PrimitiveArray, depth: usize) -> Result<()> {
        let items = match array {
            PrimitiveArray::I8(v) => Peek::new(v),
            PrimitiveArray::I16(v) => Peek::new(v),
            PrimitiveArray::I32(v) => Peek::new(v),
            PrimitiveArray::I64(v) => Peek::new(v),
            PrimitiveArray::F32(v) => Peek::new(v),
            PrimitiveArray::F64(v) => Peek::new(v),
        };
        self.value(items, depth)
    }

    fn number(&mut self, n: &Number) {
        match self.cfg.number_format(n.kind()) {
            Some(format) => self.out.write_str(&format.format(n)),
            None => n.write_default(&mut self.out),
        }
    }

    fn string(&mut self, s: &str) {
        if self.cfg.encode_numeric_strings_as_numbers && is_json_number(s) {
            self.out.write_str(s);
        } else {
            write_string(&mut self.out, s, self.cfg);
        }
    }

    fn date(&mut self, date: &DateTime<Utc>) -> Result<()> {
        let text = self.cfg.date_formats.format(date)?;
        match self.cfg.date_encoding {
            DateEncoding::Objects => {
                self.out.write(b"new Date(");
                write_string(&mut self.out, &text, self.cfg);
                self.out.write(b")");
            }
            DateEncoding::Plain | DateEncoding::Strings => {
                write_string(&mut self.out, &text, self.cfg);
            }
        }
        Ok(())
    }

    fn seq<'mem, 'facet>(
        &mut self,
        items: impl Iterator<Item = Peek<'mem, 'facet>>,
        depth: usize,
    ) -> Result<()> {
        self.out.write(b"[");
        let mut first = true;
        for item in items {
            if !first {
                self.out.write(b",");
            }
            first = false;
            self.write_newline();
            self.write_indent(depth + 1);
            self.value(item, depth + 1)?;
        }
        if !first {
            self.write_newline();
            self.write_indent(depth);
        }
        self.out.write(b"]");
        Ok(())
    }

    fn record(&mut self, record: Peek<'_, '_>, depth: usize) -> Result<()> {
        let members = project(record, self.cfg)?;
        trace!(shape = %record.shape(), members = members.len(), "writing record");
        self.out.write(b"{");
        let mut names: HashSet<String> = HashSet::new();
        let mut first = true;
        for (key, value) in &members {
            self.member_name(key, &mut names, first, depth)?;
            first = false;
            match value {
                MemberValue::Field(peek) => self.value(*peek, depth + 1)?,
                MemberValue::Computed(computed) => self.value(computed.peek(), depth + 1)?,
            }
        }
        self.close_object(first, depth);
        Ok(())
    }

    fn object<'mem, 'facet>(
        &mut self,
        entries: Vec<(Cow<'_, str>, Peek<'mem, 'facet>)>,
        depth: usize,
    ) -> Result<()> {
        self.out.write(b"{");
        let mut names: HashSet<String> = HashSet::new();
        let mut first = true;
        for (key, value) in entries {
            self.member_name(&key, &mut names, first, depth)?;
            first = false;
            self.value(value, depth + 1)?;
        }
        self.close_object(first, depth);
        Ok(())
    }

    /// Write the separator, indentation, name and colon that precede a
    /// member value, rejecting names already written in this object.
    fn member_name(
        &mut self,
        key: &str,
        names: &mut HashSet<String>,
        first: bool,
        depth: usize,
    ) -> Result<()> {
        let name = escape_property_name(key, self.cfg)?;
        if names.contains(&name) {
            return Err(JsonError::without_span(
                JsonErrorKind::DuplicatePropertyName {
                    name: key.to_string(),
                },
            ));
        }
        if !first {
            self.out.write(b",");
        }
        self.write_newline();
        self.write_indent(depth + 1);
        self.write_name(&name);
        self.write_colon();
        names.insert(name);
        Ok(())
    }

    fn close_object(&mut self, empty: bool, depth: usize) {
        if !empty {
            self.write_newline();
            self.write_indent(depth);
        }
        self.out.write(b"}");
    }

    /// Write an already escaped property name, unquoted only when that is
    /// allowed and safe.
    fn write_name(&mut self, name: &str) {
        let bare = !self.cfg.quote_identifier
            && is_valid_identifier(name, IdentifierGrammar::EcmaScript)
            && !is_reserved_word(name);
        if bare {
            self.out.write_str(name);
        } else {
            self.out.write(b"\"");
            self.out.write_str(name);
            self.out.write(b"\"");
        }
    }

    /// Write indentation for pretty printing
    fn write_indent(&mut self, depth: usize) {
        if let Some(padding) = &self.cfg.indent_padding {
            for _ in 0..depth {
                self.out.write_str(&padding.indent);
            }
        }
    }

    /// Write a newline for pretty printing
    fn write_newline(&mut self) {
        if let Some(padding) = &self.cfg.indent_padding {
            self.out.write_str(&padding.newline);
        }
    }

    /// Write a space after colon for pretty printing
    fn write_colon(&mut self) {
        if self.cfg.indent_padding.is_some() {
            self.out.write(b": ");
        } else {
            self.out.write(b":");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndentPadding;
    use crate::reflect::{Getter, JsonEmit, ProjectionSpec};
    use alloc::sync::{Arc, Weak};
    use indexmap::IndexMap;
    use std::collections::BTreeMap;

    fn compact() -> Config {
        Config::builtin()
    }

    #[test]
    fn scalars() {
        let cfg = compact();
        assert_eq!(to_string_with_config(&(), &cfg).ok().as_deref(), Some("null"));
        assert_eq!(to_string_with_config(&'x', &cfg).ok().as_deref(), Some("\"x\""));
        assert_eq!(to_string_with_config(&Some(2.5f64), &cfg).ok().as_deref(), Some("2.5"));
        assert_eq!(to_string_with_config(&None::<i32>, &cfg).ok().as_deref(), Some("null"));
        assert_eq!(
            to_string_with_config("a\"b", &cfg).ok().as_deref(),
            Some(r#""a\"b""#)
        );
    }

    #[test]
    fn unsized_values_are_accepted() {
        let cfg = compact();
        let slice: &[i32] = &[1, 2, 3];
        assert_eq!(to_string_with_config(slice, &cfg).ok().as_deref(), Some("[1,2,3]"));
        assert_eq!(to_string_with_config("plain", &cfg).ok().as_deref(), Some("\"plain\""));
    }

    #[test]
    fn numeric_strings() {
        let cfg = compact().with_encode_numeric_strings_as_numbers(true);
        let values = ["12", "1.5e3", "012", "x"];
        assert_eq!(
            to_string_with_config(&values, &cfg).ok().as_deref(),
            Some(r#"[12,1.5e3,"012","x"]"#)
        );
    }

    #[test]
    fn pretty_empty_containers_stay_closed() {
        let cfg = compact().with_indent_padding(Some(IndentPadding::new("  ", "\n")));
        let mut map: IndexMap<&str, Vec<i32>> = IndexMap::new();
        map.insert("a", vec![]);
        map.insert("b", vec![1]);
        assert_eq!(
            to_string_with_config(&map, &cfg).ok().as_deref(),
            Some("{\n  \"a\": [],\n  \"b\": [\n    1\n  ]\n}")
        );
    }

    #[test]
    fn unquoted_names() {
        let cfg = compact().with_quote_identifier(false);
        let mut map: IndexMap<&str, i32> = IndexMap::new();
        map.insert("plain", 1);
        map.insert("with space", 2);
        let cfg = cfg.with_escape_bad_identifier_code_points(true);
        assert_eq!(
            to_string_with_config(&map, &cfg).ok().as_deref(),
            Some(r#"{plain:1,"with\u0020space":2}"#)
        );
    }

    #[test]
    fn non_string_keys_are_stringified() {
        let mut map = BTreeMap::new();
        map.insert(2u8, "two");
        map.insert(10u8, "ten");
        assert_eq!(
            to_string_with_config(&map, &compact()).ok().as_deref(),
            Some(r#"{"2":"two","10":"ten"}"#)
        );
    }

    #[derive(Facet)]
    #[repr(u8)]
    #[allow(dead_code)]
    enum Figure {
        Empty,
        Circle(f64),
        Segment(i32, i32),
        Rect { w: u8, h: u8 },
    }

    #[test]
    fn enums() {
        let shapes = [
            Figure::Empty,
            Figure::Circle(0.5),
            Figure::Segment(1, 2),
            Figure::Rect { w: 3, h: 4 },
        ];
        assert_eq!(
            to_string_with_config(&shapes, &compact()).ok().as_deref(),
            Some(r#"["Empty",{"Circle":0.5},{"Segment":[1,2]},{"Rect":{"w":3,"h":4}}]"#)
        );
    }

    #[derive(Facet)]
    struct Node {
        value: i32,
        #[facet(recursive_type)]
        me: Weak<Node>,
    }

    fn node_with_self_getter() -> (Arc<Node>, Config) {
        TypeRegistry::add_getter(Getter::new("getMe", |n: &Node| n.me.upgrade()));
        let node = Arc::new_cyclic(|me| Node {
            value: 1,
            me: me.clone(),
        });
        let spec = ProjectionSpec::of::<Node>().with_field_names(["value", "me"]);
        (node, compact().with_reflect_spec(spec))
    }

    #[test]
    fn self_reference_through_a_getter_is_a_loop() {
        let (node, cfg) = node_with_self_getter();
        let err = to_string_with_config(&node, &cfg).err();
        assert!(matches!(
            err.map(|e| e.kind),
            Some(JsonErrorKind::DataStructureLoop { type_name }) if type_name == "Node"
        ));
    }

    #[test]
    fn shared_but_acyclic_values_are_fine() {
        let shared = Arc::new(vec![1, 2]);
        let pair = [Arc::clone(&shared), shared];
        assert_eq!(
            to_string_with_config(&pair, &compact()).ok().as_deref(),
            Some("[[1,2],[1,2]]")
        );
    }

    #[test]
    fn pointers_without_a_borrow_are_unreadable() {
        let (node, _) = node_with_self_getter();
        let err = to_string_with_config(&node.me, &compact()).err();
        assert!(matches!(
            err.map(|e| e.kind),
            Some(JsonErrorKind::Reflection(e)) if e.cause == ReflectErrorCause::Unreadable
        ));
    }

    #[derive(Facet)]
    struct Raw;

    impl JsonEmit for Raw {
        fn to_json(&self, _cfg: &Config, out: &mut dyn JsonWrite) -> Result<()> {
            out.write_str("{\"raw\":true}");
            Ok(())
        }
    }

    #[test]
    fn self_emitting_values() {
        TypeRegistry::register_emitter::<Raw>();
        assert_eq!(
            to_string_with_config(&[Raw, Raw], &compact()).ok().as_deref(),
            Some(r#"[{"raw":true},{"raw":true}]"#)
        );
    }

    #[test]
    fn parsed_values_round_trip() {
        let mut members = IndexMap::new();
        members.insert("n".to_string(), JsonValue::Number(Number::I32(7)));
        members.insert(
            "p".to_string(),
            JsonValue::PrimitiveArray(PrimitiveArray::F32(vec![0.5, 1.5])),
        );
        let value = JsonValue::Array(vec![JsonValue::Null, JsonValue::Object(members)]);
        assert_eq!(
            to_string_with_config(&value, &compact()).ok().as_deref(),
            Some(r#"[null,{"n":7,"p":[0.5,1.5]}]"#)
        );
    }

    #[test]
    fn std_writer() {
        let out = to_writer_std(Vec::new(), &vec![true, false], &compact()).ok();
        assert_eq!(out.as_deref(), Some(&b"[true,false]"[..]));
    }
}
