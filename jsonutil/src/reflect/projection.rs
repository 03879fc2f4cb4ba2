//! Which fields of a record type are written, and under what names.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use facet::Facet;
use facet_core::Shape;
use indexmap::IndexMap;
use tracing::debug;

use super::registry::TypeRegistry;
use crate::error::{JsonError, ReflectError, ReflectErrorCause, Result};

/// A projection of one record type: an optional explicit list of field names
/// and an optional field name to alias map.
///
/// Names that are not valid identifiers are dropped when the spec is built.
/// With no explicit names every non-transient field visible at
/// the configured privacy level is written; with explicit names exactly those
/// members are written, regardless of privacy.
///
/// Two specs compare equal when type, names and aliases all match; use
/// [`ProjectionSpec::same_type`] for the coarser comparison by type alone.
#[derive(Debug, Clone)]
pub struct ProjectionSpec {
    shape: &'static Shape,
    field_names: Option<Vec<String>>,
    aliases: Option<IndexMap<String, String>>,
}

impl PartialEq for ProjectionSpec {
    fn eq(&self, other: &Self) -> bool {
        self.same_type(other)
            && self.field_names == other.field_names
            && self.aliases == other.aliases
    }
}

impl Eq for ProjectionSpec {}

fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            (first == '_' || unicode_ident::is_xid_start(first))
                && chars.all(unicode_ident::is_xid_continue)
        }
        None => false,
    }
}

impl ProjectionSpec {
    /// All fields of `T`, no aliases.
    pub fn of<T: Facet<'static>>() -> Self {
        Self::for_shape(T::SHAPE)
    }

    /// All fields of the type described by `shape`, no aliases.
    pub fn for_shape(shape: &'static Shape) -> Self {
        ProjectionSpec {
            shape,
            field_names: None,
            aliases: None,
        }
    }

    /// Restrict the projection to `names`, in order. Surrounding whitespace
    /// is trimmed; invalid and repeated names are dropped. If nothing is left
    /// every field is written again.
    pub fn with_field_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !is_valid_field_name(name) {
                debug!(name, shape = %self.shape, "dropping invalid field name");
                continue;
            }
            if !kept.iter().any(|k| k == name) {
                kept.push(name.to_string());
            }
        }
        self.field_names = (!kept.is_empty()).then_some(kept);
        self
    }

    /// Write the fields named by the keys under the names given by the
    /// values. Keys are trimmed and must be valid field names; empty aliases
    /// are dropped.
    pub fn with_aliases<I, K, V>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut kept = IndexMap::new();
        for (name, alias) in aliases {
            let name = name.as_ref().trim();
            let alias = alias.into();
            if is_valid_field_name(name) && !alias.is_empty() {
                kept.insert(name.to_string(), alias);
            } else {
                debug!(
                    name,
                    alias = alias.as_str(),
                    shape = %self.shape,
                    "dropping invalid alias"
                );
            }
        }
        self.aliases = (!kept.is_empty()).then_some(kept);
        self
    }

    /// Parse a descriptor of the form `Type,field1,field2,name=alias`.
    ///
    /// `Type` is looked up in the [`TypeRegistry`]. Tokens containing `=`
    /// become aliases when both sides are non-empty; other non-empty tokens
    /// become field names.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut parts = descriptor.split(',');
        let type_name = parts.next().unwrap_or_default().trim();
        let shape = TypeRegistry::lookup(type_name).ok_or_else(|| {
            JsonError::from(ReflectError::new(type_name, None, ReflectErrorCause::UnknownType))
        })?;

        let mut names = Vec::new();
        let mut aliases = Vec::new();
        for token in parts {
            let token = token.trim();
            if token.contains('=') {
                match token.split('=').collect::<Vec<_>>().as_slice() {
                    [name, alias] if !name.trim().is_empty() && !alias.trim().is_empty() => {
                        aliases.push((name.trim(), alias.trim()));
                    }
                    _ => debug!(token, descriptor, "ignoring malformed alias"),
                }
            } else if !token.is_empty() {
                names.push(token);
            }
        }

        Ok(Self::for_shape(shape)
            .with_field_names(names)
            .with_aliases(aliases))
    }

    /// The described shape.
    pub fn shape(&self) -> &'static Shape {
        self.shape
    }

    /// The explicit field names, if any.
    pub fn field_names(&self) -> Option<&[String]> {
        self.field_names.as_deref()
    }

    /// The alias map, if any.
    pub fn aliases(&self) -> Option<&IndexMap<String, String>> {
        self.aliases.as_ref()
    }

    /// The output name for `field`.
    pub fn alias<'a>(&'a self, field: &'a str) -> &'a str {
        self.aliases
            .as_ref()
            .and_then(|a| a.get(field))
            .map_or(field, String::as_str)
    }

    /// Returns true if both specs project the same type.
    pub fn same_type(&self, other: &Self) -> bool {
        self.shape == other.shape
    }
}
