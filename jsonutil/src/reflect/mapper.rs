//! Turning a record into an ordered list of named values.
//!
//! A record is a struct with named fields. A field marked
//! `#[facet(flatten)]` embeds a parent record: its fields are inherited,
//! and hidden by same-named fields of the embedding record.
//!
//! For every candidate field a getter named `get<Field>` (or `is<Field>` for
//! booleans) is preferred when its declared type is compatible with the
//! field's. Without a usable getter the field itself is read if the privacy
//! level allows it. Explicitly requested names that resolve to nothing are
//! an error; everything else that cannot be read is skipped.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::collections::HashMap;

use facet_core::{Field, Shape, StructKind, StructType, Type, UserType};
use facet_reflect::Peek;
use indexmap::IndexMap;
use tracing::trace;

use super::attrs::{Visibility, is_transient};
use super::cache::{ReflectionCache, ReflectionData};
use super::compat::is_compatible;
use super::getter::{Computed, Getter};
use super::projection::ProjectionSpec;
use super::registry::TypeRegistry;
use crate::config::Config;
use crate::error::{ReflectError, ReflectErrorCause, Result};

/// The named-field struct behind `shape`, if it is one.
pub(crate) fn record_type(shape: &'static Shape) -> Option<StructType> {
    match shape.ty {
        Type::User(UserType::Struct(sd)) if matches!(sd.kind, StructKind::Struct) => Some(sd),
        _ => None,
    }
}

/// `shape` and every record it embeds, nearest first, each with the field
/// indices leading to it from `shape`.
fn lineage(shape: &'static Shape) -> Vec<(&'static Shape, Vec<usize>)> {
    let mut found: Vec<(&'static Shape, Vec<usize>)> = Vec::new();
    let mut queue = VecDeque::from([(shape, Vec::new())]);
    while let Some((s, path)) = queue.pop_front() {
        let Some(sd) = record_type(s) else {
            continue;
        };
        if found.iter().any(|(seen, _)| *seen == s) {
            continue;
        }
        for (i, field) in sd.fields.iter().enumerate() {
            if field.is_flattened() {
                let mut inner = path.clone();
                inner.push(i);
                queue.push_back((field.shape(), inner));
            }
        }
        found.push((s, path));
    }
    found
}

/// A field declared on `owner`, reached from the record through `path`.
#[derive(Debug, Clone)]
pub(crate) struct FieldRef {
    pub field: &'static Field,
    pub owner: &'static Shape,
    pub path: Vec<usize>,
    pub index: usize,
}

pub(crate) type FieldTable = IndexMap<&'static str, FieldRef>;

/// Every field of a record and the records it embeds; a field hides
/// same-named fields further out.
pub(crate) fn collect_fields(shape: &'static Shape) -> FieldTable {
    let mut fields = IndexMap::new();
    for (owner, path) in lineage(shape) {
        let Some(sd) = record_type(owner) else {
            continue;
        };
        for (index, field) in sd.fields.iter().enumerate() {
            if field.is_flattened() {
                continue;
            }
            fields.entry(field.name).or_insert_with(|| FieldRef {
                field,
                owner,
                path: path.clone(),
                index,
            });
        }
    }
    fields
}

/// A getter of an embedded record.
#[derive(Debug, Clone)]
pub(crate) struct GetterRef {
    pub getter: Arc<Getter>,
    pub path: Vec<usize>,
}

/// Every getter of a record and the records it embeds, regardless of
/// visibility.
#[derive(Debug)]
pub(crate) struct GetterTable {
    all: HashMap<&'static str, GetterRef>,
    min_level: Visibility,
}

impl GetterTable {
    pub(crate) fn scan(shape: &'static Shape) -> Self {
        let mut all = HashMap::new();
        let mut min_level = Visibility::Public;
        for (owner, path) in lineage(shape) {
            for getter in TypeRegistry::getters(owner) {
                if !getter.is_getter() || all.contains_key(getter.name) {
                    continue;
                }
                min_level = min_level.min(getter.visibility);
                all.insert(
                    getter.name,
                    GetterRef {
                        getter,
                        path: path.clone(),
                    },
                );
            }
        }
        GetterTable { all, min_level }
    }

    /// The getters visible at `privacy`. No copy is made when every getter
    /// qualifies.
    pub(crate) fn at(&self, privacy: Visibility) -> Cow<'_, HashMap<&'static str, GetterRef>> {
        if privacy <= self.min_level {
            Cow::Borrowed(&self.all)
        } else {
            Cow::Owned(
                self.all
                    .iter()
                    .filter(|(_, g)| g.getter.visibility >= privacy)
                    .map(|(name, g)| (*name, g.clone()))
                    .collect(),
            )
        }
    }
}

fn bean_name(prefix: &str, field: &str) -> String {
    let mut chars = field.chars();
    let mut name = String::with_capacity(prefix.len() + field.len());
    name.push_str(prefix);
    if let Some(first) = chars.next() {
        name.extend(first.to_uppercase());
        name.push_str(chars.as_str());
    }
    name
}

fn find_getter(
    shape: &'static Shape,
    getters: &HashMap<&'static str, GetterRef>,
    field: Option<&FieldRef>,
    name: &str,
    cache: Option<&ReflectionCache>,
) -> Option<GetterRef> {
    if let (Some(cache), Some(f)) = (cache, field) {
        match cache.compat(shape, f.field.name) {
            Some(Some(getter)) => return getters.get(getter).cloned(),
            Some(None) => return None,
            None => {}
        }
    }

    let getter = getters
        .get(bean_name("get", name).as_str())
        .or_else(|| getters.get(bean_name("is", name).as_str()))
        .cloned();
    let Some(f) = field else {
        return getter;
    };
    let g = getter?;

    let compatible = is_compatible(f.field.shape(), g.getter.returns);
    if !compatible {
        trace!(
            %shape,
            field = f.field.name,
            getter = g.getter.name,
            "getter type does not match field"
        );
    }
    if let Some(cache) = cache {
        cache.record_compat(shape, f.field.name, compatible.then_some(g.getter.name));
    }
    compatible.then_some(g)
}

/// Work out which members `spec` writes at `privacy`, using `cache` for the
/// per-type tables when given.
pub(crate) fn resolve(
    spec: &ProjectionSpec,
    privacy: Visibility,
    cache: Option<&ReflectionCache>,
) -> Result<ReflectionData> {
    let shape = spec.shape();
    let fields = match cache {
        Some(cache) => cache.fields(shape),
        None => Arc::new(collect_fields(shape)),
    };
    let explicit = spec.field_names();
    let privacy = if explicit.is_some() {
        Visibility::Private
    } else {
        privacy
    };
    let is_private = privacy == Visibility::Private;
    let table = match cache {
        Some(cache) => cache.getters(shape),
        None => Arc::new(GetterTable::scan(shape)),
    };
    let getters = table.at(privacy);

    let names: Vec<&str> = match explicit {
        Some(names) => names.iter().map(String::as_str).collect(),
        None => fields.keys().copied().collect(),
    };

    let mut members = Vec::with_capacity(names.len());
    for name in names {
        let field = fields.get(name);
        if explicit.is_none() && field.is_some_and(|f| is_transient(f.field)) {
            continue;
        }
        let output = spec.alias(name).to_string();
        if let Some(GetterRef { getter, path }) = find_getter(shape, &getters, field, name, cache)
        {
            members.push(Member {
                name: output,
                source: MemberSource::Getter { getter, path },
            });
        } else if let Some(f) = field
            && (is_private || Visibility::of(f.field) >= privacy)
        {
            members.push(Member {
                name: output,
                source: MemberSource::Field {
                    field: f.field,
                    path: f.path.clone(),
                    index: f.index,
                },
            });
        } else if explicit.is_some() {
            return Err(ReflectError::new(
                shape.type_identifier,
                Some(name),
                ReflectErrorCause::NoSuchMember,
            )
            .into());
        }
    }

    trace!(%shape, %privacy, members = members.len(), "resolved projection");
    Ok(ReflectionData::new(members, privacy))
}

/// One value written for a record.
#[derive(Debug, Clone)]
pub struct Member {
    /// Output name (the alias, if the field has one)
    pub name: String,
    /// Where the value comes from
    pub source: MemberSource,
}

/// Where a [`Member`]'s value comes from.
#[derive(Debug, Clone)]
pub enum MemberSource {
    /// Read a field directly
    Field {
        /// The field
        field: &'static Field,
        /// Indices of the flattened fields leading to the declaring record
        path: Vec<usize>,
        /// Index of the field in the declaring record
        index: usize,
    },
    /// Call a getter
    Getter {
        /// The getter
        getter: Arc<Getter>,
        /// Indices of the flattened fields leading to the declaring record
        path: Vec<usize>,
    },
}

/// The value of one member of a record.
pub enum MemberValue<'mem, 'facet> {
    /// Borrowed from the record
    Field(Peek<'mem, 'facet>),
    /// Returned by a getter
    Computed(Box<dyn Computed>),
}

impl Member {
    /// Read this member from `record`.
    pub fn read<'mem, 'facet>(
        &self,
        record: Peek<'mem, 'facet>,
    ) -> Result<MemberValue<'mem, 'facet>> {
        let ty = record.shape().type_identifier;
        let mismatch = || {
            ReflectError::new(ty, Some(self.name.as_str()), ReflectErrorCause::ShapeMismatch)
        };
        let descend = |path: &[usize]| -> Result<Peek<'mem, 'facet>> {
            let mut owner = record;
            for &i in path {
                owner = owner
                    .into_struct()
                    .ok()
                    .and_then(|s| s.field(i).ok())
                    .ok_or_else(mismatch)?;
            }
            Ok(owner)
        };
        match &self.source {
            MemberSource::Field { path, index, .. } => {
                let owner = descend(path)?;
                let value = owner
                    .into_struct()
                    .ok()
                    .and_then(|s| s.field(*index).ok())
                    .ok_or_else(mismatch)?;
                Ok(MemberValue::Field(value))
            }
            MemberSource::Getter { getter, path } => match getter.invoke(descend(path)?) {
                Some(Ok(value)) => Ok(MemberValue::Computed(value)),
                Some(Err(msg)) => Err(ReflectError::new(
                    ty,
                    Some(getter.name),
                    ReflectErrorCause::Invocation(msg),
                )
                .into()),
                None => Err(mismatch().into()),
            },
        }
    }
}

/// The members `cfg` projects out of `record`, with their values.
///
/// Uses the projection registered for the record's type in `cfg`, or all
/// fields if there is none.
pub fn project<'mem, 'facet>(
    record: Peek<'mem, 'facet>,
    cfg: &Config,
) -> Result<Vec<(String, MemberValue<'mem, 'facet>)>> {
    let spec = cfg.projection_for(record.shape());
    let data = if cfg.cache_reflection_data {
        ReflectionCache::global().data(&spec, cfg.reflection_privacy)?
    } else {
        Arc::new(resolve(&spec, cfg.reflection_privacy, None)?)
    };
    data.members()
        .iter()
        .map(|member| Ok((member.name.clone(), member.read(record)?)))
        .collect()
}
