//! Process-wide lookup of record types by name, their getters, and the
//! types that write their own JSON.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::collections::HashMap;
use std::sync::LazyLock;

use facet::Facet;
use facet_core::Shape;
use facet_reflect::Peek;
use parking_lot::RwLock;
use tracing::debug;

use super::JsonEmit;
use super::cache::ReflectionCache;
use super::getter::Getter;
use crate::config::Config;
use crate::error::{ReflectError, ReflectErrorCause, Result};
use crate::write::JsonWrite;

/// Writes a value of a registered [`JsonEmit`] type.
pub(crate) type EmitFn =
    for<'mem, 'facet> fn(Peek<'mem, 'facet>, &Config, &mut dyn JsonWrite) -> Result<()>;

#[derive(Default)]
struct Registry {
    names: HashMap<String, &'static Shape>,
    getters: HashMap<&'static Shape, Vec<Arc<Getter>>>,
    emitters: HashMap<&'static Shape, EmitFn>,
}

static REGISTRY: LazyLock<RwLock<Registry>> = LazyLock::new(|| RwLock::new(Registry::default()));

fn emit_as<'mem, 'facet, T>(
    peek: Peek<'mem, 'facet>,
    cfg: &Config,
    out: &mut dyn JsonWrite,
) -> Result<()>
where
    T: JsonEmit + for<'a> Facet<'a>,
{
    let value = peek.get::<T>().map_err(|_| {
        ReflectError::new(peek.shape().to_string(), None, ReflectErrorCause::ShapeMismatch)
    })?;
    value.to_json(cfg, out)
}

/// Record types reachable from
/// [`ProjectionSpec::parse`](super::ProjectionSpec::parse) and from
/// `JSONUTIL_REFLECT_CLASS_<n>` environment variables, the getters of
/// record types, and the types that write their own JSON.
pub struct TypeRegistry;

impl TypeRegistry {
    /// Make `T` reachable under its type identifier and its full name.
    pub fn register<T: Facet<'static>>() {
        Self::register_shape(T::SHAPE);
    }

    /// Make `shape` reachable under its type identifier and its full name.
    pub fn register_shape(shape: &'static Shape) {
        let full = shape.to_string();
        debug!(name = shape.type_identifier, full = full.as_str(), "registering shape");
        let mut registry = REGISTRY.write();
        registry.names.insert(shape.type_identifier.to_string(), shape);
        registry.names.insert(full, shape);
    }

    /// Find a registered shape by name.
    pub fn lookup(name: &str) -> Option<&'static Shape> {
        REGISTRY.read().names.get(name).copied()
    }

    /// Add a getter to its record type. A getter with the same name as an
    /// earlier one replaces it.
    ///
    /// Cached projections are dropped, since any of them may read the
    /// record type.
    pub fn add_getter(getter: Getter) {
        debug!(owner = %getter.owner, getter = getter.name, "adding getter");
        {
            let mut registry = REGISTRY.write();
            let getters = registry.getters.entry(getter.owner).or_default();
            getters.retain(|g| g.name != getter.name);
            getters.push(Arc::new(getter));
        }
        ReflectionCache::global().clear();
    }

    /// The getters registered for `shape`, in registration order.
    pub fn getters(shape: &'static Shape) -> Vec<Arc<Getter>> {
        REGISTRY
            .read()
            .getters
            .get(shape)
            .cloned()
            .unwrap_or_default()
    }

    /// Have values of `T` written by their [`JsonEmit`] impl.
    pub fn register_emitter<T>()
    where
        T: JsonEmit + for<'a> Facet<'a> + 'static,
    {
        let shape = <T as Facet<'static>>::SHAPE;
        debug!(shape = %shape, "registering emitter");
        REGISTRY.write().emitters.insert(shape, emit_as::<T>);
    }

    pub(crate) fn emitter(shape: &'static Shape) -> Option<EmitFn> {
        REGISTRY.read().emitters.get(shape).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Facet)]
    struct Registered {
        n: u8,
    }

    #[test]
    fn shapes_are_found_by_name() {
        TypeRegistry::register::<Registered>();
        assert_eq!(TypeRegistry::lookup("Registered"), Some(Registered::SHAPE));
        assert_eq!(TypeRegistry::lookup("Unregistered"), None);
    }

    #[test]
    fn getters_replace_by_name() {
        TypeRegistry::add_getter(Getter::new("getN", |r: &Registered| r.n));
        TypeRegistry::add_getter(Getter::new("getN", |r: &Registered| u32::from(r.n)));
        let getters = TypeRegistry::getters(Registered::SHAPE);
        assert_eq!(getters.len(), 1);
        assert_eq!(getters[0].returns, u32::SHAPE);
    }
}
