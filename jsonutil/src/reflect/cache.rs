//! Memoized projection data, shared by every encoder in the process.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::LazyLock;

use facet_core::Shape;
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::attrs::Visibility;
use super::mapper::{FieldTable, GetterTable, Member, collect_fields, resolve};
use super::projection::ProjectionSpec;
use crate::error::Result;

/// The resolved members of one projection at one privacy level.
#[derive(Debug, Clone)]
pub struct ReflectionData {
    members: Vec<Member>,
    privacy: Visibility,
}

impl ReflectionData {
    pub(crate) fn new(members: Vec<Member>, privacy: Visibility) -> Self {
        ReflectionData { members, privacy }
    }

    /// Members in output order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// The privacy level the members were resolved at.
    pub fn privacy(&self) -> Visibility {
        self.privacy
    }
}

struct Resolved {
    spec: ProjectionSpec,
    by_privacy: [Option<Arc<ReflectionData>>; 4],
}

/// Everything recorded for one record type.
struct Slot {
    fields: Option<Arc<FieldTable>>,
    getters: Option<Arc<GetterTable>>,
    compat: HashMap<&'static str, Option<&'static str>>,
    resolved: Option<Resolved>,
    last_used: AtomicU64,
}

impl Slot {
    fn new(tick: u64) -> Self {
        Slot {
            fields: None,
            getters: None,
            compat: HashMap::new(),
            resolved: None,
            last_used: AtomicU64::new(tick),
        }
    }
}

/// Per-type field tables, getter tables, getter compatibility and resolved
/// [`ReflectionData`], bounded to a number of record types.
///
/// Every table lives in one slot per record type. When the cache is full,
/// the least recently used slot is evicted with everything recorded in it.
/// Readers never block each other; two threads missing on the same type may
/// both resolve it, and the later insert wins.
pub struct ReflectionCache {
    slots: RwLock<HashMap<&'static Shape, Slot>>,
    capacity: usize,
    clock: AtomicU64,
}

static GLOBAL: LazyLock<ReflectionCache> =
    LazyLock::new(|| ReflectionCache::new(ReflectionCache::DEFAULT_CAPACITY));

impl ReflectionCache {
    /// Number of record types kept by the process-wide cache.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// An empty cache holding at most `capacity` record types.
    pub fn new(capacity: usize) -> Self {
        ReflectionCache {
            slots: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
        }
    }

    /// The cache used when `cache_reflection_data` is enabled.
    pub fn global() -> &'static ReflectionCache {
        &GLOBAL
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Look something up in the slot for `shape`, marking it used on a hit.
    fn read<R>(&self, shape: &'static Shape, f: impl FnOnce(&Slot) -> Option<R>) -> Option<R> {
        let slots = self.slots.read();
        let slot = slots.get(shape)?;
        let found = f(slot)?;
        slot.last_used.store(self.tick(), Ordering::Relaxed);
        Some(found)
    }

    /// Change the slot for `shape`, making room for it first if it is new.
    fn write<R>(&self, shape: &'static Shape, f: impl FnOnce(&mut Slot) -> R) -> R {
        let tick = self.tick();
        let mut slots = self.slots.write();
        if !slots.contains_key(shape) {
            self.make_room(&mut slots);
        }
        let slot = slots.entry(shape).or_insert_with(|| Slot::new(tick));
        slot.last_used.store(tick, Ordering::Relaxed);
        f(slot)
    }

    fn make_room(&self, slots: &mut HashMap<&'static Shape, Slot>) {
        while slots.len() >= self.capacity {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used.load(Ordering::Relaxed))
                .map(|(shape, _)| *shape);
            let Some(shape) = oldest else {
                break;
            };
            debug!(%shape, "evicting reflection data");
            slots.remove(shape);
        }
    }

    /// The members `spec` writes at `privacy`, resolving them on a miss.
    ///
    /// A cached entry is reused only if its spec equals `spec`; a different
    /// spec for the same type replaces it.
    pub fn data(
        &self,
        spec: &ProjectionSpec,
        privacy: Visibility,
    ) -> Result<Arc<ReflectionData>> {
        let privacy = if spec.field_names().is_some() {
            Visibility::Private
        } else {
            privacy
        };
        let shape = spec.shape();

        let hit = self.read(shape, |slot| {
            let resolved = slot.resolved.as_ref().filter(|r| r.spec == *spec)?;
            resolved.by_privacy[privacy.level()].clone()
        });
        if let Some(data) = hit {
            trace!(%shape, %privacy, "reflection cache hit");
            return Ok(data);
        }

        let data = Arc::new(resolve(spec, privacy, Some(self))?);
        self.write(shape, |slot| {
            let resolved = match &mut slot.resolved {
                Some(r) if r.spec == *spec => r,
                other => {
                    debug!(%shape, "caching projection");
                    other.insert(Resolved {
                        spec: spec.clone(),
                        by_privacy: Default::default(),
                    })
                }
            };
            resolved.by_privacy[privacy.level()] = Some(Arc::clone(&data));
        });
        Ok(data)
    }

    pub(crate) fn fields(&self, shape: &'static Shape) -> Arc<FieldTable> {
        if let Some(fields) = self.read(shape, |slot| slot.fields.clone()) {
            return fields;
        }
        let fields = Arc::new(collect_fields(shape));
        self.write(shape, |slot| slot.fields = Some(Arc::clone(&fields)));
        fields
    }

    pub(crate) fn getters(&self, shape: &'static Shape) -> Arc<GetterTable> {
        if let Some(table) = self.read(shape, |slot| slot.getters.clone()) {
            return table;
        }
        let table = Arc::new(GetterTable::scan(shape));
        self.write(shape, |slot| slot.getters = Some(Arc::clone(&table)));
        table
    }

    /// `Some(Some(getter))` if the field is known to have a compatible
    /// getter, `Some(None)` if it is known not to, `None` if unknown.
    pub(crate) fn compat(
        &self,
        shape: &'static Shape,
        field: &'static str,
    ) -> Option<Option<&'static str>> {
        self.read(shape, |slot| slot.compat.get(field).copied())
    }

    pub(crate) fn record_compat(
        &self,
        shape: &'static Shape,
        field: &'static str,
        getter: Option<&'static str>,
    ) {
        self.write(shape, |slot| {
            slot.compat.insert(field, getter);
        });
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.slots.write().clear();
    }

    /// Number of record types with anything cached.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if something is cached for `shape`.
    pub fn contains(&self, shape: &'static Shape) -> bool {
        self.slots.read().contains_key(shape)
    }
}
