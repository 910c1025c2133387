//! Client-side read cache.
//!
//! Holds the last value fetched for each [`CacheKey`]. Invalidation marks an
//! entry stale rather than dropping it, and stale entries are never served.
//! There is no TTL: an entry stays fresh until something invalidates it.
//!
//! Every key carries a generation counter that only moves forward. A
//! read-through fetch notes the generation before calling the store and
//! stores its result with [`EntityCache::set_if_generation`], which refuses
//! the write if an invalidation happened in between.

use registrar_types::{CacheKey, EntityKind, Record, Scope};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// A cached value: one record or an ordered listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    One(Record),
    Many(Vec<Record>),
}

impl CachedValue {
    /// Flattens into a list (a single record becomes a one-element list).
    pub fn into_records(self) -> Vec<Record> {
        match self {
            CachedValue::One(r) => vec![r],
            CachedValue::Many(rs) => rs,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    value: Option<CachedValue>,
    stale: bool,
    generation: u64,
}

impl Slot {
    fn fresh(&self) -> Option<&CachedValue> {
        if self.stale { None } else { self.value.as_ref() }
    }
}

/// Counters for cache reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

/// The shared read cache. Construct one per process (or per test) and pass
/// it to the synchronizer.
#[derive(Debug, Default)]
pub struct EntityCache {
    slots: RwLock<HashMap<CacheKey, Slot>>,
    stats: RwLock<CacheStats>,
}

impl EntityCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value under `key` if present and not stale.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let value = self.slots.read().await.get(key).and_then(Slot::fresh).cloned();
        let mut stats = self.stats.write().await;
        if value.is_some() {
            stats.hits += 1;
            trace!("cache hit {key}");
        } else {
            stats.misses += 1;
            trace!("cache miss {key}");
        }
        value
    }

    /// Stores a fresh value unconditionally.
    pub async fn set(&self, key: CacheKey, value: CachedValue) {
        let mut slots = self.slots.write().await;
        let slot = slots.entry(key).or_default();
        slot.value = Some(value);
        slot.stale = false;
    }

    /// Stores a fresh value only if no invalidation has touched `key` since
    /// `generation` was read. Returns whether the value was stored.
    pub async fn set_if_generation(&self, key: CacheKey, generation: u64, value: CachedValue) -> bool {
        let mut slots = self.slots.write().await;
        let slot = slots.entry(key).or_default();
        if slot.generation != generation {
            return false;
        }
        slot.value = Some(value);
        slot.stale = false;
        true
    }

    /// Current generation of `key` (0 for a key never invalidated).
    ///
    /// Reserves an empty slot for an unseen key, so a sweep by
    /// [`EntityCache::invalidate_related`] that lands before the fetch
    /// completes still bumps it.
    pub async fn generation(&self, key: &CacheKey) -> u64 {
        if let Some(slot) = self.slots.read().await.get(key) {
            return slot.generation;
        }
        self.slots.write().await.entry(key.clone()).or_default().generation
    }

    /// Whether a read of `key` would go to the store.
    pub async fn is_stale(&self, key: &CacheKey) -> bool {
        self.slots
            .read()
            .await
            .get(key)
            .and_then(Slot::fresh)
            .is_none()
    }

    /// Marks `key` stale. Does not refetch; the next read does.
    ///
    /// Only this exact key is affected: `(Class, All)` and `(Class, Id(c))`
    /// are independent.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.invalidate_all(std::iter::once(key.clone())).await;
    }

    /// Marks every key in `keys` stale under a single write lock.
    pub async fn invalidate_all(&self, keys: impl IntoIterator<Item = CacheKey>) {
        let mut slots = self.slots.write().await;
        let mut count = 0;
        for key in keys {
            debug!("invalidate {key}");
            bump(slots.entry(key).or_default());
            count += 1;
        }
        drop(slots);
        self.stats.write().await.invalidations += count;
    }

    /// Marks stale every cached `(kind, RelatedTo(owner_kind, _))` view.
    ///
    /// Used when a record of `kind` changes and the views listing it are
    /// keyed by owners the record does not know about.
    pub async fn invalidate_related(&self, kind: EntityKind, owner_kind: EntityKind) {
        let mut slots = self.slots.write().await;
        let mut count = 0;
        for (key, slot) in slots.iter_mut() {
            if key.kind == kind && matches!(key.scope, Scope::RelatedTo(o, _) if o == owner_kind) {
                debug!("invalidate {key}");
                bump(slot);
                count += 1;
            }
        }
        drop(slots);
        self.stats.write().await.invalidations += count;
    }

    /// Number of fresh entries.
    pub async fn fresh_len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|s| s.fresh().is_some())
            .count()
    }

    /// Snapshot of the read counters.
    pub async fn stats(&self) -> CacheStats {
        *self.stats.read().await
    }

    /// Marks every entry stale.
    pub async fn clear(&self) {
        let mut slots = self.slots.write().await;
        for slot in slots.values_mut() {
            bump(slot);
        }
        let count = slots.len() as u64;
        drop(slots);
        self.stats.write().await.invalidations += count;
    }
}

/// Stale values are never served, so the slot keeps only its generation.
fn bump(slot: &mut Slot) {
    slot.value = None;
    slot.stale = true;
    slot.generation += 1;
}
