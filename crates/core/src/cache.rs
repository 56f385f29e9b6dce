use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

struct Slots<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Bumped per key on every invalidation.
    generations: HashMap<K, u64>,
    /// Bumped on `clear`.
    epoch: u64,
}

/// Snapshot of a key's invalidation count, taken before a read-through
/// fetch and checked by [`TtlCache::insert_if_unchanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    key: u64,
}

/// Read-through cache whose entries expire a fixed time after being written.
///
/// A zero TTL disables caching: inserts are dropped and every read misses.
pub struct TtlCache<K, V> {
    ttl: Duration,
    slots: RwLock<Slots<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: RwLock::new(Slots {
                entries: HashMap::new(),
                generations: HashMap::new(),
                epoch: 0,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, if any.
    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let slots = self.slots.read().await;
        slots
            .entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    /// Current generation of `key`. Take it before fetching the value from
    /// the backing store.
    pub async fn generation<Q>(&self, key: &Q) -> Generation
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let slots = self.slots.read().await;
        Generation {
            epoch: slots.epoch,
            key: slots.generations.get(key).copied().unwrap_or(0),
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        let mut slots = self.slots.write().await;
        slots.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Insert `value` unless `key` was invalidated after `seen` was taken.
    /// Returns whether the value was stored.
    pub async fn insert_if_unchanged(&self, key: K, value: V, seen: Generation) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        let mut slots = self.slots.write().await;
        let current = Generation {
            epoch: slots.epoch,
            key: slots.generations.get(&key).copied().unwrap_or(0),
        };
        if current != seen {
            return false;
        }
        slots.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
        true
    }

    pub async fn invalidate<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ToOwned<Owned = K> + ?Sized,
    {
        let mut slots = self.slots.write().await;
        slots.entries.remove(key);
        match slots.generations.get_mut(key) {
            Some(generation) => *generation += 1,
            None => {
                slots.generations.insert(key.to_owned(), 1);
            }
        }
    }

    pub async fn clear(&self) {
        let mut slots = self.slots.write().await;
        slots.entries.clear();
        slots.epoch += 1;
    }

    /// Drop expired entries; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut slots = self.slots.write().await;
        let before = slots.entries.len();
        let ttl = self.ttl;
        slots.entries.retain(|_, e| e.stored_at.elapsed() < ttl);
        before - slots.entries.len()
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.entries.is_empty()
    }
}
