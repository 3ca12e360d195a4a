//! TTL-bounded, capacity-bounded memo store
//!
//! Expiry is evaluated lazily on read; there is no background sweep. When the
//! store is full, the oldest *inserted* entry is evicted regardless of how often
//! it has been read.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// One cached value with its insertion instant
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    /// Position in insertion order
    seq: u64,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Insertion sequence -> key, oldest first
    order: BTreeMap<u64, K>,
    next_seq: u64,
}

/// Keyed memo store with per-instance TTL and capacity
#[derive(Debug)]
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Create an empty cache. `capacity` is clamped to at least one entry.
    pub fn new(name: &'static str, ttl: Duration, capacity: usize) -> Self {
        Self {
            name,
            ttl,
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Namespace name, used in log output
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the value if present and younger than the TTL. An expired entry
    /// is removed as a side effect.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().await;
        let (expired, seq) = match inner.entries.get(key) {
            None => return None,
            Some(entry) => (entry.inserted_at.elapsed() >= self.ttl, entry.seq),
        };

        if expired {
            inner.entries.remove(key);
            inner.order.remove(&seq);
            tracing::debug!(cache = self.name, key = ?key, "Cache entry expired");
            return None;
        }

        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store a value stamped with the current instant. Re-putting a key
    /// refreshes it and moves it to the back of the insertion order.
    pub async fn put(&self, key: K, value: V) {
        let mut inner = self.inner.lock().await;

        if let Some(previous) = inner.entries.remove(&key) {
            inner.order.remove(&previous.seq);
        } else if inner.entries.len() >= self.capacity
            && let Some((_, oldest)) = inner.order.pop_first()
        {
            inner.entries.remove(&oldest);
            tracing::debug!(cache = self.name, key = ?oldest, "Evicted oldest cache entry");
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                seq,
            },
        );
    }

    /// Drop a single entry
    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().await;
        let entry = inner.entries.remove(key)?;
        inner.order.remove(&entry.seq);
        Some(entry.value)
    }

    /// Drop everything
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of stored entries, expired ones included until they are read
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stored keys, oldest insertion first
    pub async fn keys(&self) -> Vec<K> {
        self.inner.lock().await.order.values().cloned().collect()
    }
}
