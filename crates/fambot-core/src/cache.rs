//! A bounded, idle-expiring map.
//!
//! Both bounds hold at once: capacity eviction keeps memory finite over an
//! unbounded chat population, and the idle TTL drops entries that would
//! otherwise go stale. The payload type is opaque so the cache can be
//! tested in isolation.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use tokio::time::Instant;

struct Entry<V> {
    value: V,
    touched: Instant,
    /// Monotonic access counter; the smallest value is the LRU entry.
    seq: u64,
}

struct State<V> {
    map: HashMap<String, Entry<V>>,
    next_seq: u64,
}

pub struct ExpiringLru<V> {
    capacity: usize,
    ttl: Duration,
    state: Mutex<State<V>>,
}

impl<V: Clone> ExpiringLru<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            state: Mutex::new(State {
                map: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Returns the cached value, refreshing its recency. Expired entries
    /// are treated as absent and removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut st = self.lock();

        let expired = match st.map.get(key) {
            None => return None,
            Some(e) => now.duration_since(e.touched) > self.ttl,
        };
        if expired {
            st.map.remove(key);
            return None;
        }

        let seq = st.next_seq;
        st.next_seq += 1;
        let e = st.map.get_mut(key)?;
        e.touched = now;
        e.seq = seq;
        Some(e.value.clone())
    }

    /// Inserts or replaces, evicting the least-recently-used entry first
    /// when a new key would exceed capacity.
    pub fn put(&self, key: String, value: V) {
        let now = Instant::now();
        let mut st = self.lock();

        st.map
            .retain(|_, e| now.duration_since(e.touched) <= self.ttl);

        if !st.map.contains_key(&key) && st.map.len() >= self.capacity {
            if let Some(lru) = st
                .map
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone())
            {
                st.map.remove(&lru);
            }
        }

        let seq = st.next_seq;
        st.next_seq += 1;
        st.map.insert(
            key,
            Entry {
                value,
                touched: now,
                seq,
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.lock().map.remove(key);
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
