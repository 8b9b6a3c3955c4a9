use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_CAPACITY: usize = 4096;

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry<V> {
    value: V,
    last_hit: Instant,
    hits: u64,
}

/// Memoizes formatted cell values. Entries not hit within `ttl` are dropped
/// on the next prune; prunes run at most once per `prune_interval`.
pub struct CellCache<K, V, C = SystemClock> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
    prune_interval: Duration,
    capacity: usize,
    last_prune: Instant,
    clock: C,
}

impl<K, V> CellCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::with_clock(DEFAULT_TTL, DEFAULT_PRUNE_INTERVAL, DEFAULT_CAPACITY, SystemClock)
    }
}

impl<K, V> Default for CellCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> CellCache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    pub fn with_clock(ttl: Duration, prune_interval: Duration, capacity: usize, clock: C) -> Self {
        let last_prune = clock.now();
        Self {
            entries: HashMap::new(),
            ttl,
            prune_interval,
            capacity,
            last_prune,
            clock,
        }
    }

    pub fn get_or_insert_with<F>(&mut self, key: K, create: F) -> V
    where
        F: FnOnce() -> V,
    {
        let now = self.clock.now();
        self.prune(now);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_hit = now;
            entry.hits += 1;
            return entry.value.clone();
        }
        let value = create();
        if self.capacity == 0 {
            return value;
        }
        if self.entries.len() >= self.capacity {
            self.evict_least_recent();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                last_hit: now,
                hits: 0,
            },
        );
        value
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_prune) < self.prune_interval {
            return;
        }
        self.last_prune = now;
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.last_hit) <= ttl);
        let pruned = before - self.entries.len();
        if pruned > 0 {
            let hits: u64 = self.entries.values().map(|entry| entry.hits).sum();
            log::debug!(
                "cell cache: {pruned} pruned, {} remaining, {hits} hits combined",
                self.entries.len()
            );
        }
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_hit)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}
