//! CounterCache: bounded LRU of per-key rate counters

use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};
use parking_lot::RwLock;
use tracing::trace;

use crate::builder::CounterCacheBuilder;
use crate::error::Result;
use crate::lru::LruIndex;
use crate::rate::{Decision, Entry, Transition};
use crate::stats::CacheStats;

/// Callback run when a key leaves the cache, with the key and its last count
pub type EvictionCallback<K> = Box<dyn Fn(K, u64) + Send + Sync>;

/// Bounded counter store that decides whether each occurrence of a key is
/// within a per-window limit.
///
/// All state sits behind one `RwLock`. Anything that changes recency order
/// or counters (`incr`, `get`, `touch`, `remove`, `clear`) takes the write
/// lock; `peek`, `contains`, `len` and `keys` share the read lock.
///
/// The eviction callback runs on the calling thread after the lock has been
/// released, once per departed key. It may call back into the same cache.
/// Another thread may re-insert a key before that key's departure callback
/// has run, so callbacks can arrive after the key is tracked again.
pub struct CounterCache<K> {
    /// Recency-ordered counter entries
    index: RwLock<LruIndex<K, Entry>>,

    /// `None` when over-limit keys never reset
    window: Option<Duration>,

    on_evict: Option<EvictionCallback<K>>,

    /// Operation statistics
    stats: CacheStats,
}

impl<K> CounterCache<K>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache holding at most `capacity` keys.
    ///
    /// A zero `window` means a key that goes over its limit stays blocked
    /// until it is removed or evicted.
    ///
    /// # Errors
    /// * [`Error::ZeroCapacity`](crate::Error::ZeroCapacity) if `capacity` is 0
    pub fn new(capacity: usize, window: Duration) -> Result<Self> {
        Self::builder().capacity(capacity).window(window).build()
    }

    /// Start configuring a cache
    pub fn builder() -> CounterCacheBuilder<K> {
        CounterCacheBuilder::new()
    }

    pub(crate) fn from_parts(
        capacity: usize,
        window: Duration,
        on_evict: Option<EvictionCallback<K>>,
    ) -> Self {
        Self {
            index: RwLock::new(LruIndex::new(capacity)),
            window: (!window.is_zero()).then_some(window),
            on_evict,
            stats: CacheStats::new(),
        }
    }

    /// Record one occurrence of `key` and report whether it is within
    /// `max_value` occurrences for the current window.
    ///
    /// The occurrence is always recorded, even when it is reported as
    /// blocked. A key seen for the first time is always allowed.
    pub fn incr(&self, key: K, max_value: u64) -> Decision {
        self.incr_at(key, max_value, Instant::now())
    }

    /// Same as [`incr`](Self::incr), measuring the window against `now`
    pub fn incr_at(&self, key: K, max_value: u64, now: Instant) -> Decision {
        let (decision, evicted) = {
            let mut index = self.index.write();

            if let Some(entry) = index.get_mut(&key) {
                let transition = entry.record(max_value, self.window, now);
                if transition == Transition::Reset {
                    self.stats.record_reset();
                    trace!(count = entry.count, "window expired, counter reset");
                }
                (entry.decision(transition), None)
            } else {
                // Only a genuinely new key needs a free slot.
                let evicted = if index.is_full() {
                    index.evict_oldest()
                } else {
                    None
                };
                index.insert(key, Entry::new(now));
                self.stats.record_insert();
                (Decision { count: 1, allowed: true }, evicted)
            }
        };

        self.stats.record_decision(decision.allowed);
        if let Some((key, entry)) = evicted {
            self.stats.record_eviction();
            trace!(count = entry.count, "evicted least recently used key");
            self.notify(key, entry.count);
        }

        decision
    }

    /// Current count for `key`, promoting it to most recently used
    pub fn get(&self, key: &K) -> Option<u64> {
        let count = self.index.write().get(key).map(|entry| entry.count);
        match count {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        count
    }

    /// Current count for `key` without changing recency
    pub fn peek(&self, key: &K) -> Option<u64> {
        self.index.read().peek(key).map(|entry| entry.count)
    }

    /// Promote `key` to most recently used. Returns false if absent.
    pub fn touch(&self, key: &K) -> bool {
        self.index.write().touch(key)
    }

    /// Whether `key` is tracked, without changing recency
    pub fn contains(&self, key: &K) -> bool {
        self.index.read().contains(key)
    }

    /// Remove `key`, returning its last count. No-op if absent.
    pub fn remove(&self, key: &K) -> Option<u64> {
        let removed = self.index.write().remove(key);
        let (key, entry) = removed?;

        self.stats.record_removals(1);
        trace!(count = entry.count, "removed key");
        self.notify(key, entry.count);
        Some(entry.count)
    }

    /// Remove every key, running the eviction callback for each
    pub fn clear(&self) {
        let drained = self.index.write().drain();
        self.stats.record_removals(drained.len() as u64);
        for (key, entry) in drained {
            self.notify(key, entry.count);
        }
    }

    /// Tracked keys, most recently used first
    pub fn keys(&self) -> Vec<K> {
        self.index.read().iter().map(|(key, _)| key.clone()).collect()
    }

    /// Get the number of tracked keys
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Check if no keys are tracked
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Maximum number of tracked keys
    pub fn capacity(&self) -> usize {
        self.index.read().capacity()
    }

    /// Window length; zero when counters never reset
    pub fn window(&self) -> Duration {
        self.window.unwrap_or(Duration::ZERO)
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn notify(&self, key: K, count: u64) {
        if let Some(callback) = &self.on_evict {
            callback(key, count);
        }
    }
}

impl<K> fmt::Debug for CounterCache<K>
where
    K: Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = self.index.read();
        f.debug_struct("CounterCache")
            .field("len", &index.len())
            .field("capacity", &index.capacity())
            .field("window", &self.window)
            .field("on_evict", &self.on_evict.is_some())
            .finish()
    }
}
