//! Builder for [`CounterCache`]

use std::hash::Hash;
use std::time::Duration;
use tracing::debug;

use crate::counter::{CounterCache, EvictionCallback};
use crate::error::{Error, Result};

/// Default number of tracked keys
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Fluent configuration for a [`CounterCache`]
///
/// ```
/// use std::time::Duration;
/// use lrucounter::CounterCache;
///
/// let cache = CounterCache::<String>::builder()
///     .capacity(1_000)
///     .window(Duration::from_secs(60))
///     .on_evict(|key, count| println!("{key} left after {count} hits"))
///     .build()
///     .unwrap();
///
/// assert_eq!(cache.capacity(), 1_000);
/// ```
pub struct CounterCacheBuilder<K> {
    capacity: usize,
    window: Duration,
    on_evict: Option<EvictionCallback<K>>,
}

impl<K> CounterCacheBuilder<K>
where
    K: Hash + Eq + Clone,
{
    /// Builder with [`DEFAULT_CAPACITY`] and no window
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            window: Duration::ZERO,
            on_evict: None,
        }
    }

    /// Maximum number of tracked keys
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// How long an over-limit key stays blocked; zero blocks until removal
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Run `callback` with the key and its last count whenever a key is
    /// evicted, removed or cleared
    ///
    /// The callback runs after the cache lock is released, so another thread
    /// may already have re-inserted the same key by the time it fires.
    pub fn on_evict<F>(mut self, callback: F) -> Self
    where
        F: Fn(K, u64) + Send + Sync + 'static,
    {
        self.on_evict = Some(Box::new(callback));
        self
    }

    /// Validate and build
    ///
    /// # Errors
    /// * [`Error::ZeroCapacity`] if capacity is 0
    pub fn build(self) -> Result<CounterCache<K>> {
        if self.capacity == 0 {
            return Err(Error::ZeroCapacity);
        }

        debug!(
            capacity = self.capacity,
            window_ms = self.window.as_millis() as u64,
            on_evict = self.on_evict.is_some(),
            "counter cache created"
        );
        Ok(CounterCache::from_parts(self.capacity, self.window, self.on_evict))
    }
}

impl<K> Default for CounterCacheBuilder<K>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
