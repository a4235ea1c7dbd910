//! # lrucounter
//!
//! Bounded in-memory counters for local rate limiting.
//!
//! Each key carries a counter and the start of its current window. Every
//! [`CounterCache::incr`] records an occurrence and reports whether the key
//! is still within its limit; once over the limit a key stays blocked until
//! its window has elapsed, then its counter restarts at 1.
//!
//! ## Architecture
//! - **HashMap**: AHash for key lookup (O(1))
//! - **LRU List**: slot arena with index links for promotion and eviction (O(1))
//! - **Locking**: one `parking_lot::RwLock` around the whole index
//!
//! ```
//! use std::time::Duration;
//! use lrucounter::CounterCache;
//!
//! let cache = CounterCache::new(1024, Duration::ZERO).unwrap();
//!
//! assert!(cache.incr("login:alice", 2).allowed);
//! assert!(cache.incr("login:alice", 2).allowed);
//! let third = cache.incr("login:alice", 2);
//! assert!(!third.allowed);
//! assert_eq!(third.count, 3);
//! ```

#![warn(missing_docs)]

mod builder;
mod counter;
mod error;
mod lru;
mod rate;
mod stats;

pub use builder::{CounterCacheBuilder, DEFAULT_CAPACITY};
pub use counter::{CounterCache, EvictionCallback};
pub use error::{Error, Result};
pub use rate::Decision;
pub use stats::{CacheStats, StatsSnapshot};
