// ==============================================
// COUNTER CACHE BEHAVIOUR TESTS (integration)
// ==============================================
//
// End-to-end checks of capacity, recency, threshold and window behaviour
// through the public API only.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lrucounter::{CounterCache, Decision, Error};

fn recording_cache<K>(capacity: usize, window: Duration) -> (CounterCache<K>, Arc<Mutex<Vec<(K, u64)>>>)
where
    K: std::hash::Hash + Eq + Clone + Send + 'static,
{
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let cache = CounterCache::builder()
        .capacity(capacity)
        .window(window)
        .on_evict(move |key, count| sink.lock().unwrap().push((key, count)))
        .build()
        .unwrap();
    (cache, log)
}

// ==============================================
// Capacity
// ==============================================

#[test]
fn len_never_exceeds_capacity() {
    let cache = CounterCache::new(16, Duration::ZERO).unwrap();

    for key in 0..1_000u32 {
        cache.incr(key, 3);
        assert!(cache.len() <= 16);
    }
    assert_eq!(cache.len(), 16);
    assert_eq!(cache.stats().evictions(), 1_000 - 16);
}

#[test]
fn least_recently_used_key_is_evicted() {
    let (cache, log) = recording_cache(2, Duration::ZERO);

    cache.incr("A", 10);
    cache.incr("B", 10);
    cache.incr("A", 10);
    cache.incr("C", 10);

    assert_eq!(*log.lock().unwrap(), vec![("B", 1)]);
    assert!(cache.contains(&"A"));
    assert!(cache.contains(&"C"));
    assert!(!cache.contains(&"B"));
}

#[test]
fn get_promotes_but_peek_does_not() {
    let cache = CounterCache::new(2, Duration::ZERO).unwrap();

    cache.incr("A", 10);
    cache.incr("B", 10);
    cache.get(&"A");
    cache.incr("C", 10);
    assert_eq!(cache.keys(), vec!["C", "A"]);

    cache.peek(&"A");
    cache.incr("D", 10);
    assert_eq!(cache.keys(), vec!["D", "C"]);
}

#[test]
fn incrementing_existing_key_on_full_cache_keeps_others() {
    let (cache, log) = recording_cache(3, Duration::ZERO);

    for key in ["a", "b", "c"] {
        cache.incr(key, 10);
    }
    for _ in 0..10 {
        cache.incr("b", 10);
    }

    assert_eq!(cache.len(), 3);
    assert!(log.lock().unwrap().is_empty());
}

// ==============================================
// Thresholds and windows
// ==============================================

#[test]
fn threshold_allows_then_blocks() {
    let cache = CounterCache::new(8, Duration::ZERO).unwrap();

    let decisions: Vec<Decision> = (0..4).map(|_| cache.incr("k", 3)).collect();

    assert_eq!(
        decisions,
        vec![
            Decision { count: 1, allowed: true },
            Decision { count: 2, allowed: true },
            Decision { count: 3, allowed: true },
            Decision { count: 4, allowed: false },
        ]
    );
}

#[test]
fn window_resets_after_sleep() {
    let cache = CounterCache::new(8, Duration::from_millis(100)).unwrap();

    assert_eq!(cache.incr("k", 1), Decision { count: 1, allowed: true });
    assert_eq!(cache.incr("k", 1), Decision { count: 2, allowed: false });

    thread::sleep(Duration::from_millis(150));

    assert_eq!(cache.incr("k", 1), Decision { count: 1, allowed: true });
}

#[test]
fn blocked_counter_keeps_growing_inside_window() {
    let cache = CounterCache::new(8, Duration::from_secs(60)).unwrap();
    let t0 = Instant::now();

    cache.incr_at("k", 2, t0);
    cache.incr_at("k", 2, t0);
    for expected in 3..10 {
        let decision = cache.incr_at("k", 2, t0 + Duration::from_secs(1));
        assert_eq!(decision, Decision { count: expected, allowed: false });
    }
}

#[test]
fn get_does_not_double_count() {
    let cache = CounterCache::new(8, Duration::ZERO).unwrap();

    let decision = cache.incr("k", 5);

    assert_eq!(cache.get(&"k"), Some(decision.count));
    assert_eq!(cache.get(&"k"), Some(decision.count));
    assert_eq!(cache.get(&"missing"), None);
}

// ==============================================
// Removal and eviction callback
// ==============================================

#[test]
fn remove_is_idempotent() {
    let (cache, log) = recording_cache(4, Duration::ZERO);

    assert_eq!(cache.remove(&"absent"), None);
    assert!(log.lock().unwrap().is_empty());

    cache.incr("k", 1);
    cache.remove(&"k");
    cache.remove(&"k");

    assert_eq!(*log.lock().unwrap(), vec![("k", 1)]);
    assert!(cache.is_empty());
}

#[test]
fn callback_fires_once_per_departure() {
    let (cache, log) = recording_cache(4, Duration::ZERO);

    for key in 0..20u32 {
        cache.incr(key, 1);
    }
    cache.remove(&19);
    cache.remove(&19);

    let mut departed: Vec<u32> = log.lock().unwrap().iter().map(|(k, _)| *k).collect();
    departed.sort_unstable();

    let mut expected: Vec<u32> = (0..16).collect();
    expected.push(19);
    assert_eq!(departed, expected);
}

#[test]
fn callback_can_reenter_cache() {
    let cache: Arc<Mutex<Option<Arc<CounterCache<u32>>>>> = Arc::new(Mutex::new(None));
    let handle = Arc::clone(&cache);

    let counters = Arc::new(
        CounterCache::builder()
            .capacity(1)
            .on_evict(move |key: u32, _count| {
                if let Some(cache) = handle.lock().unwrap().as_ref() {
                    // Reads and writes from inside the callback must not deadlock.
                    let _ = cache.len();
                    let _ = cache.peek(&key);
                    cache.remove(&key);
                }
            })
            .build()
            .unwrap(),
    );
    *cache.lock().unwrap() = Some(Arc::clone(&counters));

    counters.incr(1, 1);
    counters.incr(2, 1);
    counters.incr(3, 1);

    assert_eq!(counters.keys(), vec![3]);
    assert_eq!(counters.stats().evictions(), 2);

    // Break the Arc cycle.
    cache.lock().unwrap().take();
}

#[test]
fn callback_can_run_after_key_is_tracked_again() {
    use std::sync::mpsc;

    let (started_tx, started_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let go_rx = Mutex::new(go_rx);
    let cache: Arc<Mutex<Option<Arc<CounterCache<u32>>>>> = Arc::new(Mutex::new(None));
    let handle = Arc::clone(&cache);
    let seen_tracked = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&seen_tracked);

    let counters = Arc::new(
        CounterCache::builder()
            .capacity(1)
            .on_evict(move |key: u32, _count| {
                if key != 1 || seen.lock().unwrap().is_some() {
                    return;
                }
                started_tx.send(()).unwrap();
                go_rx.lock().unwrap().recv().unwrap();
                let tracked = handle.lock().unwrap().as_ref().map(|c| c.contains(&1));
                *seen.lock().unwrap() = tracked;
            })
            .build()
            .unwrap(),
    );
    *cache.lock().unwrap() = Some(Arc::clone(&counters));

    counters.incr(1, 1);
    let evicting = {
        let counters = Arc::clone(&counters);
        thread::spawn(move || {
            counters.incr(2, 1);
        })
    };

    // Key 1 has left the cache and its callback is parked; bring it back.
    started_rx.recv().unwrap();
    assert!(!counters.contains(&1));
    counters.incr(1, 1);
    go_tx.send(()).unwrap();
    evicting.join().unwrap();

    assert_eq!(*seen_tracked.lock().unwrap(), Some(true));
    cache.lock().unwrap().take();
}

// ==============================================
// Construction
// ==============================================

#[test]
fn zero_capacity_is_an_error() {
    let result = CounterCache::<u32>::new(0, Duration::from_secs(1));
    assert!(matches!(result, Err(Error::ZeroCapacity)));
}

#[test]
fn single_slot_without_window_blocks_permanently() {
    let cache = CounterCache::new(1, Duration::ZERO).unwrap();
    let t0 = Instant::now();

    assert!(cache.incr_at("k", 1, t0).allowed);
    for hours in 1..5 {
        let later = t0 + Duration::from_secs(hours * 3600);
        assert!(cache.incr_at("k", 1, later).is_blocked());
    }
    assert_eq!(cache.len(), 1);

    // A different key takes the only slot and starts fresh.
    assert!(cache.incr("other", 1).allowed);
    assert_eq!(cache.keys(), vec!["other"]);
}
