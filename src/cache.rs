use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Clock seam so cache expiry is testable without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Keyed cache with a fixed time-to-live and explicit invalidation.
pub struct TtlCache<K, V> {
    entries: Arc<Mutex<HashMap<K, Entry<V>>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| now.duration_since(entry.stored_at) < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: K, value: V) {
        let stored_at = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, Entry { value, stored_at });
    }

    pub fn invalidate(&self, key: &K) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    #[test]
    fn returns_cached_value_before_expiry() {
        let clock = ManualClock::new();
        let cache: TtlCache<&str, i32> = TtlCache::with_clock(Duration::from_secs(60), clock.clone());

        cache.set("week", 42);
        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get(&"week"), Some(42));
    }

    #[test]
    fn expires_after_ttl() {
        let clock = ManualClock::new();
        let cache: TtlCache<&str, i32> = TtlCache::with_clock(Duration::from_secs(60), clock.clone());

        cache.set("week", 42);
        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get(&"week"), None);
    }

    #[test]
    fn clear_drops_all_entries() {
        let clock = ManualClock::new();
        let cache: TtlCache<&str, i32> = TtlCache::with_clock(Duration::from_secs(60), clock);

        cache.set("week", 1);
        cache.set("month", 2);
        cache.clear();
        assert_eq!(cache.get(&"week"), None);
        assert_eq!(cache.get(&"month"), None);
    }

    #[test]
    fn invalidate_is_per_key() {
        let clock = ManualClock::new();
        let cache: TtlCache<&str, i32> = TtlCache::with_clock(Duration::from_secs(60), clock);

        cache.set("week", 1);
        cache.set("month", 2);
        cache.invalidate(&"week");
        assert_eq!(cache.get(&"week"), None);
        assert_eq!(cache.get(&"month"), Some(2));
    }
}
