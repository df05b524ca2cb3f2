use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Time-bounded response cache keyed by query shape.
///
/// Entries are never swept; a stale entry is simply ignored on read and
/// overwritten by the next populate. Concurrent misses on the same key may
/// both hit upstream and both populate — last write wins, which is fine
/// because the populated value is equivalent either way.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value if it is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.get(key).and_then(|e| {
            if e.inserted_at.elapsed() < self.ttl {
                Some(e.value.clone())
            } else {
                None
            }
        })
    }

    pub fn insert(&self, key: String, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    fn insert_at(&self, key: String, value: V, inserted_at: Instant) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(key, Entry { value, inserted_at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.insert("latest_limit20_offset0".into(), 42u32);
        assert_eq!(cache.get("latest_limit20_offset0"), Some(42));
    }

    #[test]
    fn missing_key_is_none() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(300));
        assert_eq!(cache.get("popular_limit20_offset0"), None);
    }

    #[test]
    fn expired_entry_is_ignored() {
        let cache = TtlCache::new(Duration::from_secs(300));
        let old = Instant::now() - Duration::from_secs(301);
        cache.insert_at("latest_limit20_offset0".into(), 42u32, old);
        assert_eq!(cache.get("latest_limit20_offset0"), None);
    }

    #[test]
    fn repopulate_overwrites_stale_entry() {
        let cache = TtlCache::new(Duration::from_secs(300));
        let old = Instant::now() - Duration::from_secs(301);
        cache.insert_at("k".into(), 1u32, old);
        assert_eq!(cache.get("k"), None);
        cache.insert("k".into(), 2);
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn keys_are_independent() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.insert("latest_limit20_offset0".into(), 1u32);
        cache.insert("latest_limit20_offset20".into(), 2u32);
        assert_eq!(cache.get("latest_limit20_offset0"), Some(1));
        assert_eq!(cache.get("latest_limit20_offset20"), Some(2));
    }
}
