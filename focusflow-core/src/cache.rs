//! Short-lived in-memory cache for computed metrics.
//!
//! An expired entry is dropped the first time it is read after its
//! deadline, and every write sweeps whatever else has expired, so keys that
//! are never read again do not accumulate. [`Cache::purge_expired`] sweeps
//! on demand.
//! Keys carry the owning user id as a field so a user's entries can be
//! invalidated together after any write to their projects or tasks.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Identifies one cached metric for one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub user_id: String,
    pub metric: &'static str,
    /// Metric parameters, e.g. a window size
    pub params: String,
}

impl CacheKey {
    pub fn new(user_id: &str, metric: &'static str) -> Self {
        Self {
            user_id: user_id.to_string(),
            metric,
            params: String::new(),
        }
    }

    pub fn with_params(user_id: &str, metric: &'static str, params: impl ToString) -> Self {
        Self {
            user_id: user_id.to_string(),
            metric,
            params: params.to_string(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}:{}", self.metric, self.user_id)
        } else {
            write!(f, "{}:{}:{}", self.metric, self.user_id, self.params)
        }
    }
}

/// Cache storage interface.
pub trait Cache<V>: Send + Sync {
    /// Returns the value if present and unexpired.
    fn get(&self, key: &CacheKey) -> Option<V>;

    fn set(&self, key: CacheKey, value: V, ttl: Duration);

    fn remove(&self, key: &CacheKey);

    /// Drops every entry belonging to `user_id`, whatever the metric.
    fn invalidate_user(&self, user_id: &str);

    fn clear(&self);

    /// Removes all expired entries, returning how many were dropped.
    fn purge_expired(&self) -> usize;

    /// Number of stored entries, expired or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Mutex-guarded map with per-entry time-to-live.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<CacheKey, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone + Send> TtlCache<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

fn sweep<V>(entries: &mut HashMap<CacheKey, CacheEntry<V>>, now: DateTime<Utc>) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before - entries.len()
}

impl<V: Clone + Send> Cache<V> for TtlCache<V> {
    fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    fn set(&self, key: CacheKey, value: V, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(ttl).unwrap_or(now);
        let mut entries = self.entries.lock().unwrap();
        sweep(&mut entries, now);
        entries.insert(key, CacheEntry { value, expires_at });
    }

    fn remove(&self, key: &CacheKey) {
        self.entries.lock().unwrap().remove(key);
    }

    fn invalidate_user(&self, user_id: &str) {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| key.user_id != user_id);
        tracing::debug!(
            user_id,
            removed = before - entries.len(),
            "Invalidated cached metrics"
        );
    }

    fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        sweep(&mut self.entries.lock().unwrap(), now)
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_with_clock() -> (Arc<ManualClock>, TtlCache<i64>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = TtlCache::new(clock.clone() as Arc<dyn Clock>);
        (clock, cache)
    }

    #[test]
    fn test_get_returns_value_until_ttl_elapses() {
        let (clock, cache) = cache_with_clock();
        let key = CacheKey::new("user-1", "overview");
        cache.set(key.clone(), 42, Duration::seconds(30));

        assert_eq!(cache.get(&key), Some(42));

        clock.advance(Duration::seconds(30));
        assert_eq!(cache.get(&key), Some(42), "expiry is strictly after the deadline");

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get(&key), None);
        assert!(cache.is_empty(), "expired entry is dropped on read");
    }

    #[test]
    fn test_invalidate_user_only_touches_that_user() {
        let (_clock, cache) = cache_with_clock();
        cache.set(CacheKey::new("alice", "overview"), 1, Duration::seconds(30));
        cache.set(
            CacheKey::with_params("alice", "trend", 30),
            2,
            Duration::seconds(30),
        );
        cache.set(CacheKey::new("alice-2", "overview"), 3, Duration::seconds(30));
        cache.set(CacheKey::new("bob", "overview"), 4, Duration::seconds(30));

        cache.invalidate_user("alice");

        assert_eq!(cache.get(&CacheKey::new("alice", "overview")), None);
        assert_eq!(cache.get(&CacheKey::with_params("alice", "trend", 30)), None);
        assert_eq!(cache.get(&CacheKey::new("alice-2", "overview")), Some(3));
        assert_eq!(cache.get(&CacheKey::new("bob", "overview")), Some(4));
    }

    #[test]
    fn test_purge_expired() {
        let (clock, cache) = cache_with_clock();
        cache.set(CacheKey::new("u", "short"), 1, Duration::seconds(5));
        cache.set(CacheKey::new("u", "long"), 2, Duration::seconds(60));

        clock.advance(Duration::seconds(10));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&CacheKey::new("u", "long")), Some(2));
    }

    #[test]
    fn test_unread_expired_keys_are_reclaimed_through_the_trait() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache: Arc<dyn Cache<i64>> = Arc::new(TtlCache::new(clock.clone() as Arc<dyn Clock>));
        for days in 1..=5 {
            cache.set(
                CacheKey::with_params("u", "trend", days),
                days,
                Duration::seconds(5),
            );
        }
        assert_eq!(cache.len(), 5);

        clock.advance(Duration::seconds(10));
        assert_eq!(cache.purge_expired(), 5);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_write_sweeps_expired_entries() {
        let (clock, cache) = cache_with_clock();
        cache.set(CacheKey::new("u", "stale"), 1, Duration::seconds(5));
        clock.advance(Duration::seconds(10));

        cache.set(CacheKey::new("u", "fresh"), 2, Duration::seconds(5));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&CacheKey::new("u", "fresh")), Some(2));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(CacheKey::new("u1", "health").to_string(), "health:u1");
        assert_eq!(
            CacheKey::with_params("u1", "trend", 14).to_string(),
            "trend:u1:14"
        );
    }
}
