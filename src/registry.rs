use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::entry::CacheEntry;
use crate::key::CacheKey;
use crate::subscription::Subscription;

/// Proof that the holder won the right to refresh one entry.
///
/// Handed out by [`CacheRegistry::try_begin_refresh`] and consumed by
/// [`CacheRegistry::complete_refresh`] or [`CacheRegistry::finish_refresh`].
/// The ticket is bound to the entry it was issued for: once that entry is
/// cleared, the ticket no longer applies even if the key is recreated.
#[derive(Debug)]
pub struct RefreshTicket {
    key: CacheKey,
    entry_id: u64,
}

impl RefreshTicket {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

/// Thread-safe map from cache key to cache entry.
///
/// The registry knows nothing about how data is produced: it stores values,
/// tracks whether a background refresh is in flight and hands out
/// subscriptions. Every operation is synchronous and finishes inside a single
/// shard lock, so no lock is ever held across an `.await`.
///
/// Create one per application (or per test) and share it as
/// `Arc<CacheRegistry<T>>`.
#[derive(Debug)]
pub struct CacheRegistry<T> {
    entries: DashMap<CacheKey, CacheEntry<T>>,
    next_id: AtomicU64,
}

impl<T> CacheRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        CacheRegistry {
            entries: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    fn new_entry(&self, data: Option<T>, is_fetching: bool) -> CacheEntry<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        CacheEntry::new(id, data, is_fetching)
    }

    /// Insert or replace the value for `key`.
    ///
    /// An existing entry keeps its broadcast slot, and its subscribers are
    /// notified with `data` before this returns. A missing entry is created
    /// with a new slot initialised to `data`.
    pub fn store(&self, key: impl Into<CacheKey>, data: T, is_fetching: bool) {
        match self.entries.entry(key.into()) {
            Entry::Occupied(mut occupied) => occupied.get_mut().replace(Some(data), is_fetching),
            Entry::Vacant(vacant) => {
                vacant.insert(self.new_entry(Some(data), is_fetching));
            }
        }
    }

    /// Like [`store`](Self::store), but leaves the fetching flag as it is.
    ///
    /// Used for foreground results so that a refresh already in flight keeps
    /// its claim on the key.
    pub fn publish(&self, key: impl Into<CacheKey>, data: T) {
        match self.entries.entry(key.into()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let is_fetching = entry.is_fetching();
                entry.replace(Some(data), is_fetching);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(self.new_entry(Some(data), false));
            }
        }
    }

    /// Return the stored value, if any. Never triggers a fetch.
    pub fn get(&self, key: &str) -> Option<T> {
        self.entries.get(key).and_then(|entry| entry.data())
    }

    /// Whether a background refresh is in flight. False for unknown keys.
    pub fn is_fetching(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.is_fetching())
            .unwrap_or(false)
    }

    /// Open a subscription on `key`, creating an empty entry if needed.
    ///
    /// All subscriptions for the same key share one broadcast slot.
    pub fn subscribe(&self, key: impl Into<CacheKey>) -> Subscription<T> {
        let key = key.into();
        let receiver = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| self.new_entry(None, false))
            .receiver();
        Subscription::new(key, receiver)
    }

    /// Remove the entry for `key`. Live subscriptions observe the key as cleared.
    pub fn clear(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            tracing::debug!("Cleared cache entry: key={}", key);
        }
    }

    /// Remove every entry.
    pub fn clear_all(&self) {
        let count = self.entries.len();
        self.entries.clear();
        tracing::debug!("Cleared all cache entries: count={}", count);
    }

    /// Claim the right to run a background refresh for `key`.
    ///
    /// The check of the fetching flag and the write that sets it happen under
    /// the same shard lock, so of any number of concurrent callers exactly one
    /// gets a ticket until the refresh settles. Existing data is kept and
    /// subscribers are not notified; an absent key gets an empty entry.
    pub fn try_begin_refresh(&self, key: impl Into<CacheKey>) -> Option<RefreshTicket> {
        let key = key.into();
        let entry_id = match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_fetching() {
                    return None;
                }
                entry.set_fetching(true);
                entry.id()
            }
            Entry::Vacant(vacant) => vacant.insert(self.new_entry(None, true)).id(),
        };
        Some(RefreshTicket { key, entry_id })
    }

    /// Store the refreshed value and clear the fetching flag.
    ///
    /// Returns false, storing nothing, when the entry the ticket was issued
    /// for has been cleared in the meantime.
    pub fn complete_refresh(&self, ticket: &RefreshTicket, data: T) -> bool {
        match self.entries.get_mut(ticket.key.as_str()) {
            Some(mut entry) if entry.id() == ticket.entry_id => {
                entry.replace(Some(data), false);
                true
            }
            _ => false,
        }
    }

    /// Clear the fetching flag without touching the stored value.
    ///
    /// An entry that never held data and has no subscribers only existed for
    /// this refresh, so it is removed instead. No-op when the entry the ticket
    /// was issued for is gone.
    pub fn finish_refresh(&self, ticket: &RefreshTicket) {
        if let Entry::Occupied(mut occupied) = self.entries.entry(ticket.key.clone())
            && occupied.get().id() == ticket.entry_id
        {
            let entry = occupied.get_mut();
            if !entry.has_data() && entry.subscriber_count() == 0 {
                occupied.remove();
                tracing::debug!("Dropped empty entry after failed refresh: key={}", ticket.key);
            } else {
                entry.set_fetching(false);
            }
        }
    }

    /// Whether an entry exists for `key` (with or without data).
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries, including ones created by subscriptions only.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the keys currently present.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of live subscriptions on `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.entries
            .get(key)
            .map(|entry| entry.subscriber_count())
            .unwrap_or(0)
    }
}

impl<T> Default for CacheRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::sync::Arc;

    #[test]
    fn test_get_store_clear() {
        let registry = CacheRegistry::new();

        // Initially empty
        assert_eq!(registry.get("GET /users"), None);
        assert!(!registry.is_fetching("GET /users"));

        registry.store("GET /users", vec!["alice".to_string()], false);
        assert_eq!(registry.get("GET /users"), Some(vec!["alice".to_string()]));

        registry.clear("GET /users");
        assert_eq!(registry.get("GET /users"), None);
        assert!(!registry.contains("GET /users"));
    }

    #[test]
    fn test_store_sets_fetching_flag() {
        let registry = CacheRegistry::new();
        registry.store("k", 1, true);
        assert!(registry.is_fetching("k"));

        registry.store("k", 2, false);
        assert!(!registry.is_fetching("k"));
        assert_eq!(registry.get("k"), Some(2));
    }

    #[tokio::test]
    async fn test_store_notifies_existing_subscribers() {
        let registry = CacheRegistry::new();
        registry.store("k", 1, false);

        let mut first = registry.subscribe("k");
        let mut second = registry.subscribe("k");
        assert_eq!(first.current(), Some(1));

        registry.store("k", 2, false);

        assert_eq!(first.changed().await.unwrap(), Some(2));
        assert_eq!(second.changed().await.unwrap(), Some(2));
        assert_eq!(registry.subscriber_count("k"), 2);
    }

    #[test]
    fn test_subscribe_creates_empty_entry() {
        let registry: CacheRegistry<i32> = CacheRegistry::new();
        let mut sub = registry.subscribe("k");

        assert!(registry.contains("k"));
        assert_eq!(registry.get("k"), None);
        assert!(!registry.is_fetching("k"));
        assert_eq!(sub.current(), None);
    }

    #[tokio::test]
    async fn test_subscriber_before_first_store_sees_value() {
        let registry = CacheRegistry::new();
        let mut sub = registry.subscribe("k");

        registry.store("k", "v".to_string(), false);

        assert_eq!(sub.changed().await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_clear_closes_subscriptions() {
        let registry = CacheRegistry::new();
        registry.store("k", 1, false);
        let mut sub = registry.subscribe("k");

        registry.clear("k");

        assert_eq!(sub.changed().await, Err(CacheError::cleared("k")));

        // A new subscription follows the key again
        let mut fresh = registry.subscribe("k");
        registry.store("k", 5, false);
        assert_eq!(fresh.changed().await.unwrap(), Some(5));
    }

    #[test]
    fn test_clear_all() {
        let registry = CacheRegistry::new();
        registry.store("a", 1, false);
        registry.store("b", 2, true);
        assert_eq!(registry.len(), 2);

        registry.clear_all();

        assert!(registry.is_empty());
        assert_eq!(registry.get("a"), None);
        assert!(!registry.is_fetching("b"));
    }

    #[test]
    fn test_publish_keeps_fetching_flag() {
        let registry = CacheRegistry::new();
        registry.store("k", 1, true);
        registry.publish("k", 2);
        assert!(registry.is_fetching("k"));
        assert_eq!(registry.get("k"), Some(2));

        registry.publish("fresh", 3);
        assert!(!registry.is_fetching("fresh"));
    }

    #[test]
    fn test_try_begin_refresh_is_exclusive() {
        let registry = CacheRegistry::new();
        registry.store("k", 1, false);

        let ticket = registry.try_begin_refresh("k").unwrap();
        assert!(registry.try_begin_refresh("k").is_none());
        assert!(registry.is_fetching("k"));
        // Data survives the claim
        assert_eq!(registry.get("k"), Some(1));

        registry.finish_refresh(&ticket);
        assert!(!registry.is_fetching("k"));
        assert_eq!(registry.get("k"), Some(1));
        assert!(registry.try_begin_refresh("k").is_some());
    }

    #[tokio::test]
    async fn test_complete_refresh_stores_and_notifies() {
        let registry = CacheRegistry::new();
        registry.store("k", 1, false);
        let mut sub = registry.subscribe("k");

        let ticket = registry.try_begin_refresh("k").unwrap();
        assert_eq!(ticket.key().as_str(), "k");
        assert!(registry.complete_refresh(&ticket, 2));

        assert_eq!(sub.changed().await.unwrap(), Some(2));
        assert!(!registry.is_fetching("k"));
    }

    #[test]
    fn test_try_begin_refresh_on_absent_key() {
        let registry: CacheRegistry<i32> = CacheRegistry::new();
        assert!(registry.try_begin_refresh("k").is_some());
        assert!(registry.is_fetching("k"));
        assert_eq!(registry.get("k"), None);
    }

    #[test]
    fn test_stale_ticket_is_ignored_after_clear() {
        let registry: CacheRegistry<i32> = CacheRegistry::new();
        let stale = registry.try_begin_refresh("k").unwrap();
        registry.clear("k");

        // Finishing or completing a stale ticket does not resurrect the key
        registry.finish_refresh(&stale);
        assert!(!registry.contains("k"));
        assert!(!registry.complete_refresh(&stale, 9));
        assert!(!registry.contains("k"));

        // Nor does it disturb a refresh claimed on the recreated entry
        let current = registry.try_begin_refresh("k").unwrap();
        registry.finish_refresh(&stale);
        assert!(!registry.complete_refresh(&stale, 9));
        assert!(registry.is_fetching("k"));
        assert!(registry.complete_refresh(&current, 10));
        assert_eq!(registry.get("k"), Some(10));
    }

    #[test]
    fn test_concurrent_refresh_claims_yield_single_winner() {
        let registry: Arc<CacheRegistry<i32>> = Arc::new(CacheRegistry::new());
        registry.store("k", 0, false);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.try_begin_refresh("k").is_some())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_failed_refresh_on_absent_key_leaves_no_entry() {
        let registry: CacheRegistry<i32> = CacheRegistry::new();
        let ticket = registry.try_begin_refresh("k").unwrap();
        assert!(registry.contains("k"));

        registry.finish_refresh(&ticket);

        assert!(!registry.contains("k"));
        assert!(registry.is_empty());
        assert!(!registry.is_fetching("k"));
    }

    #[test]
    fn test_failed_refresh_keeps_entry_with_subscriber() {
        let registry: CacheRegistry<i32> = CacheRegistry::new();
        let sub = registry.subscribe("k");
        let ticket = registry.try_begin_refresh("k").unwrap();

        registry.finish_refresh(&ticket);

        assert!(registry.contains("k"));
        assert!(!registry.is_fetching("k"));
        assert!(!sub.is_closed());
    }

    #[test]
    fn test_failed_refresh_keeps_existing_data() {
        let registry = CacheRegistry::new();
        registry.store("k", 1, false);
        let ticket = registry.try_begin_refresh("k").unwrap();

        registry.finish_refresh(&ticket);

        assert_eq!(registry.get("k"), Some(1));
        assert!(!registry.is_fetching("k"));
    }

    #[test]
    fn test_concurrent_stores_end_on_one_write() {
        let registry: Arc<CacheRegistry<i32>> = Arc::new(CacheRegistry::new());
        let mut sub = registry.subscribe("k");

        let handles: Vec<_> = (0..64)
            .map(|n| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.store("k", n, false))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let last = registry.get("k");
        assert!(matches!(last, Some(n) if (0..64).contains(&n)));
        assert_eq!(sub.current(), last);
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_fetching("k"));
    }

    #[test]
    fn test_keys_snapshot() {
        let registry = CacheRegistry::new();
        registry.store(CacheKey::from_request("get", "/a"), 1, false);
        registry.store("explicit", 2, false);

        let mut keys: Vec<String> = registry.keys().into_iter().map(|k| k.into_string()).collect();
        keys.sort();
        assert_eq!(keys, vec!["GET /a".to_string(), "explicit".to_string()]);
    }
}
