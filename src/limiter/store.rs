//! Rate-limit table storage.
//!
//! [`RateLimitStore`] is the seam between the limiter and wherever the
//! per-client counters live. [`InMemoryStore`] keeps them in a sharded
//! `DashMap` local to this process; a shared key-value backend for
//! multi-instance deployments would implement the same trait.
//!
//! # Atomicity
//!
//! [`RateLimitStore::check_and_record`] must run lookup, compare and
//! insert-or-increment as one step per key. Two concurrent requests from the
//! same client must never both see the last free slot. `InMemoryStore`
//! gets this from the shard write lock held by the `DashMap` entry guard.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{Admission, RateLimitEntry};

/// Storage backend for per-client rate-limit entries.
pub trait RateLimitStore: Send + Sync + 'static {
    /// Snapshot of the entry for `key`, if any.
    fn get(&self, key: &str) -> Option<RateLimitEntry>;

    /// Insert or replace the entry for `key`.
    fn upsert(&self, key: &str, entry: RateLimitEntry);

    /// Remove every entry whose window started more than `window` before
    /// `now`. Returns the number of entries removed.
    fn sweep_expired(&self, now: Instant, window: Duration) -> usize;

    /// Number of tracked clients.
    fn len(&self) -> usize;

    /// Whether no client is tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically decide whether the request for `key` at `now` is admitted
    /// and record it if so.
    ///
    /// An entry that has already expired is treated as absent, so a stale
    /// entry never takes part in a decision even if no sweep removed it.
    fn check_and_record(&self, key: &str, now: Instant, window: Duration, limit: u32)
    -> Admission;
}

/// Process-local store backed by a `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|entry| *entry)
    }

    fn upsert(&self, key: &str, entry: RateLimitEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn sweep_expired(&self, now: Instant, window: Duration) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now, window);
            removed += usize::from(!keep);
            keep
        });
        removed
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn check_and_record(
        &self,
        key: &str,
        now: Instant,
        window: Duration,
        limit: u32,
    ) -> Admission {
        match self.entries.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RateLimitEntry::new(now));
                Admission::Allowed { count: 1 }
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if entry.is_expired(now, window) {
                    *entry = RateLimitEntry::new(now);
                    Admission::Allowed { count: 1 }
                } else if entry.count < limit {
                    entry.count += 1;
                    entry.window_start = now;
                    Admission::Allowed { count: entry.count }
                } else {
                    Admission::Limited {
                        retry_after: entry.remaining(now, window),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_first_request_creates_entry() {
        let store = InMemoryStore::new();
        let now = Instant::now();

        assert_eq!(
            store.check_and_record("203.0.113.5", now, WINDOW, 10),
            Admission::Allowed { count: 1 }
        );

        let entry = store.get("203.0.113.5").unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.window_start, now);
    }

    #[test]
    fn test_count_increments_and_refreshes_window_start() {
        let store = InMemoryStore::new();
        let start = Instant::now();
        store.check_and_record("a", start, WINDOW, 10);

        let later = start + Duration::from_secs(5);
        assert_eq!(
            store.check_and_record("a", later, WINDOW, 10),
            Admission::Allowed { count: 2 }
        );
        assert_eq!(store.get("a").unwrap().window_start, later);
    }

    #[test]
    fn test_limited_entry_is_not_incremented() {
        let store = InMemoryStore::new();
        let now = Instant::now();
        for _ in 0..3 {
            store.check_and_record("a", now, WINDOW, 3);
        }

        let decision = store.check_and_record("a", now, WINDOW, 3);
        assert!(matches!(decision, Admission::Limited { .. }));
        assert_eq!(store.get("a").unwrap().count, 3);
    }

    #[test]
    fn test_expired_entry_is_treated_as_absent() {
        let store = InMemoryStore::new();
        let start = Instant::now();
        store.upsert(
            "a",
            RateLimitEntry {
                count: 10,
                window_start: start,
            },
        );

        let after = start + WINDOW + Duration::from_millis(1);
        assert_eq!(
            store.check_and_record("a", after, WINDOW, 10),
            Admission::Allowed { count: 1 }
        );
    }

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        let store = InMemoryStore::new();
        let start = Instant::now();
        store.upsert("old", RateLimitEntry::new(start));
        store.upsert("fresh", RateLimitEntry::new(start + Duration::from_secs(30)));

        let now = start + WINDOW + Duration::from_millis(1);
        assert_eq!(store.sweep_expired(now, WINDOW), 1);
        assert!(store.get("old").is_none());
        assert!(store.get("fresh").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sweep_keeps_entry_exactly_at_window_edge() {
        let store = InMemoryStore::new();
        let start = Instant::now();
        store.upsert("edge", RateLimitEntry::new(start));

        assert_eq!(store.sweep_expired(start + WINDOW, WINDOW), 0);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_concurrent_requests_never_exceed_limit() {
        let store = Arc::new(InMemoryStore::new());
        let admitted = Arc::new(AtomicU32::new(0));
        let now = Instant::now();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let admitted = admitted.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if let Admission::Allowed { .. } =
                            store.check_and_record("shared", now, WINDOW, 10)
                        {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 10);
        assert_eq!(store.get("shared").unwrap().count, 10);
    }
}
