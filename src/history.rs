//! Bounded, most-recent-first history of shortened links.
//!
//! The store is the single source of truth for what the presentation layer
//! shows. Every mutation is written through to the persistence slot and then
//! announced to the subscribed [`HistoryObserver`]s.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use crate::models::LinkRecord;
use crate::persistence::HistoryPersistence;

/// Number of links kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 5;

/// Receives change notifications from a [`HistoryStore`].
///
/// Callbacks run while the store's lock is held, so they must not block.
/// They are handed the data they need and never call back into the store.
pub trait HistoryObserver: Send + Sync {
    /// The list was replaced by persisted state.
    fn history_loaded(&self, _records: &[LinkRecord]) {}

    /// `record` was prepended; `records` is the full list after eviction.
    fn record_added(&self, _record: &LinkRecord, _records: &[LinkRecord]) {}

    /// Only `record`'s visit count changed.
    fn visits_updated(&self, _record: &LinkRecord) {}
}

pub struct HistoryStore {
    records: Mutex<VecDeque<LinkRecord>>,
    capacity: usize,
    persistence: HistoryPersistence,
    observers: RwLock<Vec<Arc<dyn HistoryObserver>>>,
}

impl HistoryStore {
    /// An empty store. A capacity of zero is treated as one.
    pub fn new(persistence: HistoryPersistence, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
            persistence,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register an observer for all future notifications.
    pub fn subscribe(&self, observer: Arc<dyn HistoryObserver>) {
        match self.observers.write() {
            Ok(mut observers) => observers.push(observer),
            Err(poisoned) => poisoned.into_inner().push(observer),
        }
    }

    /// Replace the in-memory list with the persisted one.
    ///
    /// Unreadable state is logged and treated as an empty history. Anything
    /// beyond the capacity is dropped from the old end. Returns the number of
    /// records now held.
    pub async fn restore(&self) -> usize {
        let outcome = self.persistence.load().await;
        if let Some(e) = &outcome.error {
            tracing::warn!(
                "Could not load saved history from '{}', starting empty: {}",
                self.persistence.key(),
                e
            );
        }

        let mut loaded = outcome.records;
        if loaded.len() > self.capacity {
            tracing::debug!(
                "Saved history has {} entries, keeping the newest {}",
                loaded.len(),
                self.capacity
            );
            loaded.truncate(self.capacity);
        }

        let mut records = self.records.lock().await;
        *records = loaded.into();
        let snapshot: Vec<LinkRecord> = records.iter().cloned().collect();
        tracing::info!("Loaded {} saved link(s)", snapshot.len());

        self.notify(|o| o.history_loaded(&snapshot));
        snapshot.len()
    }

    /// Prepend `record`, evicting the oldest entry if over capacity.
    pub async fn add(&self, record: LinkRecord) {
        let mut records = self.records.lock().await;
        records.push_front(record);
        if records.len() > self.capacity {
            if let Some(evicted) = records.pop_back() {
                tracing::debug!("Evicted oldest link '{}' from history", evicted.slug);
            }
        }

        let snapshot: Vec<LinkRecord> = records.iter().cloned().collect();
        self.save(&snapshot).await;

        if let Some(added) = snapshot.first() {
            tracing::info!("Added link '{}' -> {}", added.slug, added.original);
            self.notify(|o| o.record_added(added, &snapshot));
        }
    }

    /// Set the visit count of the first record whose slug matches.
    ///
    /// Returns `false`, without saving or notifying, when no record matches
    /// (e.g. it was evicted after its poll was scheduled).
    pub async fn update_visits(&self, slug: &str, visits: u64) -> bool {
        let mut records = self.records.lock().await;
        let Some(record) = records.iter_mut().find(|r| r.slug == slug) else {
            tracing::debug!("Visit update for '{}' ignored, not in history", slug);
            return false;
        };

        record.visits = visits;
        let updated = record.clone();

        let snapshot: Vec<LinkRecord> = records.iter().cloned().collect();
        self.save(&snapshot).await;

        self.notify(|o| o.visits_updated(&updated));
        true
    }

    /// Snapshot of the current list, most recent first.
    pub async fn all(&self) -> Vec<LinkRecord> {
        self.records.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    // ── Internal helpers ───────────────────────────────────────────────────

    async fn save(&self, records: &[LinkRecord]) {
        if let Err(e) = self.persistence.save(records).await {
            tracing::warn!("Failed to save history, keeping it in memory only: {}", e);
        }
    }

    fn notify(&self, f: impl Fn(&dyn HistoryObserver)) {
        let observers = match self.observers.read() {
            Ok(observers) => observers,
            Err(poisoned) => poisoned.into_inner(),
        };
        for observer in observers.iter() {
            f(observer.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::persistence::DEFAULT_HISTORY_KEY;
    use crate::storage::{MemoryStorage, Storage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Memory storage that counts writes and can be told to fail them.
    #[derive(Default)]
    struct CountingStorage {
        inner: MemoryStorage,
        writes: AtomicUsize,
        fail_writes: bool,
    }

    #[async_trait]
    impl Storage for CountingStorage {
        async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(std::io::Error::other("quota exceeded").into());
            }
            self.inner.set(key, value).await
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: StdMutex<Vec<String>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl HistoryObserver for RecordingObserver {
        fn history_loaded(&self, records: &[LinkRecord]) {
            self.events.lock().unwrap().push(format!("loaded:{}", records.len()));
        }

        fn record_added(&self, record: &LinkRecord, records: &[LinkRecord]) {
            self.events
                .lock()
                .unwrap()
                .push(format!("added:{}:{}", record.slug, records.len()));
        }

        fn visits_updated(&self, record: &LinkRecord) {
            self.events
                .lock()
                .unwrap()
                .push(format!("visits:{}:{}", record.slug, record.visits));
        }
    }

    fn record(slug: &str) -> LinkRecord {
        LinkRecord::new(
            format!("https://example.com/{slug}"),
            format!("https://sho.rt/{slug}"),
            slug,
        )
    }

    fn store_with(storage: Arc<CountingStorage>, capacity: usize) -> HistoryStore {
        HistoryStore::new(
            HistoryPersistence::new(storage, DEFAULT_HISTORY_KEY),
            capacity,
        )
    }

    fn slugs(records: &[LinkRecord]) -> Vec<&str> {
        records.iter().map(|r| r.slug.as_str()).collect()
    }

    #[tokio::test]
    async fn add_prepends_and_evicts_oldest() {
        let store = store_with(Arc::default(), DEFAULT_CAPACITY);
        for slug in ["a", "b", "c", "d", "e"] {
            store.add(record(slug)).await;
        }
        assert_eq!(slugs(&store.all().await), ["e", "d", "c", "b", "a"]);

        store.add(record("f")).await;
        assert_eq!(slugs(&store.all().await), ["f", "e", "d", "c", "b"]);
    }

    #[tokio::test]
    async fn eviction_ignores_visit_counts() {
        let store = store_with(Arc::default(), 2);
        store.add(record("old")).await;
        store.add(record("new")).await;
        assert!(store.update_visits("old", 1_000).await);

        store.add(record("newest")).await;
        assert_eq!(slugs(&store.all().await), ["newest", "new"]);
    }

    #[tokio::test]
    async fn duplicates_are_kept() {
        let store = store_with(Arc::default(), DEFAULT_CAPACITY);
        store.add(record("same")).await;
        store.add(record("same")).await;
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn update_visits_touches_only_that_record() {
        let store = store_with(Arc::default(), DEFAULT_CAPACITY);
        store.add(record("a")).await;
        store.add(record("b")).await;
        store.add(record("c")).await;
        let before = store.all().await;

        assert!(store.update_visits("b", 7).await);
        let after = store.all().await;

        assert_eq!(after[1].visits, 7);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[2]);
        assert_eq!(
            LinkRecord {
                visits: 0,
                ..after[1].clone()
            },
            before[1]
        );
    }

    #[tokio::test]
    async fn update_visits_hits_first_match_only() {
        let store = store_with(Arc::default(), DEFAULT_CAPACITY);
        store.add(record("dup")).await;
        store.add(record("dup")).await;

        store.update_visits("dup", 3).await;
        let all = store.all().await;
        assert_eq!(all[0].visits, 3);
        assert_eq!(all[1].visits, 0);
    }

    #[tokio::test]
    async fn update_visits_for_absent_slug_is_a_noop() {
        let storage = Arc::new(CountingStorage::default());
        let store = store_with(storage.clone(), DEFAULT_CAPACITY);
        let observer = Arc::new(RecordingObserver::default());
        store.subscribe(observer.clone());
        store.add(record("a")).await;
        let before = store.all().await;
        let writes = storage.writes.load(Ordering::SeqCst);

        assert!(!store.update_visits("missing", 5).await);

        assert_eq!(store.all().await, before);
        assert_eq!(storage.writes.load(Ordering::SeqCst), writes);
        assert_eq!(observer.events(), ["added:a:1"]);
    }

    #[tokio::test]
    async fn each_mutation_saves_once_and_notifies() {
        let storage = Arc::new(CountingStorage::default());
        let store = store_with(storage.clone(), DEFAULT_CAPACITY);
        let observer = Arc::new(RecordingObserver::default());
        store.subscribe(observer.clone());

        store.add(record("abcd")).await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);

        store.update_visits("abcd", 7).await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 2);

        assert_eq!(observer.events(), ["added:abcd:1", "visits:abcd:7"]);
    }

    #[tokio::test]
    async fn save_failures_keep_memory_state() {
        let storage = Arc::new(CountingStorage {
            fail_writes: true,
            ..Default::default()
        });
        let store = store_with(storage.clone(), DEFAULT_CAPACITY);

        store.add(record("a")).await;
        assert!(store.update_visits("a", 2).await);

        let all = store.all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].visits, 2);
        assert_eq!(storage.writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn restore_loads_truncates_and_notifies() {
        let storage = Arc::new(CountingStorage::default());
        let saved: Vec<LinkRecord> = ["e", "d", "c", "b", "a"].into_iter().map(record).collect();
        storage
            .inner
            .set(DEFAULT_HISTORY_KEY, &serde_json::to_string(&saved).unwrap())
            .await
            .unwrap();

        let store = store_with(storage.clone(), 3);
        let observer = Arc::new(RecordingObserver::default());
        store.subscribe(observer.clone());

        assert_eq!(store.restore().await, 3);
        assert_eq!(slugs(&store.all().await), ["e", "d", "c"]);
        assert_eq!(observer.events(), ["loaded:3"]);
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restore_from_corrupt_slot_starts_empty() {
        let storage = Arc::new(CountingStorage::default());
        storage.inner.set(DEFAULT_HISTORY_KEY, "]]").await.unwrap();
        let store = store_with(storage, DEFAULT_CAPACITY);

        assert_eq!(store.restore().await, 0);
        assert!(store.is_empty().await);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let store = store_with(Arc::default(), 0);
        assert_eq!(store.capacity(), 1);
    }
}
