//! Background visit-count polling, one task per slug.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::api::LinkApi;
use crate::history::{HistoryObserver, HistoryStore};
use crate::models::LinkRecord;

/// How often each slug's stats are fetched unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Owns the per-slug polling tasks.
///
/// Tasks run until the scheduler is shut down or dropped, or the store they
/// feed is gone. A task whose record has been evicted keeps polling; its
/// updates are simply ignored by the store.
pub struct RefreshScheduler {
    api: Arc<dyn LinkApi>,
    store: Weak<HistoryStore>,
    interval: Duration,
    tasks: DashMap<String, JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(api: Arc<dyn LinkApi>, store: Weak<HistoryStore>, interval: Duration) -> Self {
        Self {
            api,
            store,
            interval,
            tasks: DashMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling `slug`, replacing any task already polling it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, slug: &str) {
        match self.tasks.entry(slug.to_owned()) {
            Entry::Occupied(mut entry) => {
                entry.get().abort();
                entry.insert(self.spawn(slug));
                tracing::debug!("Re-armed visit polling for '{}'", slug);
            }
            Entry::Vacant(entry) => {
                entry.insert(self.spawn(slug));
                tracing::debug!("Started visit polling for '{}'", slug);
            }
        }
    }

    /// Whether a live task is polling `slug`.
    pub fn is_polling(&self, slug: &str) -> bool {
        self.tasks
            .get(slug)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Number of live polling tasks.
    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|h| !h.is_finished()).count()
    }

    /// Abort every polling task.
    pub fn shutdown(&self) {
        let count = self.tasks.len();
        for handle in self.tasks.iter() {
            handle.abort();
        }
        self.tasks.clear();
        if count > 0 {
            tracing::info!("Stopped {} visit polling task(s)", count);
        }
    }

    fn spawn(&self, slug: &str) -> JoinHandle<()> {
        tokio::spawn(poll_visits(
            self.api.clone(),
            self.store.clone(),
            slug.to_owned(),
            self.interval,
        ))
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        for handle in self.tasks.iter() {
            handle.abort();
        }
    }
}

impl HistoryObserver for RefreshScheduler {
    fn history_loaded(&self, records: &[LinkRecord]) {
        for record in records {
            self.arm(&record.slug);
        }
    }

    fn record_added(&self, record: &LinkRecord, _records: &[LinkRecord]) {
        self.arm(&record.slug);
    }
}

/// Poll loop for one slug. The first lookup happens one full interval after
/// arming. Failures are logged and the next tick proceeds as normal.
async fn poll_visits(
    api: Arc<dyn LinkApi>,
    store: Weak<HistoryStore>,
    slug: String,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if store.strong_count() == 0 {
            tracing::debug!("History store gone, stopping visit polling for '{}'", slug);
            return;
        }

        match api.stats(&slug).await {
            Ok(visits) => {
                let Some(store) = store.upgrade() else {
                    return;
                };
                store.update_visits(&slug, visits).await;
            }
            Err(e) => {
                tracing::warn!("Error fetching stats for '{}': {}", slug, e);
            }
        }
    }
}
