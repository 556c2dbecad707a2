use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::api::LinkApi;
use crate::config::HistorySettings;
use crate::error::SubmitError;
use crate::history::{HistoryObserver, HistoryStore};
use crate::models::LinkRecord;
use crate::persistence::HistoryPersistence;
use crate::scheduler::RefreshScheduler;
use crate::shorten::ShortenWorkflow;
use crate::storage::Storage;

/// The shortener client: history, persistence, polling and submission wired
/// together.
///
/// Construct it, subscribe any presentation observers, then call
/// [`LinkClient::start`] to load saved links and resume their polling.
pub struct LinkClient {
    store: Arc<HistoryStore>,
    scheduler: Arc<RefreshScheduler>,
    workflow: ShortenWorkflow,
}

impl LinkClient {
    pub fn new(api: Arc<dyn LinkApi>, storage: Arc<dyn Storage>, settings: &HistorySettings) -> Self {
        let persistence = HistoryPersistence::new(storage, settings.key.clone());
        let store = Arc::new(HistoryStore::new(persistence, settings.capacity));

        let scheduler = Arc::new(RefreshScheduler::new(
            api.clone(),
            Arc::downgrade(&store),
            settings.poll_interval,
        ));
        store.subscribe(scheduler.clone());

        let workflow = ShortenWorkflow::new(api, store.clone());

        Self {
            store,
            scheduler,
            workflow,
        }
    }

    /// Load the saved history and arm a poll for every loaded link.
    /// Returns the number of links loaded.
    pub async fn start(&self) -> usize {
        self.store.restore().await
    }

    pub fn subscribe(&self, observer: Arc<dyn HistoryObserver>) {
        self.store.subscribe(observer);
    }

    pub async fn submit(&self, raw: &str) -> Result<LinkRecord, SubmitError> {
        self.workflow.submit(raw).await
    }

    pub async fn history(&self) -> Vec<LinkRecord> {
        self.store.all().await
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Stop all background polling.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    /// Submit each line of `input` until it ends or `interrupt` resolves.
    ///
    /// `interrupt` is polled for the whole session, including while a
    /// submission is in flight; an interrupted submission is abandoned.
    /// Submission failures go to `on_error` and the session carries on.
    pub async fn run_lines<R, I>(
        &self,
        input: R,
        interrupt: I,
        mut on_error: impl FnMut(SubmitError),
    ) -> std::io::Result<SessionEnd>
    where
        R: AsyncBufRead + Unpin,
        I: Future,
    {
        let mut lines = input.lines();
        tokio::pin!(interrupt);

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = &mut interrupt => return Ok(SessionEnd::Interrupted),
            };
            let Some(line) = line else {
                return Ok(SessionEnd::InputClosed);
            };

            tokio::select! {
                result = self.submit(&line) => {
                    if let Err(e) = result {
                        on_error(e);
                    }
                }
                _ = &mut interrupt => {
                    tracing::info!("Interrupted while shortening {}", line.trim());
                    return Ok(SessionEnd::Interrupted);
                }
            }
        }
    }
}

/// Why [`LinkClient::run_lines`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    InputClosed,
    Interrupted,
}
