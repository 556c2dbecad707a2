use std::sync::Arc;

use crate::error::PersistenceError;
use crate::models::LinkRecord;
use crate::storage::Storage;

/// Slot name the history is stored under unless configured otherwise.
pub const DEFAULT_HISTORY_KEY: &str = "shortenedUrls";

/// Result of reading the history slot.
///
/// Loading never fails outright: a missing slot is an empty history, and a
/// corrupt or unreadable slot is an empty history plus the error that caused
/// it.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub records: Vec<LinkRecord>,
    pub error: Option<PersistenceError>,
}

/// Reads and writes the history list as a JSON array in one storage slot.
#[derive(Clone)]
pub struct HistoryPersistence {
    storage: Arc<dyn Storage>,
    key: String,
}

impl HistoryPersistence {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn load(&self) -> LoadOutcome {
        let raw = match self.storage.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadOutcome::default(),
            Err(e) => {
                return LoadOutcome {
                    records: Vec::new(),
                    error: Some(e),
                }
            }
        };

        match serde_json::from_str::<Vec<LinkRecord>>(&raw) {
            Ok(records) => LoadOutcome {
                records,
                error: None,
            },
            Err(e) => LoadOutcome {
                records: Vec::new(),
                error: Some(e.into()),
            },
        }
    }

    /// Best-effort write of the whole list.
    pub async fn save(&self, records: &[LinkRecord]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(records)?;
        self.storage.set(&self.key, &json).await
    }
}
