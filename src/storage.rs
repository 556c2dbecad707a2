//! Durable key-value slots for client state.
//!
//! The history store never talks to a concrete backend; it goes through the
//! [`Storage`] trait so any of the backends below (or a test double) can hold
//! the serialized history.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::PersistenceError;

/// A named-slot store. Last `set` wins; there are no transactions.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Read a slot. An absent slot is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Overwrite a slot.
    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

// ── Backend selection ──────────────────────────────────────────────────────

/// Which storage backend to open, parsed from `STORAGE_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// `memory`: lost on exit.
    Memory,
    /// `file:<dir>`: one JSON file per slot inside `dir`.
    File(PathBuf),
    /// `sqlite:<path>`: the full string is handed to sqlx as a connection URL.
    Sqlite(String),
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "memory" {
            return Ok(StorageBackend::Memory);
        }
        if let Some(dir) = s.strip_prefix("file:") {
            if dir.is_empty() {
                return Err("file: storage needs a directory, e.g. file:./.linkly-client".into());
            }
            return Ok(StorageBackend::File(PathBuf::from(dir)));
        }
        if s.starts_with("sqlite:") {
            return Ok(StorageBackend::Sqlite(s.to_owned()));
        }
        Err(format!(
            "unsupported storage {s:?} (expected memory, file:<dir> or sqlite:<path>)"
        ))
    }
}

impl StorageBackend {
    /// Open the selected backend.
    pub async fn open(&self) -> Result<Arc<dyn Storage>, PersistenceError> {
        Ok(match self {
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
            StorageBackend::File(dir) => Arc::new(FileStorage::new(dir)),
            StorageBackend::Sqlite(url) => Arc::new(SqliteStorage::connect(url).await?),
        })
    }
}

// ── In-memory ──────────────────────────────────────────────────────────────

/// Thread-safe in-memory slots. Clones share the same map.
#[derive(Clone, Debug)]
pub struct MemoryStorage {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Number of slots currently held.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.inner.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.inner.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

// ── JSON files ─────────────────────────────────────────────────────────────

/// Slots stored as `<dir>/<key>.json`. The directory is created on first write.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
            return Err(PersistenceError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, value).await?;
        Ok(())
    }
}

// ── SQLite ─────────────────────────────────────────────────────────────────

/// Slots stored as rows of the `storage` table.
#[derive(Clone, Debug)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if missing) the database at `url` and apply migrations.
    ///
    /// In-memory URLs such as `sqlite::memory:` are opened with
    /// [`SqliteStorage::in_memory`].
    pub async fn connect(url: &str) -> Result<Self, PersistenceError> {
        if is_memory_url(url) {
            tracing::debug!("{} is an in-memory database; using a single pinned connection", url);
            return Self::in_memory().await;
        }

        let options = url
            .parse::<SqliteConnectOptions>()?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// A private in-memory database. Kept on a single pinned connection,
    /// since every new SQLite memory connection starts empty.
    pub async fn in_memory() -> Result<Self, PersistenceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, PersistenceError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("Storage migrations applied");
        Ok(Self { pool })
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM storage WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
