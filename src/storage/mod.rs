pub mod repository;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};

/// Number of reader connections opened by [`Database::open_at`].
pub const DEFAULT_READERS: usize = 4;

/// Database wraps one writer and a set of reader `tokio_rusqlite::Connection`
/// instances using WAL mode. The writer serializes writes via
/// `tokio_rusqlite`'s internal channel; readers are handed out round-robin so
/// independent queries can run on separate connection threads.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    readers: Arc<Vec<tokio_rusqlite::Connection>>,
    next_reader: Arc<AtomicUsize>,
}

impl Database {
    /// Default database location, `~/.teamdesk/teamdesk.db`. Creates the
    /// directory if needed.
    pub fn default_path() -> Result<std::path::PathBuf> {
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".teamdesk");
        std::fs::create_dir_all(&dir).map_err(|e| Error::Config(e.to_string()))?;
        Ok(dir.join("teamdesk.db"))
    }

    /// Open the database at the default path.
    pub async fn open() -> Result<Self> {
        Self::open_at(Self::default_path()?).await
    }

    /// Open the database at the given path.
    pub async fn open_at(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::open_with_readers(path, DEFAULT_READERS).await
    }

    /// Open the database at the given path with `reader_count` reader connections.
    pub async fn open_with_readers(
        path: impl AsRef<std::path::Path>,
        reader_count: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let writer = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_writer(&writer).await?;

        let mut readers = Vec::with_capacity(reader_count.max(1));
        for _ in 0..reader_count.max(1) {
            let reader = tokio_rusqlite::Connection::open(&path).await?;
            Self::init_reader(&reader).await?;
            readers.push(reader);
        }
        log::debug!(
            "Opened database at {} with {} reader(s)",
            path.display(),
            readers.len()
        );

        Ok(Self {
            writer,
            readers: Arc::new(readers),
            next_reader: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> Result<Self> {
        let writer = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init_writer(&writer).await?;

        // In-memory DBs are per-connection, so the writer doubles as the reader.
        Ok(Self {
            readers: Arc::new(vec![writer.clone()]),
            writer,
            next_reader: Arc::new(AtomicUsize::new(0)),
        })
    }

    async fn init_writer(conn: &tokio_rusqlite::Connection) -> Result<()> {
        let migrated = conn
            .call(|conn| {
                conn.execute_batch(
                    "PRAGMA journal_mode=WAL;\
                     PRAGMA foreign_keys=ON;\
                     PRAGMA busy_timeout=5000;",
                )?;
                let migrations =
                    Migrations::new(vec![M::up(include_str!("migrations/001_initial.sql"))]);
                Ok::<_, rusqlite::Error>(migrations.to_latest(conn).map_err(Error::from))
            })
            .await?;
        migrated?;
        Ok(())
    }

    async fn init_reader(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;\
                 PRAGMA query_only=ON;",
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;
        Ok(())
    }

    /// Get a reference to the writer connection.
    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    /// Get a reader connection. Successive calls rotate through the pool.
    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        let idx = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        &self.readers[idx]
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }
}
