//! Digest storage.
//!
//! A validated [`DigestRecord`] is written through the [`DigestSink`] trait.
//! Two backends exist:
//!
//! - [`SqliteStore`]: one row per calendar day, JSON inside a BLOB:
//!
//!   ```sql
//!   CREATE TABLE IF NOT EXISTS digests (
//!       digest_date  TEXT PRIMARY KEY,
//!       data         BLOB NOT NULL,
//!       generated_at TEXT NOT NULL,
//!       model        TEXT NOT NULL,
//!       item_count   INTEGER NOT NULL,
//!       checksum     TEXT
//!   );
//!   ```
//!
//! - [`JsonFileStore`]: one `YYYY-MM-DD.json` file per day in a directory.
//!
//! Re-running on the same day replaces that day's digest in both backends.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{DigestError, Result};
use crate::types::DigestRecord;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS digests (
    digest_date  TEXT PRIMARY KEY,
    data         BLOB NOT NULL,
    generated_at TEXT NOT NULL,
    model        TEXT NOT NULL,
    item_count   INTEGER NOT NULL,
    checksum     TEXT
);";

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// Anything that can persist a finished digest.
pub trait DigestSink {
    /// Persist `record`, replacing any digest stored for the same date.
    ///
    /// Returns a human-readable location (file path or `db#date`).
    ///
    /// # Errors
    ///
    /// Returns a [`DigestError`] if the record cannot be written.
    fn publish(&self, record: &DigestRecord) -> Result<String>;

    /// Load the digest stored for `date`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`DigestError`] if the stored data cannot be read.
    fn load(&self, date: NaiveDate) -> Result<Option<DigestRecord>>;
}

/// Open the backend selected by `config.backend`.
///
/// # Errors
///
/// Returns [`DigestError::Config`] for an unknown backend, or the backend's
/// open error.
pub fn open_sink(config: &PersistenceConfig) -> Result<Box<dyn DigestSink>> {
    match config.backend.as_str() {
        "sqlite" => Ok(Box::new(SqliteStore::open(&config.path, config)?)),
        "json" => Ok(Box::new(JsonFileStore::open(&config.path)?)),
        other => Err(DigestError::Config(format!("unknown persistence backend {other:?}"))),
    }
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as a lowercase hex string.
fn crc32_hex(data: &[u8]) -> String {
    let crc = crc32_compute(data);
    format!("{crc:08x}")
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

/// Handle to an open SQLite database of digests.
///
/// ```no_run
/// # use newsdigest_core::persistence::{DigestSink, SqliteStore};
/// # use newsdigest_core::config::PersistenceConfig;
/// # fn demo(record: newsdigest_core::types::DigestRecord) -> newsdigest_core::error::Result<()> {
/// let store = SqliteStore::open("digests.db", &PersistenceConfig::default())?;
/// store.publish(&record)?;
/// let loaded = store.load(record.date)?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteStore {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) an SQLite database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Digest store opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Dates with a stored digest, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Database`] on SQLite failures.
    pub fn list_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT digest_date FROM digests ORDER BY digest_date DESC")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut dates = Vec::new();
        for row in rows {
            let raw = row?;
            match raw.parse::<NaiveDate>() {
                Ok(date) => dates.push(date),
                Err(_) => warn!(date = %raw, "Skipping row with invalid date"),
            }
        }
        Ok(dates)
    }

    /// Number of stored digests.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Database`] on SQLite failures.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM digests", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Run `PRAGMA integrity_check`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Database`] if the query itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Path to the database file, or `:memory:`.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl DigestSink for SqliteStore {
    fn publish(&self, record: &DigestRecord) -> Result<String> {
        let start = Instant::now();
        let json =
            serde_json::to_vec(record).map_err(|e| DigestError::Serialization(e.to_string()))?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        let date = record.date.to_string();

        self.conn.execute(
            "INSERT INTO digests (digest_date, data, generated_at, model, item_count, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(digest_date) DO UPDATE SET
                data = excluded.data,
                generated_at = excluded.generated_at,
                model = excluded.model,
                item_count = excluded.item_count,
                checksum = excluded.checksum",
            params![
                date,
                json,
                record.generated_at.to_rfc3339(),
                record.model,
                i64::try_from(record.digest.len()).unwrap_or(i64::MAX),
                checksum
            ],
        )?;

        debug!(
            date = %date,
            items = record.digest.len(),
            bytes = json.len(),
            elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
            "Saved digest"
        );

        Ok(format!("{}#{date}", self.db_path.display()))
    }

    fn load(&self, date: NaiveDate) -> Result<Option<DigestRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum FROM digests WHERE digest_date = ?1")?;

        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![date.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        date = %date,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, stored digest may be corrupt"
                    );
                }
            }
        }

        let record =
            serde_json::from_slice(&data).map_err(|e| DigestError::Serialization(e.to_string()))?;
        Ok(Some(record))
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Directory of pretty-printed `YYYY-MM-DD.json` files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Use `dir` as the output directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Io`] if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of the file holding the digest for `date`.
    #[must_use]
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{date}.json"))
    }
}

impl DigestSink for JsonFileStore {
    fn publish(&self, record: &DigestRecord) -> Result<String> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| DigestError::Serialization(e.to_string()))?;

        let dest = self.path_for(record.date);
        let tmp = dest.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &dest)?;

        debug!(path = %dest.display(), bytes = json.len(), "Wrote digest file");
        Ok(dest.display().to_string())
    }

    fn load(&self, date: NaiveDate) -> Result<Option<DigestRecord>> {
        let path = self.path_for(date);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(&path)?;
        let record =
            serde_json::from_slice(&data).map_err(|e| DigestError::Serialization(e.to_string()))?;
        Ok(Some(record))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
