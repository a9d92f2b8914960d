//! SQLite-based reading storage.
//!
//! Timestamps are stored as epoch milliseconds so "latest" is a numeric
//! ordering. The connection is blocking; `ReadingStore` moves calls onto
//! tokio's blocking pool.

use chrono::{DateTime, Utc};
use meteo_core::{CityName, Reading, RepositoryError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite-based reading storage.
pub struct SqliteReadingStore {
    conn: Connection,
}

impl SqliteReadingStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    ///
    /// # Errors
    /// Returns `RepositoryError::Connection` if the file cannot be opened.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            RepositoryError::Connection(format!("{}: {}", path.as_ref().display(), e))
        })?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing and throwaway runs).
    ///
    /// # Errors
    /// Returns `RepositoryError::Connection` if SQLite cannot allocate the database.
    pub fn in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), RepositoryError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS reading (
                    name TEXT NOT NULL,
                    timestamp INTEGER NOT NULL,
                    temperature REAL NOT NULL,
                    estimated INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS reading_name_timestamp_idx ON reading(name, timestamp DESC);
                "#,
            )
            .map_err(RusqliteErrorExt::into_repository_error)
    }

    /// Append a reading.
    ///
    /// # Errors
    /// Returns a `RepositoryError` if the insert fails.
    pub fn insert(&self, reading: &Reading) -> Result<(), RepositoryError> {
        self.conn
            .execute(
                "INSERT INTO reading (name, timestamp, temperature, estimated) VALUES (?1, ?2, ?3, ?4)",
                params![
                    reading.name.as_str(),
                    reading.timestamp.timestamp_millis(),
                    reading.temperature,
                    reading.estimated,
                ],
            )
            .map_err(RusqliteErrorExt::into_repository_error)?;
        Ok(())
    }

    /// Latest reading for `city`; on equal timestamps the last inserted wins.
    ///
    /// # Errors
    /// `RepositoryError::NotFound` if the city has no rows.
    pub fn latest_by_city(&self, city: &CityName) -> Result<Reading, RepositoryError> {
        let row = self
            .conn
            .query_row(
                "SELECT name, timestamp, temperature, estimated
                 FROM reading
                 WHERE name = ?1
                 ORDER BY timestamp DESC, rowid DESC
                 LIMIT 1",
                params![city.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, bool>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(RusqliteErrorExt::into_repository_error)?;

        let (name, timestamp_ms, temperature, estimated) =
            row.ok_or_else(|| RepositoryError::not_found(city.as_str()))?;

        let name = CityName::parse(&name)
            .map_err(|e| RepositoryError::Corruption(format!("name '{}': {}", name, e)))?;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(timestamp_ms).ok_or_else(|| {
            RepositoryError::Corruption(format!("timestamp out of range: {}", timestamp_ms))
        })?;

        Ok(Reading {
            name,
            timestamp,
            temperature,
            estimated,
        })
    }
}

/// Extension trait for converting rusqlite errors to repository errors.
pub trait RusqliteErrorExt {
    fn into_repository_error(self) -> RepositoryError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_repository_error(self) -> RepositoryError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                RepositoryError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::CannotOpen =>
            {
                RepositoryError::Connection(self.to_string())
            }
            _ => RepositoryError::Query(self.to_string()),
        }
    }
}
