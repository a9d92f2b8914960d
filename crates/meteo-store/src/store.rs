//! Backend-agnostic reading store.
//!
//! `ReadingStore` wraps either backend behind one `ReadingRepository`
//! implementation. SQLite calls hop onto the blocking pool and serialize on
//! a mutex; PostgreSQL calls are natively async.

use std::sync::Arc;

use async_trait::async_trait;
use meteo_core::{CityName, DatabaseConfig, Reading, ReadingRepository, RepositoryError, StoreBackend};
use parking_lot::Mutex;

use crate::postgres::PostgresReadingStore;
use crate::sqlite::SqliteReadingStore;

#[derive(Clone)]
pub enum ReadingStore {
    /// Local SQLite storage.
    Sqlite(Arc<Mutex<SqliteReadingStore>>),

    /// PostgreSQL server.
    Postgres(Arc<PostgresReadingStore>),
}

impl ReadingStore {
    pub fn sqlite(store: SqliteReadingStore) -> Self {
        Self::Sqlite(Arc::new(Mutex::new(store)))
    }

    pub fn postgres(store: PostgresReadingStore) -> Self {
        Self::Postgres(Arc::new(store))
    }

    /// Open the backend selected by `config.backend`.
    ///
    /// # Errors
    /// Returns a `RepositoryError` if the backend cannot be opened.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        match config.backend {
            StoreBackend::Sqlite => {
                let path = config.path.clone();
                tracing::info!("Opening SQLite store at {}", path.display());
                let store = tokio::task::spawn_blocking(move || SqliteReadingStore::new(path))
                    .await
                    .map_err(join_error)??;
                Ok(Self::sqlite(store))
            }
            StoreBackend::Postgres => Ok(Self::postgres(PostgresReadingStore::connect(config).await?)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }
}

#[async_trait]
impl ReadingRepository for ReadingStore {
    async fn insert(&self, reading: &Reading) -> Result<(), RepositoryError> {
        match self {
            Self::Sqlite(store) => {
                let store = store.clone();
                let reading = reading.clone();
                tokio::task::spawn_blocking(move || store.lock().insert(&reading))
                    .await
                    .map_err(join_error)?
            }
            Self::Postgres(store) => store.insert(reading).await,
        }
    }

    async fn latest_by_city(&self, city: &CityName) -> Result<Reading, RepositoryError> {
        match self {
            Self::Sqlite(store) => {
                let store = store.clone();
                let city = city.clone();
                tokio::task::spawn_blocking(move || store.lock().latest_by_city(&city))
                    .await
                    .map_err(join_error)?
            }
            Self::Postgres(store) => store.latest_by_city(city).await,
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> RepositoryError {
    RepositoryError::query(format!("Store task failed: {}", err))
}
