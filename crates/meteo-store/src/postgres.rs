//! PostgreSQL reading storage.
//!
//! One client is shared by all callers. When its connection closes, the next
//! call opens a new one; the call that saw the failure reports it.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use meteo_core::{CityName, DatabaseConfig, Reading, RepositoryError};
use postgres_native_tls::MakeTlsConnector;
use parking_lot::RwLock;
use tokio_postgres::{Client, NoTls};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS reading (
    name text NOT NULL,
    timestamp timestamptz NOT NULL,
    temperature double precision NOT NULL,
    estimated boolean NOT NULL DEFAULT false
);

ALTER TABLE reading ADD COLUMN IF NOT EXISTS estimated boolean NOT NULL DEFAULT false;

CREATE INDEX IF NOT EXISTS reading_name_timestamp_idx ON reading (name, timestamp DESC);
"#;

const INSERT_READING: &str =
    "INSERT INTO reading (name, timestamp, temperature, estimated) VALUES ($1, $2, $3, $4)";

const SELECT_LATEST: &str = "SELECT name, timestamp, temperature, estimated
     FROM reading
     WHERE name = $1
     ORDER BY timestamp DESC
     LIMIT 1";

pub struct PostgresReadingStore {
    config: DatabaseConfig,
    client: RwLock<Arc<Client>>,
}

impl PostgresReadingStore {
    /// Connect using `config` and ensure the schema exists.
    ///
    /// TLS is negotiated unless `ssl_mode` is `disable`.
    ///
    /// # Errors
    /// `RepositoryError::Connection` if the server is unreachable or rejects
    /// the credentials; `Query` if the schema cannot be created.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        let client = open(config).await?;

        tracing::info!(
            "Connected to PostgreSQL at {}:{}/{}",
            config.host,
            config.port,
            config.name
        );

        let store = Self {
            config: config.clone(),
            client: RwLock::new(Arc::new(client)),
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// The live client, reconnecting first if the connection has closed.
    async fn client(&self) -> Result<Arc<Client>, RepositoryError> {
        let current = self.client.read().clone();
        if !current.is_closed() {
            return Ok(current);
        }

        tracing::warn!(
            "PostgreSQL connection to {}:{} closed, reconnecting",
            self.config.host,
            self.config.port
        );
        let fresh = Arc::new(open(&self.config).await?);
        *self.client.write() = fresh.clone();
        tracing::info!("Reconnected to PostgreSQL");
        Ok(fresh)
    }

    async fn init_schema(&self) -> Result<(), RepositoryError> {
        self.client()
            .await?
            .batch_execute(SCHEMA)
            .await
            .map_err(into_repository_error)
    }

    /// # Errors
    /// Returns a `RepositoryError` if the insert fails.
    pub async fn insert(&self, reading: &Reading) -> Result<(), RepositoryError> {
        self.client()
            .await?
            .execute(
                INSERT_READING,
                &[
                    &reading.name.as_str(),
                    &reading.timestamp,
                    &reading.temperature,
                    &reading.estimated,
                ],
            )
            .await
            .map_err(into_repository_error)?;
        Ok(())
    }

    /// # Errors
    /// `RepositoryError::NotFound` if the city has no rows.
    pub async fn latest_by_city(&self, city: &CityName) -> Result<Reading, RepositoryError> {
        let row = self
            .client()
            .await?
            .query_opt(SELECT_LATEST, &[&city.as_str()])
            .await
            .map_err(into_repository_error)?
            .ok_or_else(|| RepositoryError::not_found(city.as_str()))?;

        let name: String = row.try_get(0).map_err(into_repository_error)?;
        let timestamp: DateTime<Utc> = row.try_get(1).map_err(into_repository_error)?;
        let temperature: f64 = row.try_get(2).map_err(into_repository_error)?;
        let estimated: bool = row.try_get(3).map_err(into_repository_error)?;

        let name = CityName::parse(&name)
            .map_err(|e| RepositoryError::Corruption(format!("name '{}': {}", name, e)))?;

        Ok(Reading {
            name,
            timestamp,
            temperature,
            estimated,
        })
    }
}

async fn open(config: &DatabaseConfig) -> Result<Client, RepositoryError> {
    let conn_str = config.connection_string();

    if config.uses_tls() {
        let connector = native_tls::TlsConnector::new()
            .map_err(|e| RepositoryError::Connection(format!("TLS setup failed: {}", e)))?;
        let (client, connection) = tokio_postgres::connect(&conn_str, MakeTlsConnector::new(connector))
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        spawn_connection(connection);
        Ok(client)
    } else {
        let (client, connection) = tokio_postgres::connect(&conn_str, NoTls)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        spawn_connection(connection);
        Ok(client)
    }
}

/// Drive the connection half on its own task until the client is dropped.
fn spawn_connection<F>(connection: F)
where
    F: Future<Output = Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(
                "PostgreSQL connection lost: {}. Store calls fail until the next one reconnects",
                e
            );
        }
    });
}

fn into_repository_error(err: tokio_postgres::Error) -> RepositoryError {
    if err.is_closed() {
        RepositoryError::Connection(err.to_string())
    } else if let Some(code) = err.code() {
        RepositoryError::Query(format!("{} ({})", err, code.code()))
    } else {
        RepositoryError::Query(err.to_string())
    }
}
