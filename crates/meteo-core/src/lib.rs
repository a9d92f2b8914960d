//! Core of the meteo service.
//!
//! Holds the `Reading` entity, the capability traits the use-cases depend on,
//! the ingest and lookup use-cases themselves, and the shared configuration.

pub mod clock;
pub mod config;
pub mod error;
pub mod ports;
pub mod reading;
pub mod usecase;

pub use clock::SystemClock;
pub use config::{Config, DatabaseConfig, HttpConfig, IngestConfig, StoreBackend, UpstreamConfig};
pub use error::{IngestError, InvalidCity, RepositoryError, UpstreamError};
pub use ports::{Clock, Coordinates, GeocodingService, Observation, ReadingRepository, WeatherService};
pub use reading::{parse_observed_at, CityName, Reading};
pub use usecase::{GetLatestReading, IngestWeather};

use anyhow::Result;

/// Initialize process-wide logging.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("meteo core initialized");
    Ok(())
}
