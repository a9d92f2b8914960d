//! Capability traits consumed by the use-cases.
//!
//! Production adapters (Open-Meteo clients, SQL stores) and test fakes both
//! implement these, so the use-cases never see a transport. Dropping a
//! returned future cancels the call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{RepositoryError, UpstreamError};
use crate::reading::{CityName, Reading};

/// Geographic coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions as reported by the forecast upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Degrees Celsius, not range-checked.
    pub temperature: f64,
    /// Observation time as sent by the upstream, unparsed.
    pub observed_at: String,
}

/// City name to coordinates.
#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// # Errors
    /// `UpstreamError::NotFound` when nothing matches `city`; other variants
    /// on transport or decode failure.
    async fn get_coords(&self, city: &str) -> Result<Coordinates, UpstreamError>;
}

/// Coordinates to current temperature.
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// # Errors
    /// Any `UpstreamError` on transport or decode failure.
    async fn get_temperature(&self, coords: Coordinates) -> Result<Observation, UpstreamError>;
}

/// Append-only reading storage.
#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// Append a reading.
    ///
    /// # Errors
    /// Returns a `RepositoryError` if the write fails.
    async fn insert(&self, reading: &Reading) -> Result<(), RepositoryError>;

    /// The reading with the greatest timestamp for `city`.
    ///
    /// # Errors
    /// `RepositoryError::NotFound` when the city has no rows.
    async fn latest_by_city(&self, city: &CityName) -> Result<Reading, RepositoryError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
