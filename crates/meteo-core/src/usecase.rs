//! Ingest and lookup use-cases.

use std::sync::Arc;

use crate::error::{IngestError, RepositoryError};
use crate::ports::{Clock, GeocodingService, ReadingRepository, WeatherService};
use crate::reading::{parse_observed_at, CityName, Reading};

/// Fetch the current temperature for one city and append it to the store.
///
/// Steps run in order: geocode, forecast, parse, insert. A failure in any
/// remote step aborts the run before anything is written. An unparseable
/// observation time does not abort: the clock's time is used and the reading
/// is marked `estimated`. Nothing here retries; the scheduler simply runs the
/// next tick.
pub struct IngestWeather {
    geocoder: Arc<dyn GeocodingService>,
    weather: Arc<dyn WeatherService>,
    repository: Arc<dyn ReadingRepository>,
    clock: Arc<dyn Clock>,
    city: CityName,
}

impl IngestWeather {
    pub fn new(
        geocoder: Arc<dyn GeocodingService>,
        weather: Arc<dyn WeatherService>,
        repository: Arc<dyn ReadingRepository>,
        clock: Arc<dyn Clock>,
        city: CityName,
    ) -> Self {
        Self {
            geocoder,
            weather,
            repository,
            clock,
            city,
        }
    }

    pub fn city(&self) -> &CityName {
        &self.city
    }

    /// Run one ingest. Returns the reading that was stored.
    ///
    /// # Errors
    /// Returns the failing step's error unchanged inside `IngestError`.
    pub async fn execute(&self) -> Result<Reading, IngestError> {
        let reading = self.fetch().await?;
        self.persist(&reading).await?;
        Ok(reading)
    }

    /// Geocode, look up the forecast and build the reading without storing it.
    ///
    /// Dropping this future never leaves a row behind.
    ///
    /// # Errors
    /// `IngestError::Geocoding` or `IngestError::Weather`.
    pub async fn fetch(&self) -> Result<Reading, IngestError> {
        let coords = self
            .geocoder
            .get_coords(self.city.as_str())
            .await
            .map_err(IngestError::Geocoding)?;

        let observation = self
            .weather
            .get_temperature(coords)
            .await
            .map_err(IngestError::Weather)?;

        let (timestamp, estimated) = match parse_observed_at(&observation.observed_at) {
            Some(ts) => (ts, false),
            None => {
                let now = self.clock.now();
                tracing::warn!(
                    city = %self.city,
                    observed_at = %observation.observed_at,
                    "Unparseable observation time, using ingest time {}",
                    now
                );
                (now, true)
            }
        };

        Ok(Reading {
            name: self.city.clone(),
            timestamp,
            temperature: observation.temperature,
            estimated,
        })
    }

    /// Append a fetched reading to the store.
    ///
    /// # Errors
    /// `IngestError::Persist` with the store's error.
    pub async fn persist(&self, reading: &Reading) -> Result<(), IngestError> {
        self.repository
            .insert(reading)
            .await
            .map_err(IngestError::Persist)
    }
}

/// Most recent stored reading for a city.
pub struct GetLatestReading {
    repository: Arc<dyn ReadingRepository>,
}

impl GetLatestReading {
    pub fn new(repository: Arc<dyn ReadingRepository>) -> Self {
        Self { repository }
    }

    /// # Errors
    /// `RepositoryError::NotFound` if the city was never ingested; any other
    /// store failure unchanged.
    pub async fn execute(&self, city: &CityName) -> Result<Reading, RepositoryError> {
        self.repository.latest_by_city(city).await
    }
}
