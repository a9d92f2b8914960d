//! Forward geocoding: city name to coordinates.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use async_trait::async_trait;
use meteo_core::{Coordinates, GeocodingService, UpstreamError};
use reqwest::Client;
use tracing::instrument;

use crate::client::{endpoint, get_json};
use crate::types::{GeocodingResponse, GeocodingResult};

#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    client: Client,
    base_url: String,
    language: String,
}

impl OpenMeteoGeocoder {
    pub fn new(client: Client, base_url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            language: language.into(),
        }
    }

    /// Best match for `city`, or `NotFound` if the upstream has none.
    ///
    /// # Errors
    /// `InvalidRequest` for a blank name; `NotFound` on zero results; other
    /// variants on transport or decode failure.
    pub async fn search(&self, city: &str) -> Result<GeocodingResult, UpstreamError> {
        if city.trim().is_empty() {
            return Err(UpstreamError::InvalidRequest("city is required".to_string()));
        }

        let url = endpoint(
            &self.base_url,
            "v1/search",
            &[
                ("name", city),
                ("count", "1"),
                ("language", self.language.as_str()),
                ("format", "json"),
            ],
        )?;

        let body: GeocodingResponse = get_json(&self.client, url).await?;

        body.results
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::NotFound(city.to_string()))
    }
}

#[async_trait]
impl GeocodingService for OpenMeteoGeocoder {
    #[instrument(skip(self), level = "debug")]
    async fn get_coords(&self, city: &str) -> Result<Coordinates, UpstreamError> {
        let result = self.search(city).await?;

        tracing::debug!(
            "Geocoded {} to {} ({}) at {}, {}",
            city,
            result.name,
            result.country.as_deref().unwrap_or("-"),
            result.latitude,
            result.longitude
        );

        Ok(Coordinates {
            latitude: result.latitude,
            longitude: result.longitude,
        })
    }
}
