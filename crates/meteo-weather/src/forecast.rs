//! Current temperature from the Open-Meteo forecast API.

use async_trait::async_trait;
use meteo_core::{Coordinates, Observation, UpstreamError, WeatherService};
use reqwest::Client;
use tracing::instrument;

use crate::client::{endpoint, get_json};
use crate::types::ForecastResponse;

#[derive(Debug, Clone)]
pub struct OpenMeteoForecast {
    client: Client,
    base_url: String,
}

impl OpenMeteoForecast {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl WeatherService for OpenMeteoForecast {
    #[instrument(skip(self), level = "debug")]
    async fn get_temperature(&self, coords: Coordinates) -> Result<Observation, UpstreamError> {
        let latitude = format!("{:.6}", coords.latitude);
        let longitude = format!("{:.6}", coords.longitude);

        let url = endpoint(
            &self.base_url,
            "v1/forecast",
            &[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", "temperature_2m"),
            ],
        )?;

        let body: ForecastResponse = get_json(&self.client, url).await?;

        Ok(Observation {
            temperature: body.current.temperature_2m,
            observed_at: body.current.time,
        })
    }
}
