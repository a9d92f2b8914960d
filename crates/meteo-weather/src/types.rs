//! Wire types for the Open-Meteo responses we read.

use serde::Deserialize;

/// `GET /v1/search` body. `results` is absent when nothing matched.
#[derive(Debug, Deserialize)]
pub struct GeocodingResponse {
    #[serde(default)]
    pub results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodingResult {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// `GET /v1/forecast?current=temperature_2m` body.
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
pub struct CurrentConditions {
    /// Local observation time, e.g. `2024-01-15T10:00`
    pub time: String,
    pub temperature_2m: f64,
}
