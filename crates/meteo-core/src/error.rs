//! Error taxonomy for the meteo core.
//!
//! - `UpstreamError`: a geocoding or forecast lookup failed. Fatal to one
//!   ingest tick, never to the process.
//! - `RepositoryError`: the reading store failed, or holds no row for a city.
//! - `IngestError`: which ingest step failed, wrapping the collaborator's error
//!   unchanged.
//! - `InvalidCity`: a city name could not be canonicalized.

use thiserror::Error;

/// Failures reported by the geocoding and forecast capabilities.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("No match for location: {0}")]
    NotFound(String),

    #[error("Upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl UpstreamError {
    pub fn user_message(&self) -> &'static str {
        match self {
            UpstreamError::NotFound(_) => "Location not found. Check the city name.",
            UpstreamError::Status { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            UpstreamError::Status { .. } => "The weather service rejected the request.",
            UpstreamError::Timeout => "The weather service timed out. Please try again.",
            UpstreamError::Connection(_) => "Unable to reach the weather service.",
            UpstreamError::InvalidResponse(_) => "Received an unexpected response from the weather service.",
            UpstreamError::InvalidRequest(_) => "The weather request was malformed.",
        }
    }
}

/// Failures reported by a `ReadingRepository`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No reading has been stored for the city.
    #[error("No reading for city: {0}")]
    NotFound(String),

    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Stored data is invalid: {0}")]
    Corruption(String),
}

impl RepositoryError {
    pub fn not_found(city: impl Into<String>) -> Self {
        Self::NotFound(city.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            RepositoryError::NotFound(_) => "Not found",
            RepositoryError::Connection(_) => "Storage is unavailable. Please try again later.",
            RepositoryError::Query(_) => "A storage operation failed. Please try again.",
            RepositoryError::Corruption(_) => "Stored data could not be read.",
        }
    }
}

/// Failure of one `IngestWeather` run, tagged with the step that failed.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Geocoding failed: {0}")]
    Geocoding(#[source] UpstreamError),

    #[error("Forecast lookup failed: {0}")]
    Weather(#[source] UpstreamError),

    #[error("Persisting reading failed: {0}")]
    Persist(#[source] RepositoryError),
}

impl IngestError {
    /// The upstream error, if one of the remote lookups failed.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            Self::Geocoding(e) | Self::Weather(e) => Some(e),
            Self::Persist(_) => None,
        }
    }
}

/// A city name that cannot be used as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCity {
    #[error("City name is empty")]
    Blank,

    #[error("City name is too long ({0} characters)")]
    TooLong(usize),
}

impl InvalidCity {
    pub fn user_message(&self) -> &'static str {
        match self {
            InvalidCity::Blank => "City name is required.",
            InvalidCity::TooLong(_) => "City name is too long.",
        }
    }
}
