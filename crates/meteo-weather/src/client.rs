//! Shared HTTP plumbing for the Open-Meteo clients.

use std::time::Duration;

use meteo_core::UpstreamError;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

pub const USER_AGENT: &str = concat!("meteo/", env!("CARGO_PKG_VERSION"));

/// Longest upstream error body kept in an `UpstreamError::Status`.
const MAX_ERROR_BODY: usize = 200;

/// Build the HTTP client shared by both upstream adapters.
///
/// # Errors
/// Fails if the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration) -> Result<Client, UpstreamError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ReqwestErrorExt::into_upstream_error)
}

/// Extension trait for converting reqwest errors to upstream errors.
pub trait ReqwestErrorExt {
    fn into_upstream_error(self) -> UpstreamError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_upstream_error(self) -> UpstreamError {
        if self.is_timeout() {
            UpstreamError::Timeout
        } else if self.is_decode() {
            UpstreamError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            UpstreamError::Status {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            UpstreamError::Connection(self.to_string())
        }
    }
}

/// Join `path` onto `base` and append query parameters.
pub(crate) fn endpoint(base: &str, path: &str, params: &[(&str, &str)]) -> Result<Url, UpstreamError> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse_with_params(&raw, params)
        .map_err(|e| UpstreamError::InvalidRequest(format!("{}: {}", raw, e)))
}

/// GET `url` and decode a JSON body, mapping non-2xx statuses to errors.
pub(crate) async fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T, UpstreamError> {
    let response = client
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(ReqwestErrorExt::into_upstream_error)?;

    read_json(response).await
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        tracing::debug!("Upstream returned status {}", status);
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            message: text.chars().take(MAX_ERROR_BODY).collect(),
        });
    }

    response
        .json()
        .await
        .map_err(|e| UpstreamError::InvalidResponse(format!("JSON parse error: {}", e)))
}
