//! HTTP delivery: `GET /{city}` returns the latest stored reading.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use meteo_core::{CityName, GetLatestReading, RepositoryError};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub latest: Arc<GetLatestReading>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/{city}", get(handle_latest))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health: liveness check.
async fn handle_health() -> &'static str {
    "ok"
}

/// GET /{city}: latest reading for the canonicalized city.
async fn handle_latest(State(state): State<AppState>, Path(city): Path<String>) -> Response {
    let city = match CityName::parse(&city) {
        Ok(c) => c,
        Err(e) => return (StatusCode::BAD_REQUEST, e.user_message()).into_response(),
    };

    match state.latest.execute(&city).await {
        Ok(reading) => Json(reading).into_response(),
        Err(RepositoryError::NotFound(_)) => {
            tracing::debug!("No reading for {}", city);
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
        Err(e) => {
            tracing::error!("Latest reading lookup for {} failed: {}", city, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.user_message()).into_response()
        }
    }
}
