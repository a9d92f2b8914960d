//! Open-Meteo clients for meteo
//!
//! Implements the geocoding and forecast capabilities against the public
//! Open-Meteo APIs. Neither needs an API key.

pub mod client;
pub mod forecast;
pub mod geocode;
pub mod types;

pub use client::{build_client, ReqwestErrorExt, USER_AGENT};
pub use forecast::OpenMeteoForecast;
pub use geocode::OpenMeteoGeocoder;
