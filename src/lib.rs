//! meteo service binary support: wiring, scheduler and HTTP delivery.

pub mod app;
pub mod http;
pub mod scheduler;

pub use app::App;
