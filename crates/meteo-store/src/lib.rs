//! Reading storage for meteo.
//!
//! Two backends implement `ReadingRepository`: PostgreSQL for deployments and
//! SQLite for local runs and tests. `ReadingStore` picks one from config.

pub mod postgres;
pub mod sqlite;
pub mod store;

pub use postgres::PostgresReadingStore;
pub use sqlite::SqliteReadingStore;
pub use store::ReadingStore;
