use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use meteo_core::{Config, GetLatestReading, IngestWeather, ReadingRepository, SystemClock};
use meteo_store::ReadingStore;
use meteo_weather::{build_client, OpenMeteoForecast, OpenMeteoGeocoder};

use crate::http::{self, AppState};
use crate::scheduler::IngestScheduler;

/// Wired service: upstream clients, store and both use-cases.
pub struct App {
    config: Arc<Config>,
    ingest: Arc<IngestWeather>,
    latest: Arc<GetLatestReading>,
}

impl App {
    /// Build upstream clients, open the store and wire the use-cases.
    pub async fn build(config: Config) -> Result<Self> {
        let city = config.city().context("Invalid ingest city")?;

        let client = build_client(config.upstream.request_timeout)
            .context("Failed to create HTTP client")?;
        let geocoder = Arc::new(OpenMeteoGeocoder::new(
            client.clone(),
            &config.upstream.geocoding_url,
            &config.upstream.language,
        ));
        let forecast = Arc::new(OpenMeteoForecast::new(client, &config.upstream.forecast_url));

        let store = ReadingStore::connect(&config.database)
            .await
            .context("Failed to open reading store")?;
        tracing::info!("Using {} reading store", store.backend_name());
        let repository: Arc<dyn ReadingRepository> = Arc::new(store);

        let ingest = Arc::new(IngestWeather::new(
            geocoder,
            forecast,
            repository.clone(),
            Arc::new(SystemClock::new()),
            city,
        ));
        let latest = Arc::new(GetLatestReading::new(repository));

        Ok(Self {
            config: Arc::new(config),
            ingest,
            latest,
        })
    }

    pub fn router(&self) -> Router {
        http::router(AppState {
            latest: self.latest.clone(),
        })
    }

    pub fn scheduler(&self) -> IngestScheduler {
        IngestScheduler::new(
            self.ingest.clone(),
            self.config.ingest.interval,
            self.config.ingest.timeout,
        )
    }

    /// Serve HTTP and run the ingest scheduler until a shutdown signal.
    pub async fn run(self) -> Result<()> {
        let host = self.config.http.host.as_str();
        let port = self.config.http.port;
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", host, port))?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        let shutdown = CancellationToken::new();
        let scheduler_task = tokio::spawn(self.scheduler().run(shutdown.clone()));
        tokio::spawn(watch_signals(shutdown.clone()));

        let server_shutdown = shutdown.clone();
        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await;

        // Server exit (clean or not) also stops ingestion
        shutdown.cancel();
        if let Err(e) = scheduler_task.await {
            tracing::error!("Scheduler task failed: {}", e);
        }

        served.context("HTTP server failed")?;
        tracing::info!("Shutdown complete");
        Ok(())
    }
}

async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = shutdown.cancelled() => return,
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
