//! Periodic driver for the ingest use-case.
//!
//! One tick at start, then one per interval. A tick is awaited to completion
//! (or timeout) before the next is scheduled, so runs never overlap. Failed
//! ticks are logged and the loop carries on.
//!
//! The timeout and shutdown only cut the upstream lookups. Once a reading has
//! been fetched its write runs to completion, so a tick reported as failed
//! never leaves a row behind.

use std::sync::Arc;
use std::time::Duration;

use meteo_core::{IngestError, IngestWeather, Reading};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Ingest did not finish within {0:?}")]
    TimedOut(Duration),
}

pub struct IngestScheduler {
    ingest: Arc<IngestWeather>,
    interval: Duration,
    timeout: Duration,
}

impl IngestScheduler {
    pub fn new(ingest: Arc<IngestWeather>, interval: Duration, timeout: Duration) -> Self {
        Self {
            ingest,
            interval,
            timeout,
        }
    }

    /// Run one ingest. The lookups are bounded by the tick timeout.
    ///
    /// On timeout the in-flight lookup is dropped and nothing is stored.
    ///
    /// # Errors
    /// The ingest error, or `TimedOut`.
    pub async fn tick(&self) -> Result<Reading, TickError> {
        let reading = self.fetch().await?;
        self.store(reading).await
    }

    async fn fetch(&self) -> Result<Reading, TickError> {
        match tokio::time::timeout(self.timeout, self.ingest.fetch()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(TickError::TimedOut(self.timeout)),
        }
    }

    async fn store(&self, reading: Reading) -> Result<Reading, TickError> {
        self.ingest.persist(&reading).await?;
        Ok(reading)
    }

    /// Tick until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            city = %self.ingest.city(),
            "Ingest scheduler started, interval {:?}",
            self.interval
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                _ = shutdown.cancelled() => break,
                fetched = self.fetch() => fetched,
            };

            let outcome = match fetched {
                Ok(reading) => self.store(reading).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(reading) => tracing::info!(
                    city = %reading.name,
                    temperature = reading.temperature,
                    estimated = reading.estimated,
                    "Stored reading for {}",
                    reading.timestamp
                ),
                Err(TickError::Ingest(e)) => match e.upstream() {
                    Some(upstream) => tracing::warn!(
                        error = %upstream,
                        "Ingest tick failed: {}",
                        upstream.user_message()
                    ),
                    None => tracing::error!("Ingest tick failed: {}", e),
                },
                Err(e) => tracing::warn!("Ingest tick failed: {}", e),
            }
        }

        tracing::info!("Ingest scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use meteo_core::{
        CityName, Clock, Coordinates, GeocodingService, Observation, ReadingRepository,
        RepositoryError, UpstreamError, WeatherService,
    };
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGeocoder {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl GeocodingService for CountingGeocoder {
        async fn get_coords(&self, city: &str) -> Result<Coordinates, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(UpstreamError::NotFound(city.to_string()));
            }
            Ok(Coordinates {
                latitude: 55.75,
                longitude: 37.62,
            })
        }
    }

    struct SlowWeather {
        delay: Duration,
    }

    #[async_trait]
    impl WeatherService for SlowWeather {
        async fn get_temperature(&self, _coords: Coordinates) -> Result<Observation, UpstreamError> {
            tokio::time::sleep(self.delay).await;
            Ok(Observation {
                temperature: 3.5,
                observed_at: "2024-01-15T10:00".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct MemoryRepository {
        rows: Mutex<Vec<Reading>>,
        insert_delay: Duration,
    }

    #[async_trait]
    impl ReadingRepository for MemoryRepository {
        async fn insert(&self, reading: &Reading) -> Result<(), RepositoryError> {
            tokio::time::sleep(self.insert_delay).await;
            self.rows.lock().push(reading.clone());
            Ok(())
        }

        async fn latest_by_city(&self, city: &CityName) -> Result<Reading, RepositoryError> {
            Err(RepositoryError::not_found(city.as_str()))
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
        }
    }

    fn scheduler(
        geocoder: Arc<CountingGeocoder>,
        weather_delay: Duration,
        repository: Arc<MemoryRepository>,
        timeout: Duration,
    ) -> IngestScheduler {
        let ingest = IngestWeather::new(
            geocoder,
            Arc::new(SlowWeather {
                delay: weather_delay,
            }),
            repository,
            Arc::new(FixedClock),
            CityName::parse("moscow").unwrap(),
        );
        IngestScheduler::new(Arc::new(ingest), Duration::from_secs(10), timeout)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_immediately_then_every_interval() {
        let geocoder = Arc::new(CountingGeocoder {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let repository = Arc::new(MemoryRepository::default());
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(
            scheduler(geocoder.clone(), Duration::ZERO, repository.clone(), Duration::from_secs(5))
                .run(shutdown.clone()),
        );

        // Ticks at 0s, 10s, 20s
        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(repository.rows.lock().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_ticking_after_failures() {
        let geocoder = Arc::new(CountingGeocoder {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let repository = Arc::new(MemoryRepository::default());
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(
            scheduler(geocoder.clone(), Duration::ZERO, repository.clone(), Duration::from_secs(5))
                .run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 3);
        assert!(repository.rows.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_timeout_stores_nothing() {
        let geocoder = Arc::new(CountingGeocoder {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let repository = Arc::new(MemoryRepository::default());

        let result = scheduler(
            geocoder,
            Duration::from_secs(60),
            repository.clone(),
            Duration::from_secs(1),
        )
        .tick()
        .await;

        assert!(matches!(result, Err(TickError::TimedOut(d)) if d == Duration::from_secs(1)));
        assert!(repository.rows.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_write_outlives_timeout_and_is_reported() {
        let geocoder = Arc::new(CountingGeocoder {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let repository = Arc::new(MemoryRepository {
            insert_delay: Duration::from_secs(5),
            ..Default::default()
        });

        let reading = scheduler(
            geocoder,
            Duration::ZERO,
            repository.clone(),
            Duration::from_secs(1),
        )
        .tick()
        .await
        .unwrap();

        assert_eq!(repository.rows.lock().as_slice(), [reading]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick_completes() {
        let geocoder = Arc::new(CountingGeocoder {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let repository = Arc::new(MemoryRepository::default());
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(
            scheduler(
                geocoder.clone(),
                Duration::from_secs(3),
                repository.clone(),
                Duration::from_secs(5),
            )
            .run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
        assert!(repository.rows.lock().is_empty());
    }
}
