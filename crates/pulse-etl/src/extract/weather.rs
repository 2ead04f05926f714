//! Weather data extraction
//!
//! Pulls daily point observations from the meteostat endpoint per country,
//! saves the complete response, and splits it into daily files.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::audit::{ErrorCode, ErrorManager, Severity};
use crate::config::EtlConfig;
use crate::countries::CountryDirectory;
use crate::error::Result;
use crate::extract::client::RetryingClient;
use crate::extract::store::RawStore;

const METEOSTAT_URL: &str = "https://meteostat.p.rapidapi.com/point/daily";
const API_ID: &str = "meteostat";

/// Per-country weather extractor
#[derive(Clone)]
pub struct WeatherExtractor {
    client: RetryingClient,
    store: RawStore,
    directory: Arc<CountryDirectory>,
    config: Arc<EtlConfig>,
    errors: Arc<ErrorManager>,
    endpoint: String,
}

impl WeatherExtractor {
    pub fn new(
        client: RetryingClient,
        store: RawStore,
        directory: Arc<CountryDirectory>,
        config: Arc<EtlConfig>,
        errors: Arc<ErrorManager>,
    ) -> Self {
        Self {
            client,
            store,
            directory,
            config,
            errors,
            endpoint: METEOSTAT_URL.to_string(),
        }
    }

    /// Point the extractor at a different endpoint
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Extract the configured date range for one country.
    ///
    /// Returns `Ok(false)` when no data could be fetched; that is a recorded
    /// per-country outcome, not an error for the batch.
    pub async fn extract_for_country(&self, country: &str) -> Result<bool> {
        let Some(coords) = self.directory.coordinates(country) else {
            error!(country, "No coordinates found");
            return Ok(false);
        };

        let start = self.config.start_date.format("%Y-%m-%d").to_string();
        let end = self.config.end_date.format("%Y-%m-%d").to_string();

        let params: Vec<(&str, String)> = vec![
            ("lat", coords.lat.to_string()),
            ("lon", coords.lon.to_string()),
            ("alt", coords.alt.to_string()),
            ("start", start.clone()),
            ("end", end.clone()),
        ];
        let headers: Vec<(&str, String)> = vec![
            ("x-rapidapi-key", self.config.rapidapi_key.clone()),
            ("x-rapidapi-host", "meteostat.p.rapidapi.com".to_string()),
        ];

        info!(country, start, end, "Extracting weather data");
        let (response, success) = self
            .client
            .request(API_ID, country, &self.endpoint, Some(&headers), Some(&params), None)
            .await;

        let Some(response) = response.filter(|_| success) else {
            return Ok(false);
        };

        let file_name = format!("weather_data_complete_{}.json", coords.city);
        let (payload, dir_name, file_name) =
            self.store
                .save_response(country, "weather", &response.body, &file_name)?;

        let row_count = self
            .store
            .split_weather_daily(
                country,
                &payload,
                self.config.start_date,
                self.config.end_date,
            )
            .await?;

        crate::audit::log_file_import(
            self.store.pool(),
            self.store.counters(),
            country,
            &dir_name,
            &file_name,
            row_count,
        )
        .await?;

        Ok(true)
    }

    /// Sequential extraction over all countries; true iff every country
    /// succeeded
    pub async fn extract_all(&self, countries: &[String]) -> bool {
        let mut success_count = 0;

        for country in countries {
            match self.extract_for_country(country).await {
                Ok(true) => {
                    success_count += 1;
                    info!(country, "Weather extraction completed");
                },
                Ok(false) => error!(country, "Weather extraction failed"),
                Err(e) => {
                    error!(country, error = %e, "Error extracting weather data");
                    self.errors
                        .report(
                            ErrorCode::UnknownError,
                            format!("Weather extraction failed for {}: {}", country, e),
                            Severity::Error,
                            "extract.weather",
                        )
                        .await;
                },
            }
        }

        info!(
            successful = success_count,
            total = countries.len(),
            "Weather extraction finished"
        );
        success_count == countries.len()
    }

    /// Bounded worker-pool extraction for historical backfill.
    ///
    /// Each country runs as an independent task; tasks share only read-only
    /// configuration and write through the audit log and id counters.
    pub async fn extract_all_concurrent(&self, countries: &[String]) -> bool {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let mut tasks = JoinSet::new();

        for country in countries {
            let extractor = self.clone();
            let permit_pool = Arc::clone(&semaphore);
            let country = country.clone();

            tasks.spawn(async move {
                let _permit = permit_pool.acquire().await.expect("semaphore closed");
                let result = extractor.extract_for_country(&country).await;
                (country, result)
            });
        }

        let mut success_count = 0;
        let total = countries.len();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((country, Ok(true))) => {
                    success_count += 1;
                    info!(country, "Weather extraction completed");
                },
                Ok((country, Ok(false))) => error!(country, "Weather extraction failed"),
                Ok((country, Err(e))) => {
                    error!(country, error = %e, "Error extracting weather data");
                    self.errors
                        .report(
                            ErrorCode::UnknownError,
                            format!("Weather extraction failed for {}: {}", country, e),
                            Severity::Error,
                            "extract.weather",
                        )
                        .await;
                },
                Err(e) => error!(error = %e, "Weather extraction task panicked"),
            }
        }

        info!(successful = success_count, total, "Weather extraction finished");
        success_count == total
    }
}
