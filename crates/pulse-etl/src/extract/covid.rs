//! Covid case data extraction
//!
//! Pulls the full historical timeline per country from the disease.sh
//! endpoint, saves the complete response, and splits it into daily files.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::audit::{ErrorCode, ErrorManager, Severity};
use crate::config::EtlConfig;
use crate::error::Result;
use crate::extract::client::RetryingClient;
use crate::extract::store::RawStore;

const API_ID: &str = "disease.sh";

/// Per-country covid extractor
#[derive(Clone)]
pub struct CovidExtractor {
    client: RetryingClient,
    store: RawStore,
    config: Arc<EtlConfig>,
    errors: Arc<ErrorManager>,
}

impl CovidExtractor {
    pub fn new(
        client: RetryingClient,
        store: RawStore,
        config: Arc<EtlConfig>,
        errors: Arc<ErrorManager>,
    ) -> Self {
        Self {
            client,
            store,
            config,
            errors,
        }
    }

    /// Extract the full historical timeline for one country and keep the
    /// days within the configured range.
    pub async fn extract_for_country(&self, country: &str) -> Result<bool> {
        let url = format!(
            "https://disease.sh/v3/covid-19/historical/{}?lastdays=all",
            country
        );

        info!(country, "Extracting covid data");
        let (response, success) = self
            .client
            .request(API_ID, country, &url, None, None, None)
            .await;

        let Some(response) = response.filter(|_| success) else {
            return Ok(false);
        };

        let (payload, dir_name, file_name) =
            self.store
                .save_response(country, "covid", &response.body, "covid_data_complete.json")?;

        let row_count = self
            .store
            .split_covid_daily(
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
                    info!(country, "Covid extraction completed");
                },
                Ok(false) => error!(country, "Covid extraction failed"),
                Err(e) => {
                    error!(country, error = %e, "Error extracting covid data");
                    self.errors
                        .report(
                            ErrorCode::UnknownError,
                            format!("Covid extraction failed for {}: {}", country, e),
                            Severity::Error,
                            "extract.covid",
                        )
                        .await;
                },
            }
        }

        info!(
            successful = success_count,
            total = countries.len(),
            "Covid extraction finished"
        );
        success_count == countries.len()
    }

    /// Bounded worker-pool extraction for historical backfill
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
                    info!(country, "Covid extraction completed");
                },
                Ok((country, Ok(false))) => error!(country, "Covid extraction failed"),
                Ok((country, Err(e))) => {
                    error!(country, error = %e, "Error extracting covid data");
                    self.errors
                        .report(
                            ErrorCode::UnknownError,
                            format!("Covid extraction failed for {}: {}", country, e),
                            Severity::Error,
                            "extract.covid",
                        )
                        .await;
                },
                Err(e) => error!(error = %e, "Covid extraction task panicked"),
            }
        }

        info!(successful = success_count, total, "Covid extraction finished");
        success_count == total
    }
}
