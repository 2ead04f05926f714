//! Transform stage
//!
//! Validates the daily files produced by extraction and loads them through
//! per-source staging tables into the fact tables, writing one transform
//! log row per outcome along the way.

pub mod batch;
pub mod covid;
pub mod loader;
pub mod validate;
pub mod weather;

pub use batch::{transform_batch, transform_complete_file, Source};
pub use covid::CovidSource;
pub use loader::{SourceTables, StagingContext, COVID_TABLES, WEATHER_TABLES};
pub use validate::{clean_string, normalize_date, normalize_number, Rule, Schema};
pub use weather::WeatherSource;

use chrono::Utc;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::audit::{ErrorCode, ErrorManager, Severity};
use crate::config::EtlConfig;

/// Record counts committed by one transform run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformTotals {
    pub covid: i64,
    pub weather: i64,
}

/// Transform both sources for every listed country.
///
/// Per-country failures are reported and do not stop the run; the batch
/// month is the current month and day projected onto the reference year.
pub async fn transform_all(
    pool: &SqlitePool,
    config: &EtlConfig,
    errors: &Arc<ErrorManager>,
    countries: &[String],
) -> TransformTotals {
    let batch_date = Utc::now();
    let year_month = crate::config::target_date().format("%Y-%m").to_string();
    let data_dir = Path::new(&config.data_dir);

    let covid_source = CovidSource::new();
    let weather_source = WeatherSource::new();
    let mut totals = TransformTotals::default();

    for country in countries {
        info!(country, "Starting covid transform");
        match transform_batch(pool, &covid_source, data_dir, country, &year_month, batch_date).await
        {
            Ok(count) => totals.covid += count,
            Err(e) => {
                error!(country, error = %e, "Error transforming covid data");
                errors
                    .report(
                        ErrorCode::UnknownError,
                        format!("Covid transform failed for {}: {}", country, e),
                        Severity::Error,
                        "transform.covid",
                    )
                    .await;
            },
        }

        info!(country, "Starting weather transform");
        match transform_batch(pool, &weather_source, data_dir, country, &year_month, batch_date)
            .await
        {
            Ok(count) => totals.weather += count,
            Err(e) => {
                error!(country, error = %e, "Error transforming weather data");
                errors
                    .report(
                        ErrorCode::UnknownError,
                        format!("Weather transform failed for {}: {}", country, e),
                        Severity::Error,
                        "transform.weather",
                    )
                    .await;
            },
        }
    }

    info!(
        covid = totals.covid,
        weather = totals.weather,
        "Transform run finished"
    );
    totals
}
