//! Pipeline configuration
//!
//! Loaded once from the environment at startup and shared read-only across
//! tasks. Numeric variables that fail to parse fall back to their defaults;
//! a missing API key is tolerated here and only fails the weather extraction
//! at call time.

use chrono::{Datelike, NaiveDate, Utc};

use crate::error::Result;

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Maximum retry attempts after the initial API call
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Seconds to sleep between retry attempts
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Worker-pool size for historical backfill
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Root directory for raw response artifacts
pub const DEFAULT_DATA_DIR: &str = "data";

/// Embedded database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite:etl_data.db";

/// Pipeline configuration consumed by the extract and transform stages
#[derive(Debug, Clone)]
pub struct EtlConfig {
    /// RapidAPI key for the weather endpoint
    pub rapidapi_key: String,
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub retry_delay_secs: u64,
    /// Transport timeout per attempt
    pub request_timeout_secs: u64,
    /// Concurrent extraction tasks during backfill
    pub max_workers: usize,
    /// Raw artifact root
    pub data_dir: String,
    /// SQLite connection string
    pub database_url: String,
    /// Inclusive batch date bounds
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Default for EtlConfig {
    fn default() -> Self {
        let target = target_date();
        Self {
            rapidapi_key: String::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_workers: DEFAULT_MAX_WORKERS,
            data_dir: DEFAULT_DATA_DIR.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            start_date: target,
            end_date: target,
        }
    }
}

impl EtlConfig {
    /// Load configuration from environment variables
    ///
    /// - `RAPIDAPI_KEY`: weather API key
    /// - `ETL_MAX_RETRIES`, `ETL_RETRY_DELAY_SECS`, `ETL_REQUEST_TIMEOUT_SECS`
    /// - `ETL_MAX_WORKERS`: backfill worker-pool size
    /// - `ETL_DATA_DIR`: raw artifact root
    /// - `DATABASE_URL`: SQLite connection string
    /// - `ETL_START_DATE`, `ETL_END_DATE`: `YYYY-MM-DD` batch bounds
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("RAPIDAPI_KEY") {
            config.rapidapi_key = key;
        }
        if let Some(v) = env_parse("ETL_MAX_RETRIES") {
            config.max_retries = v;
        }
        if let Some(v) = env_parse("ETL_RETRY_DELAY_SECS") {
            config.retry_delay_secs = v;
        }
        if let Some(v) = env_parse("ETL_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = v;
        }
        if let Some(v) = env_parse("ETL_MAX_WORKERS") {
            config.max_workers = v;
        }
        if let Ok(dir) = std::env::var("ETL_DATA_DIR") {
            config.data_dir = dir;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(date) = env_date("ETL_START_DATE")? {
            config.start_date = date;
        }
        if let Some(date) = env_date("ETL_END_DATE")? {
            config.end_date = date;
        }

        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

// A bad date silently shifting the batch window is worse than a bad retry
// count, so dates reject instead of falling back.
fn env_date(name: &str) -> Result<Option<NaiveDate>> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| crate::error::EtlError::config(format!("{} must be YYYY-MM-DD, got '{}'", name, raw)))?;
    Ok(Some(date))
}

/// Reference date for single-day ingestion: today's month and day projected
/// into the 2022 observation year. Feb 29 has no 2022 counterpart and maps
/// to Feb 28.
pub fn target_date() -> NaiveDate {
    let today = Utc::now().date_naive();
    NaiveDate::from_ymd_opt(2022, today.month(), today.day())
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(2022, 2, 28).expect("valid fallback date"))
}
