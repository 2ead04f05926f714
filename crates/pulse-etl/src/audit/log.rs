//! Append-only log writers
//!
//! One function per stream; each performs a single insert with an identifier
//! reserved by the caller (counter id or UUID) and never updates a row.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use super::models::{CountryRef, TransformStatus};
use crate::db::{self, statements, IdCounters};
use crate::error::{EtlError, Result};

/// Record one API call attempt.
///
/// Called for every attempt, including each retry; attempts are never
/// collapsed. Transport failures are recorded with a synthetic status of 0.
pub async fn log_api_call(
    pool: &SqlitePool,
    counters: &IdCounters,
    country: &str,
    api_id: &str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status_code: i64,
    error_message: Option<&str>,
) -> Result<i64> {
    let country_id = db::country_id(pool, country)
        .await?
        .ok_or_else(|| EtlError::CountryNotFound(country.to_string()))?;

    let id = counters.next_api_log_id();

    sqlx::query(statements::INSERT_API_LOG)
        .bind(id)
        .bind(country_id)
        .bind(api_id)
        .bind(start_time)
        .bind(end_time)
        .bind(status_code)
        .bind(error_message)
        .execute(pool)
        .await?;

    debug!(id, country, api_id, status_code, "Logged API call");
    Ok(id)
}

/// Record one artifact written to the raw response store.
///
/// File created/modified timestamps come from filesystem metadata when the
/// file exists, falling back to the current time.
pub async fn log_file_import(
    pool: &SqlitePool,
    counters: &IdCounters,
    country: &str,
    directory: &str,
    file_name: &str,
    row_count: i64,
) -> Result<i64> {
    let country_id = db::country_id(pool, country)
        .await?
        .ok_or_else(|| EtlError::CountryNotFound(country.to_string()))?;

    let (created, modified) = file_times(directory, file_name);
    let id = counters.next_import_log_id();

    sqlx::query(statements::INSERT_IMPORT_LOG)
        .bind(id)
        .bind(Utc::now())
        .bind(country_id)
        .bind(directory)
        .bind(file_name)
        .bind(created)
        .bind(modified)
        .bind(row_count)
        .execute(pool)
        .await?;

    debug!(id, country, file_name, row_count, "Logged file import");
    Ok(id)
}

/// Record one transform outcome: a per-file row or a per-batch rollup row
#[allow(clippy::too_many_arguments)]
pub async fn log_transform(
    pool: &SqlitePool,
    transform_id: Uuid,
    batch_date: DateTime<Utc>,
    country: &CountryRef,
    directory: &str,
    file_name: &str,
    row_count: i64,
    status: &TransformStatus,
) -> Result<()> {
    sqlx::query(statements::INSERT_TRANSFORM_LOG)
        .bind(transform_id.to_string())
        .bind(batch_date)
        .bind(country.as_column())
        .bind(directory)
        .bind(file_name)
        .bind(row_count)
        .bind(status.render())
        .execute(pool)
        .await?;

    debug!(%transform_id, file_name, status = %status, "Logged transform outcome");
    Ok(())
}

fn file_times(directory: &str, file_name: &str) -> (DateTime<Utc>, DateTime<Utc>) {
    let path = std::path::Path::new(directory).join(file_name);
    let now = Utc::now();

    match std::fs::metadata(&path) {
        Ok(meta) => {
            let created = meta.created().map(DateTime::from).unwrap_or(now);
            let modified = meta.modified().map(DateTime::from).unwrap_or(now);
            (created, modified)
        },
        Err(_) => (now, now),
    }
}
