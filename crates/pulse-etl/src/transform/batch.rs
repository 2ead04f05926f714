//! Directory batch transformation
//!
//! Walks one country's daily files for a month, validates each record, and
//! loads survivors through the staged loader. Weather and covid batches
//! share this driver and differ only in their [`Source`] definition.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{self, CountryRef, TransformStatus};
use crate::db;
use crate::error::Result;
use crate::transform::loader::{SourceTables, StagingContext};
use crate::transform::validate::{normalize_date, Schema};

/// One transformable data source: its tables, schema, and record shape
pub trait Source {
    fn name(&self) -> &'static str;
    fn tables(&self) -> &'static SourceTables;
    fn schema(&self) -> &Schema;

    /// Project one raw daily record onto the loadable shape
    fn clean_record(&self, raw: &Value, country: &str, date: &str) -> Value;

    /// Records held by a complete (unsplit) response file
    fn complete_file_records(&self, payload: &Value) -> Vec<Value>;
}

/// Transform every daily file under `<data_dir>/<source>/<country>/<year_month>`.
///
/// Each file produces exactly one transform log row; the batch ends with a
/// rollup row under the file name `BATCH_PROCESS`. A record that fails
/// validation or loading never stops the batch. Returns the number of
/// records committed to the fact table.
pub async fn transform_batch(
    pool: &SqlitePool,
    source: &dyn Source,
    data_dir: &Path,
    country: &str,
    year_month: &str,
    batch_date: DateTime<Utc>,
) -> Result<i64> {
    let folder = data_dir.join(source.name()).join(country).join(year_month);
    let folder_name = folder.to_string_lossy().into_owned();

    let staging = StagingContext::acquire(pool, source.tables()).await?;
    // The staging table must go away even when a log write fails mid-batch
    let outcome = drive_batch(
        pool,
        source,
        &staging,
        &folder,
        &folder_name,
        country,
        year_month,
        batch_date,
    )
    .await;
    let released = staging.release().await;
    let total = outcome?;
    released?;

    info!(
        country,
        source = source.name(),
        processed = total,
        "Batch transform finished"
    );
    Ok(total)
}

#[allow(clippy::too_many_arguments)]
async fn drive_batch(
    pool: &SqlitePool,
    source: &dyn Source,
    staging: &StagingContext<'_>,
    folder: &Path,
    folder_name: &str,
    country: &str,
    year_month: &str,
    batch_date: DateTime<Utc>,
) -> Result<i64> {
    let mut total = 0i64;

    if !folder.exists() {
        warn!(country, folder = %folder_name, "Transform folder does not exist");
        log_outcome(
            pool,
            country,
            batch_date,
            folder_name,
            "DIRECTORY",
            0,
            &TransformStatus::NoFilesFound,
        )
        .await?;
        return Ok(0);
    }

    let files = daily_files(folder)?;
    if files.is_empty() {
        warn!(country, folder = %folder_name, "No daily files to transform");
        log_outcome(
            pool,
            country,
            batch_date,
            folder_name,
            "DIRECTORY",
            0,
            &TransformStatus::EmptyDirectory,
        )
        .await?;
        return Ok(0);
    }

    for file_name in &files {
        let transform_id = Uuid::new_v4();
        let path = folder.join(file_name);

        let raw: Value = match pulse_common::fs::read_json(&path).map_err(|e| e.to_string()) {
            Ok(raw) => raw,
            Err(detail) => {
                log_file_outcome(
                    pool,
                    country,
                    transform_id,
                    batch_date,
                    folder_name,
                    file_name,
                    &TransformStatus::InvalidJson(detail),
                )
                .await?;
                continue;
            },
        };

        let date = match record_date(&raw, file_name, year_month) {
            Ok(date) => date,
            Err(status) => {
                log_file_outcome(
                    pool,
                    country,
                    transform_id,
                    batch_date,
                    folder_name,
                    file_name,
                    &status,
                )
                .await?;
                continue;
            },
        };

        let record = source.clean_record(&raw, country, &date);
        let violations = source.schema().validate(&record);
        if !violations.is_empty() {
            log_file_outcome(
                pool,
                country,
                transform_id,
                batch_date,
                folder_name,
                file_name,
                &TransformStatus::ValidationError(violations.join("; ")),
            )
            .await?;
            continue;
        }

        if staging
            .load_record(&record, country, transform_id, batch_date, folder_name, file_name)
            .await?
        {
            total += 1;
        }
    }

    let rollup = if total > 0 {
        TransformStatus::Success
    } else {
        TransformStatus::NoRecordsProcessed
    };
    log_outcome(
        pool,
        country,
        batch_date,
        folder_name,
        "BATCH_PROCESS",
        total,
        &rollup,
    )
    .await?;

    Ok(total)
}

/// Transform a complete (unsplit) response file in place.
pub async fn transform_complete_file(
    pool: &SqlitePool,
    source: &dyn Source,
    country: &str,
    file_path: &Path,
    batch_date: DateTime<Utc>,
) -> Result<i64> {
    let directory = file_path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let staging = StagingContext::acquire(pool, source.tables()).await?;
    let outcome = drive_complete_file(
        pool,
        source,
        &staging,
        country,
        file_path,
        &directory,
        &file_name,
        batch_date,
    )
    .await;
    let released = staging.release().await;
    let total = outcome?;
    released?;
    Ok(total)
}

#[allow(clippy::too_many_arguments)]
async fn drive_complete_file(
    pool: &SqlitePool,
    source: &dyn Source,
    staging: &StagingContext<'_>,
    country: &str,
    file_path: &Path,
    directory: &str,
    file_name: &str,
    batch_date: DateTime<Utc>,
) -> Result<i64> {
    let mut total = 0i64;

    let payload: Value = match pulse_common::fs::read_json(file_path).map_err(|e| e.to_string()) {
        Ok(payload) => payload,
        Err(detail) => {
            log_file_outcome(
                pool,
                country,
                Uuid::new_v4(),
                batch_date,
                directory,
                file_name,
                &TransformStatus::InvalidJson(detail),
            )
            .await?;
            return Ok(0);
        },
    };

    for raw in source.complete_file_records(&payload) {
        let date = raw
            .get("date")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let record = source.clean_record(&raw, country, &date);
        let violations = source.schema().validate(&record);
        if !violations.is_empty() {
            log_file_outcome(
                pool,
                country,
                Uuid::new_v4(),
                batch_date,
                directory,
                file_name,
                &TransformStatus::ValidationError(violations.join("; ")),
            )
            .await?;
            continue;
        }

        if staging
            .load_record(&record, country, Uuid::new_v4(), batch_date, directory, file_name)
            .await?
        {
            total += 1;
        }
    }

    let rollup = if total > 0 {
        TransformStatus::Success
    } else {
        TransformStatus::NoRecordsProcessed
    };
    log_outcome(pool, country, batch_date, directory, file_name, total, &rollup).await?;

    Ok(total)
}

/// Daily file names in a month folder, lexicographically sorted
fn daily_files(folder: &Path) -> Result<Vec<String>> {
    let mut files: Vec<String> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    Ok(files)
}

/// Resolve the observation date: the record's own `date` field when present,
/// otherwise the day number from the file name combined with the batch month
fn record_date(raw: &Value, file_name: &str, year_month: &str) -> std::result::Result<String, TransformStatus> {
    if let Some(date_value) = raw.get("date") {
        let date_str = date_value.as_str().unwrap_or_default();
        return normalize_date(date_str).ok_or_else(|| {
            TransformStatus::InvalidDateFormat(format!("Could not parse date: {}", date_str))
        });
    }

    let stem = file_name.trim_end_matches(".json");
    stem.parse::<u32>()
        .ok()
        .and_then(|day| {
            NaiveDate::parse_from_str(&format!("{}-{:02}", year_month, day), "%Y-%m-%d").ok()
        })
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| {
            TransformStatus::InvalidDateFromFilename(format!(
                "Could not derive date from file name: {}",
                file_name
            ))
        })
}

async fn log_file_outcome(
    pool: &SqlitePool,
    country: &str,
    transform_id: Uuid,
    batch_date: DateTime<Utc>,
    directory: &str,
    file_name: &str,
    status: &TransformStatus,
) -> Result<()> {
    let resolved = db::country_id(pool, country).await?;
    audit::log_transform(
        pool,
        transform_id,
        batch_date,
        &CountryRef::from_resolution(resolved, country),
        directory,
        file_name,
        0,
        status,
    )
    .await
}

async fn log_outcome(
    pool: &SqlitePool,
    country: &str,
    batch_date: DateTime<Utc>,
    directory: &str,
    file_name: &str,
    row_count: i64,
    status: &TransformStatus,
) -> Result<()> {
    let resolved = db::country_id(pool, country).await?;
    audit::log_transform(
        pool,
        Uuid::new_v4(),
        batch_date,
        &CountryRef::from_resolution(resolved, country),
        directory,
        file_name,
        row_count,
        status,
    )
    .await
}
