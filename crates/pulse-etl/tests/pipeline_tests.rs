//! End-to-end transform pipeline tests
//!
//! Exercises the daily-file transform path against a real directory layout
//! and an in-memory database: validation failures, malformed files, and
//! empty months must each leave the documented audit trail behind.

use chrono::Utc;
use pulse_etl::db;
use pulse_etl::transform::{transform_batch, transform_complete_file, CovidSource, WeatherSource};
use pulse_etl::CountryDirectory;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;

async fn initialized_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init_schema(&pool, &CountryDirectory::default())
        .await
        .unwrap();
    pool
}

fn write_day_file(data_dir: &Path, source: &str, country: &str, day: &str, body: &str) {
    let dir = data_dir.join(source).join(country).join("2022-03");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{day}.json")), body).unwrap();
}

async fn transform_statuses(pool: &SqlitePool) -> Vec<(String, String, i64)> {
    sqlx::query_as(
        "SELECT processed_file_name, status, row_count FROM transform_log ORDER BY rowid",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

async fn fact_count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn valid_weather_files_load_into_fact_table() {
    let pool = initialized_pool().await;
    let data_dir = TempDir::new().unwrap();

    write_day_file(
        data_dir.path(),
        "weather",
        "greece",
        "01",
        r#"{"date": "2022-03-01", "tavg": 12.3, "wdir": 180}"#,
    );
    write_day_file(
        data_dir.path(),
        "weather",
        "greece",
        "02",
        r#"{"tavg": 13.0}"#,
    );

    let total = transform_batch(
        &pool,
        &WeatherSource::new(),
        data_dir.path(),
        "greece",
        "2022-03",
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(total, 2);
    assert_eq!(fact_count(&pool, "weather_data_import").await, 2);

    // the dateless file falls back to the file name for its date
    let dates: Vec<String> =
        sqlx::query_scalar("SELECT date FROM weather_data_import ORDER BY date")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(dates, vec!["2022-03-01", "2022-03-02"]);

    let rows = transform_statuses(&pool).await;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].0, "BATCH_PROCESS");
    assert_eq!(rows[2].1, "SUCCESS");
    assert_eq!(rows[2].2, 2);
}

#[tokio::test]
async fn out_of_range_record_is_rejected_with_detail() {
    let pool = initialized_pool().await;
    let data_dir = TempDir::new().unwrap();

    write_day_file(
        data_dir.path(),
        "weather",
        "greece",
        "01",
        r#"{"date": "2022-03-01", "wdir": 400}"#,
    );

    let total = transform_batch(
        &pool,
        &WeatherSource::new(),
        data_dir.path(),
        "greece",
        "2022-03",
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(total, 0);
    assert_eq!(fact_count(&pool, "weather_data_import").await, 0);

    let rows = transform_statuses(&pool).await;
    assert_eq!(
        rows[0].1,
        "VALIDATION_ERROR: Field 'wdir' must be between 0 and 360"
    );
    assert_eq!(rows[1].1, "NO_RECORDS_PROCESSED");
}

#[tokio::test]
async fn malformed_file_does_not_stop_the_batch() {
    let pool = initialized_pool().await;
    let data_dir = TempDir::new().unwrap();

    write_day_file(
        data_dir.path(),
        "covid",
        "thailand",
        "01",
        r#"{"date": "2022-03-01", "cases": 100, "deaths": 2, "recovered": 90}"#,
    );
    write_day_file(data_dir.path(), "covid", "thailand", "02", "not json at all");
    write_day_file(
        data_dir.path(),
        "covid",
        "thailand",
        "03",
        r#"{"date": "2022-03-03", "cases": 120, "deaths": 3, "recovered": null}"#,
    );

    let total = transform_batch(
        &pool,
        &CovidSource::new(),
        data_dir.path(),
        "thailand",
        "2022-03",
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(total, 2);
    assert_eq!(fact_count(&pool, "covid_19_data_import").await, 2);

    let rows = transform_statuses(&pool).await;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].1, "SUCCESS");
    assert!(rows[1].1.starts_with("INVALID_JSON:"), "{}", rows[1].1);
    assert_eq!(rows[2].1, "SUCCESS");
    assert_eq!(rows[3].0, "BATCH_PROCESS");
    assert_eq!(rows[3].2, 2);
}

#[tokio::test]
async fn empty_month_directory_is_recorded() {
    let pool = initialized_pool().await;
    let data_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(data_dir.path().join("covid/norway/2022-03")).unwrap();

    let total = transform_batch(
        &pool,
        &CovidSource::new(),
        data_dir.path(),
        "norway",
        "2022-03",
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(total, 0);
    let rows = transform_statuses(&pool).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "DIRECTORY");
    assert_eq!(rows[0].1, "EMPTY_DIRECTORY");
}

#[tokio::test]
async fn missing_month_directory_is_recorded() {
    let pool = initialized_pool().await;
    let data_dir = TempDir::new().unwrap();

    let total = transform_batch(
        &pool,
        &WeatherSource::new(),
        data_dir.path(),
        "norway",
        "2022-03",
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(total, 0);
    let rows = transform_statuses(&pool).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1, "NO_FILES_FOUND");
}

#[tokio::test]
async fn unknown_date_format_is_recorded() {
    let pool = initialized_pool().await;
    let data_dir = TempDir::new().unwrap();

    write_day_file(
        data_dir.path(),
        "weather",
        "greece",
        "01",
        r#"{"date": "first of March"}"#,
    );

    transform_batch(
        &pool,
        &WeatherSource::new(),
        data_dir.path(),
        "greece",
        "2022-03",
        Utc::now(),
    )
    .await
    .unwrap();

    let rows = transform_statuses(&pool).await;
    assert!(
        rows[0].1.starts_with("INVALID_DATE_FORMAT:"),
        "{}",
        rows[0].1
    );
}

#[tokio::test]
async fn staging_tables_are_gone_after_the_batch() {
    let pool = initialized_pool().await;
    let data_dir = TempDir::new().unwrap();

    write_day_file(
        data_dir.path(),
        "weather",
        "greece",
        "01",
        r#"{"date": "2022-03-01", "tavg": 10.0}"#,
    );

    transform_batch(
        &pool,
        &WeatherSource::new(),
        data_dir.path(),
        "greece",
        "2022-03",
        Utc::now(),
    )
    .await
    .unwrap();

    assert!(sqlx::query("SELECT COUNT(*) FROM temp_weather_data")
        .fetch_one(&pool)
        .await
        .is_err());
}

#[tokio::test]
async fn complete_file_loads_every_embedded_record() {
    let pool = initialized_pool().await;
    let data_dir = TempDir::new().unwrap();

    let dir = data_dir.path().join("weather").join("greece");
    std::fs::create_dir_all(&dir).unwrap();
    let file_path = dir.join("weather_data_complete_athens.json");
    std::fs::write(
        &file_path,
        r#"{"data": [
            {"date": "2022-03-01", "tavg": 12.3},
            {"date": "2022-03-02", "tavg": 13.1}
        ]}"#,
    )
    .unwrap();

    let total = transform_complete_file(
        &pool,
        &WeatherSource::new(),
        "greece",
        &file_path,
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(total, 2);
    assert_eq!(fact_count(&pool, "weather_data_import").await, 2);

    let statuses = transform_statuses(&pool).await;
    let rollup = statuses.last().unwrap();
    assert_eq!(rollup.0, "weather_data_complete_athens.json");
    assert_eq!(rollup.1, "SUCCESS");
    assert_eq!(rollup.2, 2);
}

#[tokio::test]
async fn staging_is_released_when_audit_logging_fails() {
    let pool = initialized_pool().await;
    let data_dir = TempDir::new().unwrap();

    write_day_file(
        data_dir.path(),
        "weather",
        "greece",
        "01",
        r#"{"date": "2022-03-01", "tavg": 10.0}"#,
    );

    sqlx::query("DROP TABLE transform_log")
        .execute(&pool)
        .await
        .unwrap();

    let result = transform_batch(
        &pool,
        &WeatherSource::new(),
        data_dir.path(),
        "greece",
        "2022-03",
        Utc::now(),
    )
    .await;

    assert!(result.is_err());
    assert!(sqlx::query("SELECT COUNT(*) FROM temp_weather_data")
        .fetch_one(&pool)
        .await
        .is_err());
}
