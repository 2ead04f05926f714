//! Raw response store
//!
//! Persists API payloads to disk: one pretty-printed JSON artifact per
//! complete response under `<data_dir>/<source>/<country>/`, plus one file
//! per day under `<YYYY-MM>/<DD>.json` for the transform stage. Every
//! written day file is recorded in the file import log.

use chrono::NaiveDate;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audit;
use crate::db::IdCounters;
use crate::error::Result;

/// Disk store for raw API responses
#[derive(Clone)]
pub struct RawStore {
    data_dir: PathBuf,
    pool: SqlitePool,
    counters: Arc<IdCounters>,
}

impl RawStore {
    pub fn new(data_dir: impl Into<PathBuf>, pool: SqlitePool, counters: Arc<IdCounters>) -> Self {
        Self {
            data_dir: data_dir.into(),
            pool,
            counters,
        }
    }

    /// Persist one complete API response.
    ///
    /// Returns the parsed payload together with the directory and file name
    /// it was stored under.
    pub fn save_response(
        &self,
        country: &str,
        source: &str,
        body: &str,
        file_name: &str,
    ) -> Result<(Value, String, String)> {
        let payload: Value = serde_json::from_str(body)?;

        let dir = self.data_dir.join(source).join(country);
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(file_name);
        pulse_common::fs::write_json_pretty(&path, &payload)?;

        info!(country, source, path = %path.display(), "Saved raw response");
        Ok((
            payload,
            dir.to_string_lossy().into_owned(),
            file_name.to_string(),
        ))
    }

    /// Split a weather payload into one file per day within the date range.
    ///
    /// Entries without a date or with an unparseable date are skipped with a
    /// warning; each written day file produces one import log row. Returns
    /// the number of day files written.
    pub async fn split_weather_daily(
        &self,
        country: &str,
        payload: &Value,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<i64> {
        info!(country, "Splitting weather data into daily files");
        let mut row_count = 0;

        let Some(entries) = payload.get("data").and_then(Value::as_array) else {
            warn!(country, "No 'data' field found in weather payload");
            return Ok(0);
        };

        for entry in entries {
            let Some(date_str) = entry.get("date").and_then(Value::as_str) else {
                warn!(country, "Skipping weather entry without 'date'");
                continue;
            };

            let Some(date) = parse_observation_date(date_str) else {
                warn!(country, date = date_str, "Invalid date format in weather data");
                continue;
            };

            if date < start_date || date > end_date {
                debug!(country, %date, "Weather entry outside requested range");
                continue;
            }

            self.write_day_file(country, "weather", date, entry).await?;
            row_count += 1;
        }

        Ok(row_count)
    }

    /// Split a covid payload into one file per day within the date range.
    ///
    /// Accepts both the nested `{"timeline": {...}}` shape and the unnested
    /// shape. Day keys use the upstream `m/d/yy` format; `recovered` is null
    /// when the series is absent. Returns the number of day files written.
    pub async fn split_covid_daily(
        &self,
        country: &str,
        payload: &Value,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<i64> {
        info!(country, "Splitting covid data into daily files");
        let mut row_count = 0;

        let timeline = payload.get("timeline").unwrap_or(payload);
        let Some(cases) = timeline.get("cases").and_then(Value::as_object) else {
            warn!(country, "Missing timeline or cases in covid payload");
            return Ok(0);
        };

        let has_recovered = timeline.get("recovered").is_some();

        for (date_str, case_count) in cases {
            let Ok(date) = NaiveDate::parse_from_str(date_str, "%m/%d/%y") else {
                warn!(country, date = %date_str, "Invalid covid date format");
                continue;
            };

            if date < start_date || date > end_date {
                continue;
            }

            let daily = json!({
                "date": date.format("%Y-%m-%d").to_string(),
                "cases": case_count,
                "deaths": timeline
                    .get("deaths")
                    .and_then(|d| d.get(date_str))
                    .cloned()
                    .unwrap_or(json!(0)),
                "recovered": if has_recovered {
                    timeline
                        .get("recovered")
                        .and_then(|r| r.get(date_str))
                        .cloned()
                        .unwrap_or(json!(0))
                } else {
                    Value::Null
                },
            });

            self.write_day_file(country, "covid", date, &daily).await?;
            row_count += 1;
        }

        Ok(row_count)
    }

    async fn write_day_file(
        &self,
        country: &str,
        source: &str,
        date: NaiveDate,
        payload: &Value,
    ) -> Result<()> {
        let month_dir = self
            .data_dir
            .join(source)
            .join(country)
            .join(date.format("%Y-%m").to_string());
        std::fs::create_dir_all(&month_dir)?;

        let file_name = format!("{}.json", date.format("%d"));
        let path = month_dir.join(&file_name);
        pulse_common::fs::write_json_pretty(&path, payload)?;

        debug!(country, source, %date, "Saved daily file");
        audit::log_file_import(
            &self.pool,
            &self.counters,
            country,
            &month_dir.to_string_lossy(),
            &file_name,
            1,
        )
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn counters(&self) -> &IdCounters {
        &self.counters
    }
}

/// Weather observation dates arrive either with or without a time component
fn parse_observation_date(value: &str) -> Option<NaiveDate> {
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::initialized_pool;
    use std::path::Path;
    use tempfile::TempDir;

    async fn store_with(dir: &TempDir) -> RawStore {
        let pool = initialized_pool().await;
        let counters = Arc::new(IdCounters::seed(&pool).await.unwrap());
        RawStore::new(dir.path(), pool, counters)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_save_response_writes_pretty_json() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir).await;

        let (payload, saved_dir, file_name) = store
            .save_response("greece", "weather", r#"{"data":[]}"#, "complete.json")
            .unwrap();

        assert_eq!(payload, json!({"data": []}));
        assert_eq!(file_name, "complete.json");
        let written = std::fs::read_to_string(Path::new(&saved_dir).join(&file_name)).unwrap();
        assert!(written.contains('\n'), "payload should be pretty-printed");
    }

    #[tokio::test]
    async fn test_split_weather_daily_writes_range_only() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir).await;

        let payload = json!({
            "data": [
                {"date": "2022-03-10", "tavg": 5.0},
                {"date": "2022-03-11 00:00:00", "tavg": 6.0},
                {"date": "2022-04-01", "tavg": 9.0},
                {"tavg": 1.0},
            ]
        });

        let count = store
            .split_weather_daily("norway", &payload, date("2022-03-01"), date("2022-03-31"))
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert!(dir.path().join("weather/norway/2022-03/10.json").exists());
        assert!(dir.path().join("weather/norway/2022-03/11.json").exists());
        assert!(!dir.path().join("weather/norway/2022-04").exists());
    }

    #[tokio::test]
    async fn test_split_covid_daily_handles_nested_timeline() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir).await;

        let payload = json!({
            "timeline": {
                "cases": {"3/10/22": 100, "3/11/22": 120},
                "deaths": {"3/10/22": 2},
                "recovered": {"3/10/22": 50},
            }
        });

        let count = store
            .split_covid_daily("greece", &payload, date("2022-03-10"), date("2022-03-10"))
            .await
            .unwrap();

        assert_eq!(count, 1);
        let day: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("covid/greece/2022-03/10.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(day["date"], "2022-03-10");
        assert_eq!(day["cases"], 100);
        assert_eq!(day["deaths"], 2);
        assert_eq!(day["recovered"], 50);
    }

    #[tokio::test]
    async fn test_split_covid_daily_without_recovered_series() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir).await;

        let payload = json!({
            "cases": {"3/10/22": 7},
            "deaths": {"3/10/22": 0},
        });

        let count = store
            .split_covid_daily("thailand", &payload, date("2022-03-10"), date("2022-03-10"))
            .await
            .unwrap();
        assert_eq!(count, 1);

        let day: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("covid/thailand/2022-03/10.json")).unwrap(),
        )
        .unwrap();
        assert!(day["recovered"].is_null());
    }

    #[tokio::test]
    async fn test_day_files_are_logged_as_imports() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir).await;

        let payload = json!({"data": [{"date": "2022-03-10", "tavg": 5.0}]});
        store
            .split_weather_daily("greece", &payload, date("2022-03-10"), date("2022-03-10"))
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM import_log")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
