//! Database layer
//!
//! Owns the SQLite pool, the schema DDL, the country dimension seed, and the
//! monotonic id counters used by the append-only logs. Schema creation and
//! country seeding happen once at startup, before any concurrent work, so
//! every later caller can assume the tables and the dimension rows exist.

pub mod statements;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::info;

use crate::countries::CountryDirectory;
use crate::error::Result;

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: crate::config::DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
        }
    }
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Open the SQLite pool, creating the database file if missing
pub async fn connect(config: &DbConfig) -> Result<SqlitePool> {
    info!(url = %config.url, "Connecting to SQLite");

    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(sqlx::Error::from)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create all permanent tables and seed the country dimension.
///
/// Seeding uses `ON CONFLICT (id) DO NOTHING` with ids assigned by the
/// directory's enumeration order (1-based), so repeated initialization is a
/// no-op. Must complete before any concurrent extraction or transform work.
pub async fn init_schema(pool: &SqlitePool, directory: &CountryDirectory) -> Result<()> {
    info!("Initializing database tables");

    for ddl in statements::SCHEMA_TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }

    for (i, country) in directory.entries().iter().enumerate() {
        sqlx::query(statements::INSERT_COUNTRY)
            .bind((i + 1) as i64)
            .bind(country.code)
            .bind(country.name)
            .execute(pool)
            .await?;
    }

    info!("Database initialized successfully");
    Ok(())
}

/// Resolve a country name to its surrogate id.
///
/// Names are lowercased before comparison. Returns `Ok(None)` for unknown
/// countries; the caller decides whether that is a skip or a hard failure.
pub async fn country_id(pool: &SqlitePool, name: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(statements::GET_COUNTRY_BY_NAME)
        .bind(name.to_lowercase())
        .fetch_optional(pool)
        .await?;

    Ok(id)
}

/// One committed weather observation
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WeatherRow {
    pub id: String,
    pub country_id: String,
    pub date: String,
    pub tavg: Option<f64>,
    pub tmin: Option<f64>,
    pub tmax: Option<f64>,
    pub prcp: Option<f64>,
    pub snow: Option<f64>,
    pub wdir: Option<f64>,
    pub wspd: Option<f64>,
    pub wpgt: Option<f64>,
    pub pres: Option<f64>,
    pub tsun: Option<f64>,
}

/// One committed covid observation
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CovidRow {
    pub id: String,
    pub country_id: String,
    pub date: String,
    pub cases: Option<i64>,
    pub deaths: Option<i64>,
    pub recovered: Option<i64>,
}

/// Most recent weather observations for a country, newest first
pub async fn latest_weather(
    pool: &SqlitePool,
    country_id: i64,
    limit: i64,
) -> Result<Vec<WeatherRow>> {
    // Fact tables store country_id as text
    let rows = sqlx::query_as(statements::GET_LATEST_WEATHER_DATA)
        .bind(country_id.to_string())
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Covid observations for a country within an inclusive date range
pub async fn covid_between(
    pool: &SqlitePool,
    country_id: i64,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<CovidRow>> {
    let rows = sqlx::query_as(statements::GET_COVID_DATA_BY_DATE_RANGE)
        .bind(country_id.to_string())
        .bind(start_date)
        .bind(end_date)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Monotonic id counters for the integer-keyed append-only logs.
///
/// Seeded once at startup from `max(id) + 1` and shared by reference across
/// concurrent tasks; ids are reserved atomically at assignment time and never
/// reused within a process lifetime.
#[derive(Debug)]
pub struct IdCounters {
    api_log: AtomicI64,
    import_log: AtomicI64,
}

impl IdCounters {
    /// Seed both counters from the current table contents
    pub async fn seed(pool: &SqlitePool) -> Result<Self> {
        let max_api: i64 = sqlx::query_scalar(statements::GET_MAX_API_LOG_ID)
            .fetch_one(pool)
            .await?;
        let max_import: i64 = sqlx::query_scalar(statements::GET_MAX_IMPORT_LOG_ID)
            .fetch_one(pool)
            .await?;

        Ok(Self {
            api_log: AtomicI64::new(max_api + 1),
            import_log: AtomicI64::new(max_import + 1),
        })
    }

    /// Reserve the next API call log id
    pub fn next_api_log_id(&self) -> i64 {
        self.api_log.fetch_add(1, Ordering::SeqCst)
    }

    /// Reserve the next file import log id
    pub fn next_import_log_id(&self) -> i64 {
        self.import_log.fetch_add(1, Ordering::SeqCst)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use testing::initialized_pool;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let pool = initialized_pool().await;
        init_schema(&pool, &CountryDirectory::default())
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM country")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_country_id_is_case_normalized() {
        let pool = initialized_pool().await;
        assert_eq!(country_id(&pool, "Greece").await.unwrap(), Some(1));
        assert_eq!(country_id(&pool, "THAILAND").await.unwrap(), Some(2));
        assert_eq!(country_id(&pool, "norway").await.unwrap(), Some(3));
        assert_eq!(country_id(&pool, "atlantis").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_counter_seeding_is_idempotent() {
        let pool = initialized_pool().await;

        sqlx::query(statements::INSERT_API_LOG)
            .bind(41_i64)
            .bind(1_i64)
            .bind("meteostat")
            .bind("2022-03-10T00:00:00")
            .bind("2022-03-10T00:00:01")
            .bind(200_i64)
            .bind(Option::<String>::None)
            .execute(&pool)
            .await
            .unwrap();

        let first = IdCounters::seed(&pool).await.unwrap();
        let second = IdCounters::seed(&pool).await.unwrap();

        assert_eq!(first.next_api_log_id(), 42);
        assert_eq!(second.next_api_log_id(), 42);
        assert_eq!(first.next_import_log_id(), 1);
    }

    #[tokio::test]
    async fn test_counter_never_reuses_ids() {
        let pool = initialized_pool().await;
        let counters = IdCounters::seed(&pool).await.unwrap();

        let a = counters.next_api_log_id();
        let b = counters.next_api_log_id();
        let c = counters.next_api_log_id();
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[tokio::test]
    async fn test_read_queries_return_committed_rows() {
        let pool = initialized_pool().await;

        for (id, date, tavg) in [("w1", "2022-03-10", 5.0), ("w2", "2022-03-11", 6.5)] {
            sqlx::query(statements::INSERT_WEATHER_DATA)
                .bind(id)
                .bind(1_i64)
                .bind(date)
                .bind(Some(tavg))
                .bind(Option::<f64>::None)
                .bind(Option::<f64>::None)
                .bind(Option::<f64>::None)
                .bind(Option::<f64>::None)
                .bind(Option::<f64>::None)
                .bind(Option::<f64>::None)
                .bind(Option::<f64>::None)
                .bind(Option::<f64>::None)
                .bind(Option::<f64>::None)
                .execute(&pool)
                .await
                .unwrap();
        }
        sqlx::query(statements::INSERT_COVID_DATA)
            .bind("c1")
            .bind(2_i64)
            .bind("2022-03-10")
            .bind(Some(100_i64))
            .bind(Some(2_i64))
            .bind(Option::<i64>::None)
            .execute(&pool)
            .await
            .unwrap();

        let weather = latest_weather(&pool, 1, 1).await.unwrap();
        assert_eq!(weather.len(), 1);
        assert_eq!(weather[0].country_id, "1");
        assert_eq!(weather[0].date, "2022-03-11");
        assert_eq!(weather[0].tavg, Some(6.5));

        let covid = covid_between(&pool, 2, "2022-03-01", "2022-03-31")
            .await
            .unwrap();
        assert_eq!(covid.len(), 1);
        assert_eq!(covid[0].country_id, "2");
        assert_eq!(covid[0].cases, Some(100));
        assert_eq!(covid[0].recovered, None);

        assert!(covid_between(&pool, 2, "2022-04-01", "2022-04-30")
            .await
            .unwrap()
            .is_empty());
    }
}
