//! Staged record loading
//!
//! Every validated record passes through a per-source staging table before
//! the fact insert, and every outcome, success or failure, produces exactly
//! one transform log row. Staging tables are ordinary tables created at
//! batch start and dropped at batch end so they stay visible across pooled
//! connections.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::audit::{self, CountryRef, TransformStatus};
use crate::db::{self, statements};
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Float,
    Integer,
}

/// Table and column layout for one data source
pub struct SourceTables {
    pub source: &'static str,
    pub staging_create: &'static str,
    pub staging_drop: &'static str,
    pub staging_insert: &'static str,
    pub fact_insert: &'static str,
    pub metrics: &'static [(&'static str, FieldKind)],
}

pub const WEATHER_TABLES: SourceTables = SourceTables {
    source: "weather",
    staging_create: statements::CREATE_TEMP_WEATHER_TABLE,
    staging_drop: statements::DROP_TEMP_WEATHER_TABLE,
    staging_insert: statements::INSERT_TEMP_WEATHER_DATA,
    fact_insert: statements::INSERT_WEATHER_DATA,
    metrics: &[
        ("tavg", FieldKind::Float),
        ("tmin", FieldKind::Float),
        ("tmax", FieldKind::Float),
        ("prcp", FieldKind::Float),
        ("snow", FieldKind::Float),
        ("wdir", FieldKind::Float),
        ("wspd", FieldKind::Float),
        ("wpgt", FieldKind::Float),
        ("pres", FieldKind::Float),
        ("tsun", FieldKind::Float),
    ],
};

pub const COVID_TABLES: SourceTables = SourceTables {
    source: "covid",
    staging_create: statements::CREATE_TEMP_COVID_TABLE,
    staging_drop: statements::DROP_TEMP_COVID_TABLE,
    staging_insert: statements::INSERT_TEMP_COVID_DATA,
    fact_insert: statements::INSERT_COVID_DATA,
    metrics: &[
        ("cases", FieldKind::Integer),
        ("deaths", FieldKind::Integer),
        ("recovered", FieldKind::Integer),
    ],
};

/// Scoped staging table for one batch.
///
/// Acquire creates the staging table, release drops it. Release is an
/// explicit call rather than a Drop impl because dropping the table is an
/// async database operation whose failure the batch needs to see.
pub struct StagingContext<'a> {
    pool: &'a SqlitePool,
    tables: &'a SourceTables,
}

impl<'a> StagingContext<'a> {
    pub async fn acquire(pool: &'a SqlitePool, tables: &'a SourceTables) -> Result<Self> {
        sqlx::query(tables.staging_create).execute(pool).await?;
        debug!(source = tables.source, "Created staging table");
        Ok(Self { pool, tables })
    }

    pub async fn release(self) -> Result<()> {
        sqlx::query(self.tables.staging_drop)
            .execute(self.pool)
            .await?;
        debug!(source = self.tables.source, "Dropped staging table");
        Ok(())
    }

    /// Load one validated record through staging into the fact table.
    ///
    /// Writes exactly one transform log row describing the outcome and
    /// returns whether a fact row was committed. Per-record database
    /// failures are recorded, not propagated; only audit log failures
    /// bubble up.
    #[allow(clippy::too_many_arguments)]
    pub async fn load_record(
        &self,
        record: &Value,
        country: &str,
        transform_id: Uuid,
        batch_date: DateTime<Utc>,
        directory: &str,
        file_name: &str,
    ) -> Result<bool> {
        let record_id = Uuid::new_v4().to_string();
        let date = record.get("date").and_then(Value::as_str).unwrap_or_default();

        if let Err(e) = self.insert_staging(&record_id, country, date, record).await {
            let resolved = db::country_id(self.pool, country).await?;
            audit::log_transform(
                self.pool,
                transform_id,
                batch_date,
                &CountryRef::from_resolution(resolved, country),
                directory,
                file_name,
                0,
                &TransformStatus::DbErrorTmp(e.to_string()),
            )
            .await?;
            return Ok(false);
        }

        let Some(country_id) = db::country_id(self.pool, country).await? else {
            audit::log_transform(
                self.pool,
                transform_id,
                batch_date,
                &CountryRef::Name(country.to_string()),
                directory,
                file_name,
                0,
                &TransformStatus::CountryNotFound,
            )
            .await?;
            return Ok(false);
        };

        if let Err(e) = self.insert_fact(&record_id, country_id, date, record).await {
            audit::log_transform(
                self.pool,
                transform_id,
                batch_date,
                &CountryRef::Id(country_id),
                directory,
                file_name,
                0,
                &TransformStatus::DbInsertError(e.to_string()),
            )
            .await?;
            return Ok(false);
        }

        audit::log_transform(
            self.pool,
            transform_id,
            batch_date,
            &CountryRef::Id(country_id),
            directory,
            file_name,
            1,
            &TransformStatus::Success,
        )
        .await?;
        Ok(true)
    }

    async fn insert_staging(
        &self,
        record_id: &str,
        country: &str,
        date: &str,
        record: &Value,
    ) -> sqlx::Result<()> {
        let mut query = sqlx::query(self.tables.staging_insert)
            .bind(record_id)
            .bind(country)
            .bind(date);
        query = bind_metrics(query, self.tables.metrics, record);
        query.execute(self.pool).await?;
        Ok(())
    }

    async fn insert_fact(
        &self,
        record_id: &str,
        country_id: i64,
        date: &str,
        record: &Value,
    ) -> sqlx::Result<()> {
        let mut query = sqlx::query(self.tables.fact_insert)
            .bind(record_id)
            .bind(country_id)
            .bind(date);
        query = bind_metrics(query, self.tables.metrics, record);
        query.execute(self.pool).await?;
        Ok(())
    }
}

type SqliteQuery<'q> =
    sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_metrics<'q>(
    mut query: SqliteQuery<'q>,
    metrics: &[(&'static str, FieldKind)],
    record: &Value,
) -> SqliteQuery<'q> {
    for (field, kind) in metrics {
        query = match kind {
            FieldKind::Float => query.bind(record.get(*field).and_then(Value::as_f64)),
            FieldKind::Integer => query.bind(record.get(*field).and_then(Value::as_i64)),
        };
    }
    query
}
