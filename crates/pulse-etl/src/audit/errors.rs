//! Structured ETL error collection
//!
//! [`ErrorManager`] appends every error to an in-process list for synchronous
//! introspection and mirrors it to the durable `etl_errors` table, in that
//! order. A persistence failure is reported through tracing but never
//! re-raised, so it cannot mask the original error.

use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::error;

use super::models::{ErrorCode, ErrorRecord, Severity};
use crate::db::statements;

/// Aggregated error counts by severity and component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorSummary {
    pub total: usize,
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub critical: usize,
    pub by_component: HashMap<String, usize>,
}

/// Collector for structured ETL errors, shared across concurrent stages
pub struct ErrorManager {
    pool: Option<SqlitePool>,
    errors: Mutex<Vec<ErrorRecord>>,
}

impl ErrorManager {
    /// Create a manager; without a pool errors are kept in memory only
    pub fn new(pool: Option<SqlitePool>) -> Self {
        Self {
            pool,
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Record an error: append to the in-process list, emit through tracing,
    /// then persist. Returns a clone of the stored record.
    pub async fn add(&self, record: ErrorRecord) -> ErrorRecord {
        record.log();

        {
            let mut errors = self.errors.lock().expect("error list poisoned");
            errors.push(record.clone());
        }

        if let Some(pool) = &self.pool {
            if let Err(e) = self.persist(pool, &record).await {
                error!(error = %e, error_id = %record.id, "Failed to store error in database");
            }
        }

        record
    }

    /// Convenience constructor + [`ErrorManager::add`]
    pub async fn report(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
        severity: Severity,
        component: impl Into<String>,
    ) -> ErrorRecord {
        self.add(ErrorRecord::new(code, message, severity, component))
            .await
    }

    async fn persist(&self, pool: &SqlitePool, record: &ErrorRecord) -> sqlx::Result<()> {
        sqlx::query(statements::INSERT_ETL_ERROR)
            .bind(record.id.to_string())
            .bind(record.code.code())
            .bind(record.code.name())
            .bind(&record.message)
            .bind(record.timestamp)
            .bind(record.severity.as_str())
            .bind(&record.component)
            .bind(&record.source_file)
            .bind(&record.record_id)
            .bind(&record.details)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Errors matching all of the given filters
    pub fn errors(
        &self,
        severity: Option<Severity>,
        component: Option<&str>,
        code: Option<ErrorCode>,
    ) -> Vec<ErrorRecord> {
        let errors = self.errors.lock().expect("error list poisoned");
        errors
            .iter()
            .filter(|e| severity.is_none_or(|s| e.severity == s))
            .filter(|e| component.is_none_or(|c| e.component == c))
            .filter(|e| code.is_none_or(|c| e.code == c))
            .cloned()
            .collect()
    }

    /// Whether any recorded error is critical
    pub fn has_critical_errors(&self) -> bool {
        let errors = self.errors.lock().expect("error list poisoned");
        errors.iter().any(|e| e.severity == Severity::Critical)
    }

    /// Counts by severity and by component
    pub fn summary(&self) -> ErrorSummary {
        let errors = self.errors.lock().expect("error list poisoned");
        let mut summary = ErrorSummary {
            total: errors.len(),
            ..Default::default()
        };

        for e in errors.iter() {
            match e.severity {
                Severity::Info => summary.info += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Error => summary.error += 1,
                Severity::Critical => summary.critical += 1,
            }
            *summary.by_component.entry(e.component.clone()).or_insert(0) += 1;
        }

        summary
    }
}
