//! Audit data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome tag for one transform-log row.
///
/// Rendered by [`TransformStatus::render`] at the audit-log boundary; call
/// sites never format their own status strings.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformStatus {
    Success,
    NoRecordsProcessed,
    NoFilesFound,
    EmptyDirectory,
    ValidationError(String),
    InvalidJson(String),
    InvalidDateFormat(String),
    InvalidDateFromFilename(String),
    DbErrorTmp(String),
    CountryNotFound,
    DbInsertError(String),
    UnexpectedError(String),
}

impl TransformStatus {
    /// Render to the stored status tag
    pub fn render(&self) -> String {
        match self {
            Self::Success => "SUCCESS".to_string(),
            Self::NoRecordsProcessed => "NO_RECORDS_PROCESSED".to_string(),
            Self::NoFilesFound => "NO_FILES_FOUND".to_string(),
            Self::EmptyDirectory => "EMPTY_DIRECTORY".to_string(),
            Self::ValidationError(detail) => format!("VALIDATION_ERROR: {}", detail),
            Self::InvalidJson(detail) => format!("INVALID_JSON: {}", detail),
            Self::InvalidDateFormat(detail) => format!("INVALID_DATE_FORMAT: {}", detail),
            Self::InvalidDateFromFilename(detail) => {
                format!("INVALID_DATE_FROM_FILENAME: {}", detail)
            },
            Self::DbErrorTmp(detail) => format!("DB_ERROR_TMP: {}", detail),
            Self::CountryNotFound => "COUNTRY_NOT_FOUND".to_string(),
            Self::DbInsertError(detail) => format!("DB_INSERT_ERROR: {}", detail),
            Self::UnexpectedError(detail) => format!("UNEXPECTED_ERROR: {}", detail),
        }
    }
}

impl std::fmt::Display for TransformStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Country reference stored in the string-typed transform-log column:
/// the surrogate id when resolution succeeded, the raw name otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum CountryRef {
    Id(i64),
    Name(String),
}

impl CountryRef {
    pub fn from_resolution(id: Option<i64>, name: &str) -> Self {
        match id {
            Some(id) => Self::Id(id),
            None => Self::Name(name.to_string()),
        }
    }

    pub fn as_column(&self) -> String {
        match self {
            Self::Id(id) => id.to_string(),
            Self::Name(name) => name.clone(),
        }
    }
}

/// Severity of a structured ETL error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Enumerated ETL error codes, grouped by origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    FileNotFound,
    FileAccessDenied,
    FileCorrupted,
    InvalidDateFormat,
    MissingRequiredField,
    InvalidDataType,
    DataOutOfRange,
    DbConnectionError,
    DbQueryError,
    DbTransactionError,
    ProcessTimeout,
    ProcessInterrupted,
    UnknownError,
}

impl ErrorCode {
    /// Stable numeric code stored in the `error_code` column
    pub fn code(&self) -> i64 {
        match self {
            Self::FileNotFound => 1001,
            Self::FileAccessDenied => 1002,
            Self::FileCorrupted => 1003,
            Self::InvalidDateFormat => 2001,
            Self::MissingRequiredField => 2002,
            Self::InvalidDataType => 2003,
            Self::DataOutOfRange => 2004,
            Self::DbConnectionError => 3001,
            Self::DbQueryError => 3002,
            Self::DbTransactionError => 3003,
            Self::ProcessTimeout => 4001,
            Self::ProcessInterrupted => 4002,
            Self::UnknownError => 9999,
        }
    }

    /// Type name stored in the `error_type` column
    pub fn name(&self) -> &'static str {
        match self {
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::FileAccessDenied => "FILE_ACCESS_DENIED",
            Self::FileCorrupted => "FILE_CORRUPTED",
            Self::InvalidDateFormat => "INVALID_DATE_FORMAT",
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::InvalidDataType => "INVALID_DATA_TYPE",
            Self::DataOutOfRange => "DATA_OUT_OF_RANGE",
            Self::DbConnectionError => "DB_CONNECTION_ERROR",
            Self::DbQueryError => "DB_QUERY_ERROR",
            Self::DbTransactionError => "DB_TRANSACTION_ERROR",
            Self::ProcessTimeout => "PROCESS_TIMEOUT",
            Self::ProcessInterrupted => "PROCESS_INTERRUPTED",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

/// One structured ETL error, immutable after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: Uuid,
    pub code: ErrorCode,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub component: String,
    pub source_file: Option<String>,
    pub record_id: Option<String>,
    pub details: Option<String>,
}

impl ErrorRecord {
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        severity: Severity,
        component: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            message: message.into(),
            timestamp: Utc::now(),
            severity,
            component: component.into(),
            source_file: None,
            record_id: None,
            details: None,
        }
    }

    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Emit through tracing at the level matching the severity
    pub fn log(&self) {
        let rendered = match &self.source_file {
            Some(source) => format!("[{}] {} (Source: {})", self.code.name(), self.message, source),
            None => format!("[{}] {}", self.code.name(), self.message),
        };

        match self.severity {
            Severity::Info => tracing::info!(component = %self.component, "{}", rendered),
            Severity::Warning => tracing::warn!(component = %self.component, "{}", rendered),
            Severity::Error | Severity::Critical => {
                tracing::error!(component = %self.component, severity = %self.severity, "{}", rendered)
            },
        }
    }
}
