//! Audit trail module
//!
//! Append-only writers over four streams: API call attempts, file imports,
//! transform outcomes, and structured ETL errors. Every write is a pure
//! insert with a caller-supplied identifier; nothing here updates a row.
//!
//! The structured error stream additionally keeps an in-process list for
//! synchronous introspection (filtering, severity summaries) alongside the
//! durable `etl_errors` table.

mod errors;
mod log;
mod models;

pub use errors::{ErrorManager, ErrorSummary};
pub use log::{log_api_call, log_file_import, log_transform};
pub use models::{CountryRef, ErrorCode, ErrorRecord, Severity, TransformStatus};
