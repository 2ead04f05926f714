//! Staged transform-and-load pipeline for daily weather and epidemiological
//! time-series.
//!
//! The pipeline pulls per-country observations from two upstream HTTP APIs,
//! persists raw responses to disk, and loads cleaned, validated records into
//! an embedded SQLite store with full audit trails of every API call, file
//! import, and transform attempt.
//!
//! Data flow:
//!
//! ```text
//! upstream API -> extract::client -> extract::store (disk)
//!              -> transform::validate -> transform::loader
//!              -> fact tables + transform log
//! ```
//!
//! Every stage also writes to the audit log regardless of outcome; one bad
//! record, file, or country never aborts the enclosing batch.

pub mod audit;
pub mod config;
pub mod countries;
pub mod db;
pub mod error;
pub mod extract;
pub mod transform;

pub use config::EtlConfig;
pub use countries::CountryDirectory;
pub use error::{EtlError, Result};
