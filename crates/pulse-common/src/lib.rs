//! Shared error handling and logging for the meteopulse workspace.
//!
//! Every workspace member uses this crate for:
//!
//! - **Error Handling**: the common [`PulseError`] type and [`Result`] alias
//! - **Logging**: centralized `tracing` initialization with console/file output
//! - **Files**: JSON read/write helpers for raw response artifacts

pub mod error;
pub mod fs;
pub mod logging;

pub use error::{PulseError, Result};
