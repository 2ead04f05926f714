//! Extraction stage
//!
//! Pulls raw observations from the upstream APIs through a retrying client,
//! persists each response as a JSON artifact, and splits payloads into one
//! file per day for the transform stage. Failures are recorded per country
//! and source; a failed extraction means "no data available right now", not
//! a fatal error for the batch.

pub mod client;
pub mod covid;
pub mod store;
pub mod weather;

pub use client::{ApiResponse, RetryingClient};
pub use covid::CovidExtractor;
pub use store::RawStore;
pub use weather::WeatherExtractor;
