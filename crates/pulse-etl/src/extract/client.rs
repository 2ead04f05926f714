//! Retrying HTTP API client
//!
//! Issues one GET with bounded retries and a fixed backoff delay. Every
//! attempt, including each retry, produces exactly one API call log row;
//! attempts are never collapsed. Success means transport success AND
//! HTTP 200; any other status, 3xx and 4xx included, is a failure. Transport
//! exceptions are logged with a synthetic status of 0.

use chrono::Utc;
use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::audit;
use crate::config::EtlConfig;
use crate::db::IdCounters;
use crate::error::Result;

/// Status a transport-level failure is logged under
const TRANSPORT_FAILURE_STATUS: i64 = 0;

/// One HTTP response as seen by the pipeline
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Parse the body as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// HTTP client with bounded retries and per-attempt audit logging
#[derive(Clone)]
pub struct RetryingClient {
    http: Client,
    pool: SqlitePool,
    counters: Arc<IdCounters>,
    max_retries: u32,
    retry_delay: Duration,
}

impl RetryingClient {
    pub fn new(pool: SqlitePool, counters: Arc<IdCounters>, config: &EtlConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            pool,
            counters,
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        })
    }

    /// Issue one GET with bounded retries.
    ///
    /// Returns the last response seen (if any attempt got one) and a success
    /// flag. A `false` flag is per-country, per-source "no data this time";
    /// callers must not treat it as fatal to the batch. Audit-log write
    /// failures are reported but do not abort the attempt loop.
    pub async fn request(
        &self,
        api_id: &str,
        country: &str,
        url: &str,
        headers: Option<&[(&str, String)]>,
        params: Option<&[(&str, String)]>,
        max_retries: Option<u32>,
    ) -> (Option<ApiResponse>, bool) {
        let max_retries = max_retries.unwrap_or(self.max_retries);
        let mut attempt = 0u32;
        let mut last_response: Option<ApiResponse> = None;

        loop {
            if attempt > 0 {
                info!(attempt, api_id, country, "Retrying API call");
            }

            let start_time = Utc::now();
            let mut request = self.http.get(url);
            if let Some(headers) = headers {
                for (name, value) in headers {
                    request = request.header(*name, value);
                }
            }
            if let Some(params) = params {
                request = request.query(params);
            }

            let outcome = request.send().await;
            let end_time = Utc::now();

            match outcome {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    let success = status == 200;

                    let error_message = if success {
                        None
                    } else {
                        warn!(api_id, country, status, "API call failed");
                        Some(body.clone())
                    };

                    self.log_attempt(
                        country,
                        api_id,
                        start_time,
                        end_time,
                        i64::from(status),
                        error_message.as_deref(),
                    )
                    .await;

                    last_response = Some(ApiResponse { status, body });

                    if success {
                        return (last_response, true);
                    }
                },
                Err(e) => {
                    warn!(api_id, country, error = %e, "Request error");
                    self.log_attempt(
                        country,
                        api_id,
                        start_time,
                        end_time,
                        TRANSPORT_FAILURE_STATUS,
                        Some(&e.to_string()),
                    )
                    .await;
                },
            }

            if attempt >= max_retries {
                return (last_response, false);
            }
            attempt += 1;
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    async fn log_attempt(
        &self,
        country: &str,
        api_id: &str,
        start_time: chrono::DateTime<Utc>,
        end_time: chrono::DateTime<Utc>,
        status_code: i64,
        error_message: Option<&str>,
    ) {
        if let Err(e) = audit::log_api_call(
            &self.pool,
            &self.counters,
            country,
            api_id,
            start_time,
            end_time,
            status_code,
            error_message,
        )
        .await
        {
            error!(error = %e, api_id, country, "Error logging API call");
        }
    }
}
