//! Integration tests for the retrying API client
//!
//! Verifies the retry loop against a live mock server: every attempt must
//! produce exactly one API call log row, success requires HTTP 200, and
//! transport failures are recorded with a synthetic status of 0.

use chrono::NaiveDate;
use pulse_etl::db::{self, IdCounters};
use pulse_etl::audit::ErrorManager;
use pulse_etl::extract::{RawStore, RetryingClient, WeatherExtractor};
use pulse_etl::{CountryDirectory, EtlConfig};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> EtlConfig {
    EtlConfig {
        rapidapi_key: "test-key".to_string(),
        max_retries: 3,
        retry_delay_secs: 0,
        request_timeout_secs: 5,
        max_workers: 2,
        data_dir: "data".to_string(),
        database_url: "sqlite::memory:".to_string(),
        start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
    }
}

async fn initialized_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init_schema(&pool, &CountryDirectory::default())
        .await
        .unwrap();
    pool
}

async fn client_for(pool: &SqlitePool) -> RetryingClient {
    let counters = Arc::new(IdCounters::seed(pool).await.unwrap());
    RetryingClient::new(pool.clone(), counters, &test_config()).unwrap()
}

async fn api_log_rows(pool: &SqlitePool) -> Vec<(i64, i64, Option<String>)> {
    sqlx::query_as("SELECT id, code_response, error_messages FROM api_import_log ORDER BY id")
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn successful_call_logs_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/daily"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data": []}"#))
        .mount(&server)
        .await;

    let pool = initialized_pool().await;
    let client = client_for(&pool).await;

    let (response, success) = client
        .request(
            "meteostat",
            "greece",
            &format!("{}/daily", server.uri()),
            None,
            None,
            None,
        )
        .await;

    assert!(success);
    let response = response.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap(), serde_json::json!({"data": []}));

    let rows = api_log_rows(&pool).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1, 200);
    assert_eq!(rows[0].2, None);
}

#[tokio::test]
async fn persistent_failure_logs_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/daily"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let pool = initialized_pool().await;
    let client = client_for(&pool).await;

    let (response, success) = client
        .request(
            "meteostat",
            "greece",
            &format!("{}/daily", server.uri()),
            None,
            None,
            Some(2),
        )
        .await;

    assert!(!success);
    assert_eq!(response.unwrap().status, 503);

    // initial attempt plus two retries
    let rows = api_log_rows(&pool).await;
    assert_eq!(rows.len(), 3);
    for (_, code, message) in &rows {
        assert_eq!(*code, 503);
        assert_eq!(message.as_deref(), Some("upstream unavailable"));
    }
}

#[tokio::test]
async fn non_200_success_status_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/daily"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let pool = initialized_pool().await;
    let client = client_for(&pool).await;

    let (response, success) = client
        .request(
            "disease.sh",
            "norway",
            &format!("{}/daily", server.uri()),
            None,
            None,
            Some(0),
        )
        .await;

    assert!(!success);
    assert_eq!(response.unwrap().status, 204);
    assert_eq!(api_log_rows(&pool).await.len(), 1);
}

#[tokio::test]
async fn transport_failure_logs_status_zero() {
    let pool = initialized_pool().await;
    let client = client_for(&pool).await;

    // nothing listens on this port
    let (response, success) = client
        .request(
            "meteostat",
            "thailand",
            "http://127.0.0.1:1/daily",
            None,
            None,
            Some(1),
        )
        .await;

    assert!(!success);
    assert!(response.is_none());

    let rows = api_log_rows(&pool).await;
    assert_eq!(rows.len(), 2);
    for (_, code, message) in &rows {
        assert_eq!(*code, 0);
        assert!(message.is_some());
    }
}

#[tokio::test]
async fn recovery_after_retry_reports_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/daily"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/daily"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let pool = initialized_pool().await;
    let client = client_for(&pool).await;

    let (response, success) = client
        .request(
            "meteostat",
            "greece",
            &format!("{}/daily", server.uri()),
            None,
            None,
            None,
        )
        .await;

    assert!(success);
    assert_eq!(response.unwrap().status, 200);

    let rows = api_log_rows(&pool).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].1, 503);
    assert_eq!(rows[1].1, 200);
}

#[tokio::test]
async fn missing_api_key_fails_weather_at_call_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/point/daily"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message": "invalid key"}"#))
        .mount(&server)
        .await;

    let pool = initialized_pool().await;
    let counters = Arc::new(IdCounters::seed(&pool).await.unwrap());
    let config = Arc::new(EtlConfig {
        rapidapi_key: String::new(),
        max_retries: 0,
        ..test_config()
    });
    let client = RetryingClient::new(pool.clone(), Arc::clone(&counters), &config).unwrap();
    let store = RawStore::new(&config.data_dir, pool.clone(), Arc::clone(&counters));
    let extractor = WeatherExtractor::new(
        client,
        store,
        Arc::new(CountryDirectory::default()),
        Arc::clone(&config),
        Arc::new(ErrorManager::new(None)),
    )
    .with_endpoint(format!("{}/point/daily", server.uri()));

    let fetched = extractor.extract_for_country("greece").await.unwrap();
    assert!(!fetched);

    let rows = api_log_rows(&pool).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1, 401);
}
