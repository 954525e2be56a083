//! End-to-end runs: mocked Alpha Vantage endpoint into a SQLite warehouse

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use stock_etl::api::AlphaVantageClient;
use stock_etl::database::{connection_env_var, SqliteWarehouse};
use stock_etl::error::{FetchError, PipelineError};
use stock_etl::models::{Config, DailyRecord};
use stock_etl::pipeline::{run_workflow, Pipeline, WorkflowDefinition};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::database::fresh_warehouse;
use crate::common::logging;
use crate::common::test_data::date;

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::new("test_key", "test_conn");
    config.api_base_url = format!("{}/query", server.uri());
    config.http_timeout = Duration::from_secs(5);
    config
}

fn pipeline_for(config: &Config, warehouse: &SqliteWarehouse) -> Pipeline {
    let client = AlphaVantageClient::new(config).unwrap();
    Pipeline::new(config, Box::new(client), Box::new(warehouse.clone())).unwrap()
}

fn workflow() -> WorkflowDefinition {
    WorkflowDefinition::stock_etl().with_retry_delay(Duration::ZERO)
}

async fn mount_document(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("function", "TIME_SERIES_DAILY"))
        .and(query_param("symbol", "IBM"))
        .and(query_param("apikey", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_day_document_end_to_end() {
    logging::init_test_logging();
    logging::log_test_step("Two dated entries end up as exactly two rows");

    let server = MockServer::start().await;
    mount_document(
        &server,
        json!({
            "Time Series (Daily)": {
                "2024-10-10": {
                    "1. open": "100.1", "2. high": "101.0", "3. low": "99.5",
                    "4. close": "100.8", "5. volume": "12345"
                },
                "2024-10-09": {
                    "1. open": "99.0", "2. high": "100.5", "3. low": "98.7",
                    "4. close": "100.0", "5. volume": "23456"
                }
            }
        }),
    )
    .await;

    let (_dir, warehouse) = fresh_warehouse();
    let config = config_for(&server);
    let pipeline = pipeline_for(&config, &warehouse);

    let (_, summary) = run_workflow(&workflow(), &pipeline, false).await.unwrap();
    assert_eq!(summary.loaded, Some(2));

    assert_eq!(
        warehouse.fetch_records("stock_prices").await.unwrap(),
        vec![
            DailyRecord {
                open: 100.1,
                high: 101.0,
                low: 99.5,
                close: 100.8,
                volume: 12345,
                date: date(2024, 10, 10),
                symbol: "IBM".to_string(),
            },
            DailyRecord {
                open: 99.0,
                high: 100.5,
                low: 98.7,
                close: 100.0,
                volume: 23456,
                date: date(2024, 10, 9),
                symbol: "IBM".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_full_compact_response_is_capped() {
    logging::init_test_logging();

    let server = MockServer::start().await;
    mount_document(&server, crate::common::test_data::daily_series_document(100)).await;

    let (_dir, warehouse) = fresh_warehouse();
    let config = config_for(&server);
    let pipeline = pipeline_for(&config, &warehouse);

    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.records, 90);
    assert_eq!(warehouse.row_count("stock_prices").await.unwrap(), 90);
}

#[tokio::test]
async fn test_api_error_document_empties_table() {
    logging::init_test_logging();

    let server = MockServer::start().await;
    mount_document(&server, json!({ "Error Message": "Invalid API call." })).await;

    let (_dir, warehouse) = fresh_warehouse();
    let config = config_for(&server);
    let pipeline = pipeline_for(&config, &warehouse);

    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.records, 0);
    assert_eq!(warehouse.row_count("stock_prices").await.unwrap(), 0);
}

#[tokio::test]
async fn test_server_error_fails_fetch_and_keeps_table() {
    logging::init_test_logging();

    let good = MockServer::start().await;
    mount_document(&good, crate::common::test_data::daily_series_document(5)).await;

    let (_dir, warehouse) = fresh_warehouse();
    pipeline_for(&config_for(&good), &warehouse).run().await.unwrap();

    let bad = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(2)
        .mount(&bad)
        .await;

    let err = run_workflow(&workflow(), &pipeline_for(&config_for(&bad), &warehouse), false)
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::Fetch(FetchError::Status { status: 500, .. }));
    assert_eq!(warehouse.row_count("stock_prices").await.unwrap(), 5);
}

#[tokio::test]
async fn test_warehouse_resolved_from_connection_id() {
    logging::init_test_logging();

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("resolved.db");
    let conn_id = "pipeline_integration_conn";
    std::env::set_var(connection_env_var(conn_id), format!("sqlite:{}", db_path.display()));

    let server = MockServer::start().await;
    mount_document(&server, crate::common::test_data::daily_series_document(3)).await;

    let mut config = config_for(&server);
    config.conn_id = conn_id.to_string();
    let warehouse = SqliteWarehouse::from_conn_id(&config.conn_id).unwrap();
    pipeline_for(&config, &warehouse).run().await.unwrap();

    let reopened = SqliteWarehouse::new(db_path.to_str().unwrap()).unwrap();
    assert_eq!(reopened.row_count("stock_prices").await.unwrap(), 3);
}
