//! Loader against a real SQLite warehouse

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use stock_etl::error::LoadError;
use stock_etl::loader::Loader;

use crate::common::database::fresh_warehouse;
use crate::common::logging;
use crate::common::test_data::{create_test_record, date};

#[tokio::test]
async fn test_load_creates_table_with_records() {
    logging::init_test_logging();
    let (_dir, warehouse) = fresh_warehouse();
    let loader = Loader::new(Box::new(warehouse.clone()), "stock_prices").unwrap();

    let records = vec![
        create_test_record("IBM", date(2024, 10, 10)),
        create_test_record("IBM", date(2024, 10, 9)),
    ];
    assert_eq!(loader.load(&records).await.unwrap(), 2);

    assert_eq!(warehouse.fetch_records("stock_prices").await.unwrap(), records);
}

#[tokio::test]
async fn test_each_load_replaces_previous_contents() {
    logging::init_test_logging();
    let (_dir, warehouse) = fresh_warehouse();
    let loader = Loader::new(Box::new(warehouse.clone()), "stock_prices").unwrap();

    loader
        .load(&[
            create_test_record("IBM", date(2024, 10, 8)),
            create_test_record("IBM", date(2024, 10, 7)),
            create_test_record("IBM", date(2024, 10, 6)),
        ])
        .await
        .unwrap();

    let second = vec![create_test_record("IBM", date(2024, 10, 10))];
    loader.load(&second).await.unwrap();

    assert_eq!(warehouse.fetch_records("stock_prices").await.unwrap(), second);
}

#[tokio::test]
async fn test_failed_batch_restores_previous_generation() {
    logging::init_test_logging();
    logging::log_test_step("Duplicate primary key mid-batch must roll back the whole replace");
    let (_dir, warehouse) = fresh_warehouse();
    let loader = Loader::new(Box::new(warehouse.clone()), "stock_prices").unwrap();

    let previous = vec![
        create_test_record("IBM", date(2024, 10, 10)),
        create_test_record("IBM", date(2024, 10, 9)),
    ];
    loader.load(&previous).await.unwrap();

    let duplicate = vec![
        create_test_record("IBM", date(2024, 10, 11)),
        create_test_record("IBM", date(2024, 10, 11)),
    ];
    let err = loader.load(&duplicate).await.unwrap_err();

    assert_matches!(err, LoadError::Database(_));
    assert_eq!(warehouse.fetch_records("stock_prices").await.unwrap(), previous);
}

#[tokio::test]
async fn test_failed_first_load_leaves_no_table() {
    logging::init_test_logging();
    let (_dir, warehouse) = fresh_warehouse();
    let loader = Loader::new(Box::new(warehouse.clone()), "stock_prices").unwrap();

    let duplicate = vec![
        create_test_record("IBM", date(2024, 10, 11)),
        create_test_record("IBM", date(2024, 10, 11)),
    ];
    assert!(loader.load(&duplicate).await.is_err());
    assert!(warehouse.row_count("stock_prices").await.is_err());
}

#[tokio::test]
async fn test_values_are_bound_not_interpolated() {
    logging::init_test_logging();
    let (_dir, warehouse) = fresh_warehouse();
    let loader = Loader::new(Box::new(warehouse.clone()), "stock_prices").unwrap();

    let records = vec![create_test_record("X'); DROP", date(2024, 10, 10))];
    loader.load(&records).await.unwrap();

    let stored = warehouse.fetch_records("stock_prices").await.unwrap();
    assert_eq!(stored[0].symbol, "X'); DROP");
}

#[tokio::test]
async fn test_same_date_different_symbols_allowed() {
    logging::init_test_logging();
    let (_dir, warehouse) = fresh_warehouse();
    let loader = Loader::new(Box::new(warehouse.clone()), "stock_prices").unwrap();

    loader
        .load(&[
            create_test_record("IBM", date(2024, 10, 10)),
            create_test_record("MSFT", date(2024, 10, 10)),
        ])
        .await
        .unwrap();

    assert_eq!(warehouse.row_count("stock_prices").await.unwrap(), 2);
}

#[tokio::test]
async fn test_schema_qualified_table_is_refused_up_front() {
    logging::init_test_logging();
    let (_dir, warehouse) = fresh_warehouse();

    assert_matches!(
        Loader::new(Box::new(warehouse.clone()), "raw_data.stock_prices").err(),
        Some(LoadError::InvalidTableName(ref name)) if name == "raw_data.stock_prices"
    );
    assert!(warehouse.row_count("stock_prices").await.is_err(), "nothing must be created");
}
