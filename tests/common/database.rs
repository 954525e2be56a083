//! Throwaway SQLite warehouses for tests

use stock_etl::database::SqliteWarehouse;
use tempfile::TempDir;

/// Fresh warehouse file in its own temp directory (deleted when the guard drops)
pub fn fresh_warehouse() -> (TempDir, SqliteWarehouse) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("warehouse.db");
    let warehouse = SqliteWarehouse::new(path.to_str().unwrap()).expect("Failed to open warehouse");
    (temp_dir, warehouse)
}
