//! All-or-nothing replacement of the destination table.
//!
//! One load runs inside a single explicit transaction: the table is dropped and
//! recreated, every record is inserted with bound parameters, then the
//! transaction commits. Any failure after `BEGIN` issues `ROLLBACK` and returns
//! the original error, so no partial batch is ever visible.
//!
//! The drop/recreate shares the transaction with the inserts. That only restores
//! the previous table on failure where DDL is transactional (SQLite, Postgres).
//! Warehouses that auto-commit DDL (Snowflake's `CREATE OR REPLACE`) would be left
//! with an empty table instead.

use tracing::{error, info};

use crate::database::{validate_table_name, Cursor, SqlValue, Statement, Warehouse};
use crate::error::LoadError;
use crate::models::DailyRecord;

/// Loads a result set into the destination table
pub struct Loader {
    warehouse: Box<dyn Warehouse>,
    table: String,
}

impl Loader {
    pub fn new(warehouse: Box<dyn Warehouse>, table: &str) -> Result<Self, LoadError> {
        validate_table_name(table)?;
        Ok(Self {
            warehouse,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Replace the destination table with `records`, returning the rows inserted
    pub async fn load(&self, records: &[DailyRecord]) -> Result<usize, LoadError> {
        let mut cursor = self.warehouse.connect().await?;

        cursor.execute(&Statement::begin()).await?;

        // A failed COMMIT leaves the transaction open and takes the rollback path too
        let outcome = match self.replace_table(cursor.as_mut(), records).await {
            Ok(inserted) => cursor.execute(&Statement::commit()).await.map(|_| inserted),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(inserted) => {
                info!("💾 Loaded {} records into {}", inserted, self.table);
                Ok(inserted)
            }
            Err(e) => {
                error!("❌ Load into {} failed, rolling back: {}", self.table, e);
                if let Err(rollback) = cursor.execute(&Statement::rollback()).await {
                    error!("Rollback of {} failed: {}", self.table, rollback);
                    return Err(LoadError::Rollback {
                        source: Box::new(e),
                        rollback: Box::new(rollback),
                    });
                }
                Err(e)
            }
        }
    }

    async fn replace_table(&self, cursor: &mut dyn Cursor, records: &[DailyRecord]) -> Result<usize, LoadError> {
        cursor.execute(&recreate_table_statement(&self.table)).await?;

        let insert_sql = insert_sql(&self.table);
        for record in records {
            cursor
                .execute(&Statement::with_params(insert_sql.clone(), record_params(record)))
                .await?;
        }

        Ok(records.len())
    }
}

/// Drop and recreate the destination table with its fixed 7-column schema
pub fn recreate_table_statement(table: &str) -> Statement {
    Statement::raw(format!(
        r#"DROP TABLE IF EXISTS {table};
CREATE TABLE {table} (
    "open" FLOAT,
    "high" FLOAT,
    "low" FLOAT,
    "close" FLOAT,
    "volume" INT,
    "date" DATE,
    "symbol" VARCHAR(20),
    PRIMARY KEY ("date", "symbol")
)"#
    ))
}

fn insert_sql(table: &str) -> String {
    format!(
        r#"INSERT INTO {} ("open", "high", "low", "close", "volume", "date", "symbol") VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        table
    )
}

fn record_params(record: &DailyRecord) -> Vec<SqlValue> {
    vec![
        SqlValue::Float(record.open),
        SqlValue::Float(record.high),
        SqlValue::Float(record.low),
        SqlValue::Float(record.close),
        SqlValue::Int(record.volume),
        SqlValue::Date(record.date),
        SqlValue::Text(record.symbol.clone()),
    ]
}
