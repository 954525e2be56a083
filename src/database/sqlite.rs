use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Row};
use std::str::FromStr;
use tracing::debug;

use super::{validate_table_name, Cursor, SqlValue, Statement, Warehouse};
use crate::error::LoadError;
use crate::models::DailyRecord;

/// Environment variable holding the warehouse URL for a connection identifier
pub fn connection_env_var(conn_id: &str) -> String {
    format!("STOCK_ETL_CONN_{}", conn_id.to_uppercase())
}

/// SQLite-backed warehouse; every `connect` opens a new, unpooled connection
#[derive(Debug, Clone)]
pub struct SqliteWarehouse {
    options: SqliteConnectOptions,
}

impl SqliteWarehouse {
    /// Accepts either a `sqlite:` URL or a plain file path
    pub fn new(database_url: &str) -> Result<Self, LoadError> {
        let options = if database_url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(database_url)?
        } else {
            SqliteConnectOptions::new().filename(database_url)
        };

        Ok(Self {
            options: options.create_if_missing(true),
        })
    }

    /// Resolve the warehouse registered under `conn_id`
    pub fn from_conn_id(conn_id: &str) -> Result<Self, LoadError> {
        let var = connection_env_var(conn_id);
        let url = std::env::var(&var).map_err(|_| LoadError::UnknownConnection(conn_id.to_string(), var))?;
        debug!("Resolved warehouse connection '{}'", conn_id);
        Self::new(&url)
    }

    async fn open(&self) -> Result<SqliteConnection, LoadError> {
        Ok(self.options.connect().await?)
    }

    /// Number of rows currently in `table`
    pub async fn row_count(&self, table: &str) -> Result<i64, LoadError> {
        validate_table_name(table)?;
        let mut conn = self.open().await?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&mut conn)
            .await?;
        Ok(count)
    }

    /// Read the destination table back, newest date first
    pub async fn fetch_records(&self, table: &str) -> Result<Vec<DailyRecord>, LoadError> {
        validate_table_name(table)?;
        let mut conn = self.open().await?;
        let rows = sqlx::query(&format!(
            r#"SELECT "open", "high", "low", "close", "volume", "date", "symbol"
               FROM {} ORDER BY "date" DESC, "symbol""#,
            table
        ))
        .fetch_all(&mut conn)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<DailyRecord, LoadError> {
                Ok(DailyRecord {
                    open: r.try_get("open")?,
                    high: r.try_get("high")?,
                    low: r.try_get("low")?,
                    close: r.try_get("close")?,
                    volume: r.try_get("volume")?,
                    date: r.try_get("date")?,
                    symbol: r.try_get("symbol")?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Warehouse for SqliteWarehouse {
    async fn connect(&self) -> Result<Box<dyn Cursor>, LoadError> {
        let conn = self.open().await?;
        Ok(Box::new(SqliteCursor { conn }))
    }
}

/// Cursor over a single SQLite connection
pub struct SqliteCursor {
    conn: SqliteConnection,
}

#[async_trait::async_trait]
impl Cursor for SqliteCursor {
    async fn execute(&mut self, statement: &Statement) -> Result<u64, LoadError> {
        // Unbound statements go through the multi-statement path
        if statement.params.is_empty() {
            let result = sqlx::Executor::execute(&mut self.conn, statement.sql.as_str()).await?;
            return Ok(result.rows_affected());
        }

        let mut query = sqlx::query(&statement.sql);
        for value in &statement.params {
            query = match value {
                SqlValue::Float(v) => query.bind(*v),
                SqlValue::Int(v) => query.bind(*v),
                SqlValue::Date(v) => query.bind(*v),
                SqlValue::Text(v) => query.bind(v.as_str()),
            };
        }

        let result = query.execute(&mut self.conn).await?;
        Ok(result.rows_affected())
    }
}
