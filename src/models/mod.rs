use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::database::validate_table_name;

/// Top-level key of the daily time-series payload.
pub const TIME_SERIES_SECTION: &str = "Time Series (Daily)";

/// Stand-in used when no API key is configured.
pub const PLACEHOLDER_API_KEY: &str = "default_value_here";

pub const DEFAULT_SYMBOL: &str = "IBM";
pub const DEFAULT_CONN_ID: &str = "warehouse_conn";
pub const DEFAULT_RECORD_LIMIT: usize = 90;
pub const DEFAULT_TABLE: &str = "stock_prices";
pub const DEFAULT_API_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Width of the `symbol` column.
pub const MAX_SYMBOL_LEN: usize = 20;

/// Untyped API response, exactly as parsed from the body.
pub type RawResponse = serde_json::Value;

/// Ordered records produced by one transform, in the API's native order.
pub type ResultSet = Vec<DailyRecord>;

/// One dated entry of the Alpha Vantage daily series (all values are strings)
#[derive(Debug, Clone, Deserialize)]
pub struct DailyPriceData {
    #[serde(rename = "1. open")]
    pub open: String,
    #[serde(rename = "2. high")]
    pub high: String,
    #[serde(rename = "3. low")]
    pub low: String,
    #[serde(rename = "4. close")]
    pub close: String,
    #[serde(rename = "5. volume")]
    pub volume: String,
}

/// Daily price record, one row of the destination table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub date: NaiveDate,
    pub symbol: String,
}

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub conn_id: String,
    pub symbol: String,
    pub record_limit: usize,
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub table: String,
}

impl Config {
    /// Configuration with defaults for everything but the credentials
    pub fn new(api_key: impl Into<String>, conn_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            conn_id: conn_id.into(),
            symbol: DEFAULT_SYMBOL.to_string(),
            record_limit: DEFAULT_RECORD_LIMIT,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup (environment, map, ...)
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("VANTAGE_API_KEY").unwrap_or_else(|| {
            warn!(
                "Variable 'VANTAGE_API_KEY' is not set, using placeholder '{}'",
                PLACEHOLDER_API_KEY
            );
            PLACEHOLDER_API_KEY.to_string()
        });

        let mut config = Config::new(
            api_key,
            lookup("WAREHOUSE_CONN_ID").unwrap_or_else(|| DEFAULT_CONN_ID.to_string()),
        );

        if let Some(symbol) = lookup("STOCK_SYMBOL") {
            config.symbol = symbol;
        }
        if let Some(limit) = lookup("RECORD_LIMIT") {
            config.record_limit = limit
                .parse()
                .map_err(|_| anyhow::anyhow!("RECORD_LIMIT must be a positive integer, got '{}'", limit))?;
        }
        if let Some(url) = lookup("ALPHA_VANTAGE_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(secs) = lookup("HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be an integer, got '{}'", secs))?;
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(table) = lookup("STOCK_TABLE") {
            config.table = table;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the values that end up in SQL or in the URL
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.symbol.trim().is_empty() {
            anyhow::bail!("Symbol must not be empty");
        }
        if self.symbol.chars().count() > MAX_SYMBOL_LEN {
            anyhow::bail!(
                "Symbol '{}' is longer than {} characters",
                self.symbol,
                MAX_SYMBOL_LEN
            );
        }
        if self.record_limit == 0 {
            anyhow::bail!("Record limit must be at least 1");
        }
        validate_table_name(&self.table)?;
        Ok(())
    }

    pub fn uses_placeholder_api_key(&self) -> bool {
        self.api_key == PLACEHOLDER_API_KEY
    }
}
