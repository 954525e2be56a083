use crate::error::FetchError;
use crate::models::RawResponse;

pub mod alpha_vantage_client;
pub use alpha_vantage_client::{daily_series_url, AlphaVantageClient};

/// Source of raw daily time-series documents
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_daily_series(&self, symbol: &str) -> Result<RawResponse, FetchError>;
}
