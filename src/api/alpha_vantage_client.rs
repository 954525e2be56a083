use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::MarketDataSource;
use crate::error::FetchError;
use crate::models::{Config, RawResponse};

/// Keys Alpha Vantage uses to report key, quota or symbol problems with a 200 status
const API_NOTICE_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

/// Longest body excerpt carried in errors and logs
const SNIPPET_LEN: usize = 200;

/// Build the TIME_SERIES_DAILY endpoint URL for a symbol
pub fn daily_series_url(base_url: &str, symbol: &str, api_key: &str) -> Result<Url, FetchError> {
    let url = Url::parse_with_params(
        base_url,
        &[
            ("function", "TIME_SERIES_DAILY"),
            ("symbol", symbol),
            ("apikey", api_key),
        ],
    )?;
    Ok(url)
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_LEN).collect()
}

/// Alpha Vantage API client
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageClient {
    /// Create a new client with the configured key, endpoint and timeout
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Self::with_base_url(&config.api_key, &config.api_base_url, config.http_timeout)
    }

    pub fn with_base_url(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("stock-etl/0.1")
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        })
    }

    /// Issue one GET against a fully formed URL and parse the body as a JSON object
    pub async fn fetch(&self, url: Url) -> Result<RawResponse, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: snippet(&text),
            });
        }

        debug!("Alpha Vantage response length: {} characters", text.len());

        let document: RawResponse = serde_json::from_str(&text).map_err(|source| FetchError::Parse {
            source,
            snippet: snippet(&text),
        })?;

        if !document.is_object() {
            return Err(FetchError::NotAnObject(snippet(&text)));
        }

        for key in API_NOTICE_KEYS {
            if let Some(notice) = document.get(key) {
                warn!("Alpha Vantage returned '{}': {}", key, notice);
            }
        }

        Ok(document)
    }
}

#[async_trait::async_trait]
impl MarketDataSource for AlphaVantageClient {
    async fn fetch_daily_series(&self, symbol: &str) -> Result<RawResponse, FetchError> {
        let url = daily_series_url(&self.base_url, symbol, &self.api_key)?;
        info!("Fetching daily series for {} from {}", symbol, self.base_url);
        self.fetch(url).await
    }
}
