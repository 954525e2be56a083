//! Error types for each pipeline stage.
//!
//! Every stage reports its own error kind so a failed run can be attributed to
//! the fetch, the transform or the load. `PipelineError` wraps all three.

use thiserror::Error;

/// Failure while retrieving the daily time series from the market-data API.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, timeout, reading the body).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not valid JSON.
    #[error("Failed to parse response body: {source} | Response: {snippet}")]
    Parse {
        #[source]
        source: serde_json::Error,
        snippet: String,
    },

    /// The body was JSON but not an object.
    #[error("Expected a JSON object, got: {0}")]
    NotAnObject(String),

    /// The endpoint URL could not be built.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Failure while reshaping the raw document into daily records.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The time-series section exists but is not a date-keyed object.
    #[error("Section '{0}' is not an object")]
    MalformedSection(String),

    /// A dated entry is missing fields or is not an object.
    #[error("Malformed entry for {date}: {reason}")]
    MalformedEntry { date: String, reason: String },

    /// A date key is not `YYYY-MM-DD`.
    #[error("Failed to parse date '{date}'")]
    InvalidDate { date: String },

    /// A price or volume field is not a number.
    #[error("Failed to parse {field} '{value}' for {date}")]
    InvalidNumber {
        date: String,
        field: &'static str,
        value: String,
    },
}

/// Failure while replacing the destination table.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No warehouse URL is registered under the connection identifier.
    #[error("Unknown warehouse connection '{0}' (set {1})")]
    UnknownConnection(String, String),

    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),

    /// The batch failed and the ROLLBACK statement failed as well.
    #[error("Load failed ({source}) and rollback failed ({rollback})")]
    Rollback {
        #[source]
        source: Box<LoadError>,
        rollback: Box<LoadError>,
    },
}

/// Error surfaced by a pipeline run, tagged with the stage that failed.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Load failed: {0}")]
    Load(#[from] LoadError),
}
