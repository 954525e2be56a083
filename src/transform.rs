//! Reshapes the nested daily time-series document into flat records.
//!
//! The document's key order is kept as-is and the output is cut to the first
//! `limit` entries. No sort is applied: "most recent N" holds only as long as
//! the API keeps listing dates newest first.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TransformError;
use crate::models::{DailyPriceData, DailyRecord, RawResponse, ResultSet, TIME_SERIES_SECTION};

/// Turn a raw API document into at most `limit` records tagged with `symbol`.
///
/// A document without the time-series section yields an empty result.
pub fn transform(raw: &RawResponse, symbol: &str, limit: usize) -> Result<ResultSet, TransformError> {
    let section = match raw.get(TIME_SERIES_SECTION) {
        Some(section) => section
            .as_object()
            .ok_or_else(|| TransformError::MalformedSection(TIME_SERIES_SECTION.to_string()))?,
        None => {
            warn!("Section '{}' not found, producing no records", TIME_SERIES_SECTION);
            return Ok(Vec::new());
        }
    };

    let records = section
        .iter()
        .take(limit)
        .map(|(date, entry)| convert_entry(date, entry, symbol))
        .collect::<Result<ResultSet, _>>()?;

    if !records.windows(2).all(|pair| pair[0].date > pair[1].date) {
        warn!("Daily series is not in descending date order; the kept window may not be the most recent");
    }

    debug!(
        "Transformed {} of {} entries for {}",
        records.len(),
        section.len(),
        symbol
    );
    Ok(records)
}

/// Convert one dated entry into a typed record
pub fn convert_entry(date: &str, entry: &Value, symbol: &str) -> Result<DailyRecord, TransformError> {
    let price_data = DailyPriceData::deserialize(entry).map_err(|e| TransformError::MalformedEntry {
        date: date.to_string(),
        reason: e.to_string(),
    })?;

    let parsed_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| TransformError::InvalidDate {
        date: date.to_string(),
    })?;

    Ok(DailyRecord {
        open: parse_field(date, "open", &price_data.open)?,
        high: parse_field(date, "high", &price_data.high)?,
        low: parse_field(date, "low", &price_data.low)?,
        close: parse_field(date, "close", &price_data.close)?,
        volume: parse_field(date, "volume", &price_data.volume)?,
        date: parsed_date,
        symbol: symbol.to_string(),
    })
}

fn parse_field<T: std::str::FromStr>(date: &str, field: &'static str, value: &str) -> Result<T, TransformError> {
    value.trim().parse::<T>().map_err(|_| TransformError::InvalidNumber {
        date: date.to_string(),
        field,
        value: value.to_string(),
    })
}
