use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::providers::ProviderError;

/// Why a `YYYY-MM-DD` string could not be turned into a trading day.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidDateError {
    #[error("expected year-month-day, found {found} component(s)")]
    ComponentCount { found: usize },

    #[error("component {component:?} is not an integer")]
    NotInteger { component: String },

    #[error("{year:04}-{month:02}-{day:02} is not a calendar date")]
    OutOfRange { year: i32, month: u32, day: u32 },
}

/// A fetched row that cannot become a [`Bar`](crate::models::bar::Bar).
///
/// Any one of these abandons the whole symbol for the current load.
#[derive(Debug, Error, PartialEq)]
pub enum MalformedRecordError {
    #[error("row {row}: expected a date and {expected} numeric fields, found {found} column(s)")]
    MissingColumns {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: date is not a string")]
    DateNotString { row: usize },

    #[error("row {row}: invalid date {value:?}")]
    InvalidDate {
        row: usize,
        value: String,
        #[source]
        source: InvalidDateError,
    },

    #[error("row {row}: field `{field}` is not a number")]
    NonNumeric { row: usize, field: &'static str },

    #[error("row {row}: negative volume {volume}")]
    NegativeVolume { row: usize, volume: f64 },

    #[error("row {row}: {timestamp} is not after the previous row")]
    OutOfOrder {
        row: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Failure to load one symbol: either the request or its payload.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] ProviderError),

    #[error("malformed record: {0}")]
    Malformed(#[from] MalformedRecordError),
}
