//! Canonical in-memory representation of a daily bar (OHLCV).
//!
//! Every series the store holds, whether fetched from the feed, synthesized,
//! or used as a placeholder, is made of these bars.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single trading day's bar.
///
/// Timestamps are UTC midnight. They serialize as millisecond epochs, which is
/// also the point format chart consumers expect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading day (UTC midnight).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Opening price.
    pub open: f64,

    /// Highest price of the day.
    pub high: f64,

    /// Lowest price of the day.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the day.
    pub volume: f64,
}

/// All bars for a single symbol, ordered by strictly increasing timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    /// The symbol this data represents (e.g., "AAPL").
    pub symbol: String,
    /// Display name reported by the feed.
    pub name: String,
    /// The collection of OHLCV bars.
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Timestamp of the most recent bar, if any.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.timestamp)
    }
}
