use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chart annotation pinned to a trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMarker {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// 1-based ordinal, oldest marker first.
    pub title: u32,
    pub text: String,
}

impl EventMarker {
    pub fn new(timestamp: DateTime<Utc>, title: u32) -> Self {
        Self {
            timestamp,
            title,
            text: format!("Description of event #{title}"),
        }
    }
}
