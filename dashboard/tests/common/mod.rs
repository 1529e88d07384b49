#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration as Days, TimeZone, Utc};
use serde_json::{Value, json};
use ticker_data::{
    models::dataset::RawDataset,
    providers::{ApiSnafu, DataProvider, ProviderError},
};

pub const SIX: [&str; 6] = ["AAPL", "IBM", "AXP", "CVS", "GE", "MSFT"];

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// `len` ascending daily rows ending at `last`, closes counting up from 100.
pub fn rows_ending(last: DateTime<Utc>, len: i64) -> Vec<Vec<Value>> {
    (0..len)
        .map(|i| {
            let ts = last - Days::days(len - 1 - i);
            let close = 100.0 + i as f64;
            vec![
                json!(ts.format("%Y-%m-%d").to_string()),
                json!(close - 0.5),
                json!(close + 1.0),
                json!(close - 1.0),
                json!(close),
                json!(1_000 + i),
                json!(0.0),
            ]
        })
        .collect()
}

/// In-memory feed that records how many requests were outstanding at once.
#[derive(Default)]
pub struct FakeFeed {
    current: AtomicUsize,
    max_seen: AtomicUsize,
    calls: Mutex<Vec<String>>,
    /// Per-symbol latency; unlisted symbols answer after 5ms.
    pub delays_ms: HashMap<String, u64>,
    /// Per-symbol last trading day; unlisted symbols end 2018-03-27.
    pub last_days: HashMap<String, DateTime<Utc>>,
    pub down: HashSet<String>,
    pub malformed: HashSet<String>,
}

impl FakeFeed {
    pub fn max_in_flight(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataProvider for FakeFeed {
    async fn fetch_dataset(&self, symbol: &str) -> Result<RawDataset, ProviderError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(symbol.to_string());

        let delay = self.delays_ms.get(symbol).copied().unwrap_or(5);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);

        if self.down.contains(symbol) {
            return ApiSnafu {
                status: 500u16,
                message: "upstream unavailable",
            }
            .fail();
        }
        if self.malformed.contains(symbol) {
            return Ok(RawDataset::new(
                format!("{symbol} Prices"),
                vec![vec![json!("2018-13-45"), json!(1), json!(1), json!(1), json!(1), json!(1)]],
            ));
        }

        let last = self
            .last_days
            .get(symbol)
            .copied()
            .unwrap_or_else(|| day(2018, 3, 27));
        Ok(RawDataset::new(format!("{symbol} Prices"), rows_ending(last, 30)))
    }
}

pub fn feed(f: FakeFeed) -> Arc<FakeFeed> {
    Arc::new(f)
}
