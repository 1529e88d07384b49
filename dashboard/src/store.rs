//! Per-symbol ticker collection and the load cycle that fills it.
//!
//! The store starts with nothing loaded; every configured symbol reads as its
//! placeholder record until its first successful load.
//! [`TickerStore::load_initial`] fetches all symbols with at most
//! `max_in_flight` requests outstanding. Whenever one completes, the next
//! request is started (polled once) before the finished one is processed.
//!
//! Observers registered through [`TickerStore::subscribe`] are called
//! synchronously, in publication order, for every [`StoreEvent`].

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use futures::{
    FutureExt,
    future::BoxFuture,
    stream::{FuturesUnordered, StreamExt},
};
use indexmap::{IndexMap, IndexSet};
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared_utils::numeric::round;
use ticker_data::{
    LoadError, MovingAveragePeriods, TickerRecord,
    models::dataset::RawDataset,
    processor::process_dataset,
    providers::{DataProvider, ProviderError},
    synthetic::extend_to_yesterday,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolState {
    /// No data yet; reads return the placeholder record.
    Placeholder,
    /// A request for the symbol is outstanding.
    Loading,
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    LoadStarted { symbols: usize },
    SymbolLoaded { symbol: String, progress: u8 },
    /// The symbol keeps whatever it showed before the load.
    SymbolFailed { symbol: String, error: String, progress: u8 },
    LoadFinished { end_date: Option<DateTime<Utc>>, failed: Vec<String> },
    Extended { symbol: String, appended: usize },
    Cleared,
}

pub type StoreCallback = Box<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of one [`TickerStore::load_initial`] cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: Vec<String>,
    pub failed: Vec<String>,
}

/// Saved form of the loaded records, keyed by symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedTickers(pub IndexMap<String, TickerRecord>);

impl PersistedTickers {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct TickerStore {
    symbols: IndexSet<String>,
    periods: MovingAveragePeriods,
    max_in_flight: usize,
    placeholders: IndexMap<String, TickerRecord>,
    unknown: TickerRecord,
    records: IndexMap<String, TickerRecord>,
    in_flight: HashSet<String>,
    completed: usize,
    progress: u8,
    end_date: Option<DateTime<Utc>>,
    subscribers: Vec<(SubscriptionId, StoreCallback)>,
    next_subscription: u64,
}

impl TickerStore {
    /// `max_in_flight` is clamped to at least one request.
    pub fn new<I, T>(symbols: I, periods: MovingAveragePeriods, max_in_flight: usize) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let symbols: IndexSet<String> = symbols.into_iter().map(Into::into).collect();
        let placeholders = symbols
            .iter()
            .map(|s| (s.clone(), TickerRecord::placeholder(s, &periods)))
            .collect();
        let unknown = TickerRecord::placeholder("", &periods);
        Self {
            symbols,
            periods,
            max_in_flight: max_in_flight.max(1),
            placeholders,
            unknown,
            records: IndexMap::new(),
            in_flight: HashSet::new(),
            completed: 0,
            progress: 0,
            end_date: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    pub fn periods(&self) -> &MovingAveragePeriods {
        &self.periods
    }

    /// The loaded record for `symbol`, or its placeholder when there is none.
    ///
    /// A symbol that is not configured gets a placeholder with an empty
    /// symbol.
    pub fn record(&self, symbol: &str) -> &TickerRecord {
        self.records
            .get(symbol)
            .or_else(|| self.placeholders.get(symbol))
            .unwrap_or(&self.unknown)
    }

    pub fn state(&self, symbol: &str) -> SymbolState {
        if self.in_flight.contains(symbol) {
            SymbolState::Loading
        } else if self.records.contains_key(symbol) {
            SymbolState::Ready
        } else {
            SymbolState::Placeholder
        }
    }

    /// Share of symbols that completed the current load, 0-100.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Latest bar timestamp across every configured symbol, known once a
    /// load has completed (or saved data was restored).
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    pub fn subscribe(&mut self, callback: StoreCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, callback));
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn publish(&self, event: StoreEvent) {
        for (_, callback) in &self.subscribers {
            callback(&event);
        }
    }

    /// Fetches and processes every configured symbol.
    ///
    /// Each symbol completes exactly once. A failed symbol is logged, reported
    /// through [`StoreEvent::SymbolFailed`] and keeps its previous record;
    /// there is no retry. Progress counts failures as completed so it always
    /// reaches 100, at which point the end date is recomputed.
    ///
    /// Every cycle starts from 0 progress with no end date, including a
    /// reload of already loaded symbols.
    pub async fn load_initial(&mut self, provider: Arc<dyn DataProvider>) -> LoadSummary {
        let total = self.symbols.len();
        self.in_flight.clear();
        self.completed = 0;
        self.progress = 0;
        self.end_date = None;
        info!(symbols = total, max_in_flight = self.max_in_flight, "loading ticker data");
        self.publish(StoreEvent::LoadStarted { symbols: total });

        let mut summary = LoadSummary::default();
        let mut queue = self.symbols.clone().into_iter();
        let mut fetches = Fetches::default();

        for symbol in queue.by_ref().take(self.max_in_flight) {
            self.in_flight.insert(symbol.clone());
            fetches.start(fetch(Arc::clone(&provider), symbol));
        }

        while let Some((symbol, fetched)) = fetches.next().await {
            if let Some(next) = queue.next() {
                self.in_flight.insert(next.clone());
                fetches.start(fetch(Arc::clone(&provider), next));
            }
            self.in_flight.remove(&symbol);

            let result = fetched
                .map_err(LoadError::from)
                .and_then(|raw| process_dataset(&symbol, &raw, &self.periods).map_err(LoadError::from));

            self.completed += 1;
            self.progress = progress_percent(self.completed, total);

            match result {
                Ok(record) => {
                    info!(%symbol, bars = record.series.len(), progress = self.progress, "ticker loaded");
                    self.records.insert(symbol.clone(), record);
                    summary.loaded.push(symbol.clone());
                    self.publish(StoreEvent::SymbolLoaded {
                        symbol,
                        progress: self.progress,
                    });
                }
                Err(e) => {
                    warn!(%symbol, error = %e, "failed to load ticker data");
                    summary.failed.push(symbol.clone());
                    self.publish(StoreEvent::SymbolFailed {
                        symbol,
                        error: e.to_string(),
                        progress: self.progress,
                    });
                }
            }
        }

        self.progress = 100;
        self.end_date = self.compute_end_date();
        info!(
            loaded = summary.loaded.len(),
            failed = summary.failed.len(),
            end_date = ?self.end_date,
            "ticker load finished"
        );
        self.publish(StoreEvent::LoadFinished {
            end_date: self.end_date,
            failed: summary.failed.clone(),
        });
        summary
    }

    /// Appends synthetic bars up to yesterday for every loaded symbol.
    ///
    /// Returns the total number of bars appended.
    pub fn extend_synthetic<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> usize {
        let mut grown = Vec::new();
        for (symbol, record) in self.records.iter_mut() {
            let appended = extend_to_yesterday(record, now, &self.periods, rng);
            if appended > 0 {
                grown.push((symbol.clone(), appended));
            }
        }

        if grown.is_empty() {
            return 0;
        }
        if self.progress == 100 {
            self.end_date = self.compute_end_date();
        }

        let total = grown.iter().map(|(_, n)| n).sum();
        for (symbol, appended) in grown {
            self.publish(StoreEvent::Extended { symbol, appended });
        }
        total
    }

    /// Drops every loaded record and resets progress.
    pub fn clear(&mut self) {
        self.records.clear();
        self.in_flight.clear();
        self.completed = 0;
        self.progress = 0;
        self.end_date = None;
        self.publish(StoreEvent::Cleared);
    }

    pub fn snapshot(&self) -> PersistedTickers {
        PersistedTickers(self.records.clone())
    }

    /// Replaces the loaded records with saved ones.
    ///
    /// Derived series are rebuilt with the current moving-average windows,
    /// which may differ from those in effect when the data was saved.
    pub fn restore(&mut self, saved: PersistedTickers) {
        self.records = saved.0;
        for record in self.records.values_mut() {
            record.recompute(&self.periods);
        }
        self.in_flight.clear();
        self.completed = self.symbols.len();
        self.progress = 100;
        self.end_date = self.compute_end_date();
        info!(symbols = self.records.len(), "restored saved ticker data");
    }

    fn compute_end_date(&self) -> Option<DateTime<Utc>> {
        self.symbols
            .iter()
            .filter_map(|s| self.record(s).last_timestamp())
            .max()
    }
}

type Fetched = (String, Result<RawDataset, ProviderError>);

fn fetch(provider: Arc<dyn DataProvider>, symbol: String) -> BoxFuture<'static, Fetched> {
    async move {
        let result = provider.fetch_dataset(&symbol).await;
        (symbol, result)
    }
    .boxed()
}

/// Outstanding fetches, each polled once when started so its request is
/// already under way by the time the caller moves on.
#[derive(Default)]
struct Fetches {
    pending: FuturesUnordered<BoxFuture<'static, Fetched>>,
    ready: VecDeque<Fetched>,
}

impl Fetches {
    fn start(&mut self, mut fut: BoxFuture<'static, Fetched>) {
        match (&mut fut).now_or_never() {
            Some(done) => self.ready.push_back(done),
            None => self.pending.push(fut),
        }
    }

    async fn next(&mut self) -> Option<Fetched> {
        match self.ready.pop_front() {
            Some(done) => Some(done),
            None => self.pending.next().await,
        }
    }
}

fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    round(100.0 * completed as f64 / total as f64, 0).clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rand::{SeedableRng, rngs::StdRng};
    use std::sync::Mutex;
    use ticker_data::{Bar, BarSeries};

    fn record(symbol: &str, last: DateTime<Utc>) -> TickerRecord {
        let bars = (0..3)
            .rev()
            .map(|back| Bar {
                timestamp: last - Duration::days(back),
                open: 10.0,
                high: 12.0,
                low: 8.0,
                close: 10.0,
                volume: 100.0,
            })
            .collect();
        TickerRecord::from_series(
            BarSeries::new(symbol, format!("{symbol} Prices"), bars),
            &MovingAveragePeriods::default(),
        )
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn progress_rounds() {
        assert_eq!(progress_percent(1, 6), 17);
        assert_eq!(progress_percent(3, 6), 50);
        assert_eq!(progress_percent(6, 6), 100);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn unknown_symbol_reads_placeholder() {
        let store = TickerStore::new(["AAPL"], MovingAveragePeriods::default(), 2);
        assert!(store.record("AAPL").is_placeholder());
        assert_eq!(store.record("AAPL").series.symbol, "AAPL");
        assert_eq!(store.state("AAPL"), SymbolState::Placeholder);

        let stray = store.record("ZZZ");
        assert!(stray.is_placeholder());
        assert_eq!(stray.series.symbol, "");
        assert_eq!(store.progress(), 0);
        assert!(store.end_date().is_none());
    }

    #[test]
    fn restore_computes_end_date_over_placeholders() {
        let mut store = TickerStore::new(["AAPL", "IBM"], MovingAveragePeriods::default(), 2);
        let mut saved = IndexMap::new();
        saved.insert("AAPL".to_string(), record("AAPL", day(2019, 1, 4)));
        store.restore(PersistedTickers(saved));

        assert_eq!(store.state("AAPL"), SymbolState::Ready);
        assert_eq!(store.state("IBM"), SymbolState::Placeholder);
        assert_eq!(store.progress(), 100);
        assert_eq!(store.end_date(), Some(day(2019, 1, 4)));
    }

    #[test]
    fn extend_publishes_and_moves_end_date() {
        let mut store = TickerStore::new(["AAPL"], MovingAveragePeriods::default(), 2);
        let mut saved = IndexMap::new();
        saved.insert("AAPL".to_string(), record("AAPL", day(2024, 5, 10)));
        store.restore(PersistedTickers(saved));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.clone())));

        let now = Utc.with_ymd_and_hms(2024, 5, 14, 9, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(store.extend_synthetic(now, &mut rng), 3);
        assert_eq!(store.end_date(), Some(day(2024, 5, 13)));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StoreEvent::Extended {
                symbol: "AAPL".into(),
                appended: 3
            }]
        );

        // already at yesterday
        assert_eq!(store.extend_synthetic(now, &mut rng), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut store = TickerStore::new(["AAPL"], MovingAveragePeriods::default(), 2);
        let mut saved = IndexMap::new();
        saved.insert("AAPL".to_string(), record("AAPL", day(2019, 1, 4)));
        store.restore(PersistedTickers(saved));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.clone())));

        store.clear();
        assert!(store.record("AAPL").is_placeholder());
        assert_eq!(store.progress(), 0);
        assert!(store.end_date().is_none());
        assert!(store.snapshot().is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![StoreEvent::Cleared]);
    }

    #[test]
    fn unsubscribe_detaches() {
        let mut store = TickerStore::new(["AAPL"], MovingAveragePeriods::default(), 2);
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let id = store.subscribe(Box::new(move |_| *sink.lock().unwrap() += 1));

        store.clear();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.clear();
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn restore_recomputes_with_current_windows() {
        let periods = MovingAveragePeriods::new([2]).unwrap();
        let mut store = TickerStore::new(["AAPL"], periods, 2);
        let mut saved = IndexMap::new();
        saved.insert("AAPL".to_string(), record("AAPL", day(2019, 1, 4)));
        store.restore(PersistedTickers(saved));

        let rec = store.record("AAPL");
        assert_eq!(rec.moving.periods().collect::<Vec<_>>(), vec![2]);
        assert_eq!(rec.moving.get(2).unwrap().len(), 2);
    }
}
