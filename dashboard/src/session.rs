//! Application context: one user session over one key-value store.
//!
//! [`Dashboard`] wires authentication, the ticker store, the event sampler and
//! the chart options together. Logging in loads ticker data with the user's
//! API key and saves it; logging out discards it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use secrecy::SecretString;
use thiserror::Error;
use ticker_data::{
    EventMarker,
    events::EventSampler,
    providers::{DataProvider, ProviderInitError, quandl_rest::QuandlProvider},
};
use tracing::{debug, info};

use crate::{
    auth::{AuthError, AuthService},
    chart::{ChartOptions, ChartView, last_updated_label},
    config::DashboardConfig,
    storage::{DATA_KEY, KeyValueStore, StorageError, load_json, save_json},
    store::{LoadSummary, PersistedTickers, TickerStore},
};

/// Builds the data provider for a session from the user's API key.
pub type ProviderFactory =
    Box<dyn Fn(SecretString) -> Result<Arc<dyn DataProvider>, ProviderInitError> + Send + Sync>;

/// Factory for the REST feed at `base_url`.
pub fn quandl_factory(base_url: impl Into<String>) -> ProviderFactory {
    let base_url = base_url.into();
    Box::new(move |api_key| {
        let provider = QuandlProvider::new(base_url.clone(), api_key)?;
        Ok(Arc::new(provider) as Arc<dyn DataProvider>)
    })
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("cannot create data provider: {0}")]
    Provider(#[from] ProviderInitError),

    #[error("no user is logged in")]
    NotLoggedIn,
}

pub struct Dashboard<S: KeyValueStore> {
    config: DashboardConfig,
    auth: AuthService<S>,
    tickers: TickerStore,
    events: EventSampler,
    chart: ChartOptions,
    provider_factory: ProviderFactory,
}

impl<S: KeyValueStore> Dashboard<S> {
    pub fn new(config: DashboardConfig, store: S, provider_factory: ProviderFactory) -> Result<Self, SessionError> {
        let auth = AuthService::new(store)?;
        let tickers = TickerStore::new(
            config.tickers.iter().cloned(),
            config.moving_average_periods.clone(),
            config.feed.max_in_flight,
        );
        let chart = ChartOptions::with_periods(config.moving_average_periods.clone());

        Ok(Self {
            config,
            auth,
            tickers,
            events: EventSampler::new(),
            chart,
            provider_factory,
        })
    }

    /// Replaces the OS-seeded event sampler, e.g. with a seeded one.
    pub fn with_event_sampler(mut self, events: EventSampler) -> Self {
        self.events = events;
        self
    }

    /// Restores saved ticker data, or loads it now when a user is logged in
    /// but nothing was saved.
    pub async fn start(&mut self) -> Result<Option<LoadSummary>, SessionError> {
        match load_json::<PersistedTickers, _>(self.auth.store(), DATA_KEY)? {
            Some(saved) if !saved.is_empty() => {
                self.tickers.restore(saved);
                Ok(None)
            }
            _ if self.auth.is_logged_in() => self.reload().await.map(Some),
            _ => {
                debug!("no saved ticker data and nobody logged in");
                Ok(None)
            }
        }
    }

    pub async fn sign_up(&mut self, username: &str, password: &str, api_key: &str) -> Result<LoadSummary, SessionError> {
        self.auth.sign_up(username, password, api_key)?;
        self.reload().await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoadSummary, SessionError> {
        self.auth.login(username, password)?;
        self.reload().await
    }

    /// Ends the session and forgets all ticker data, saved or in memory.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.auth.logout()?;
        self.tickers.clear();
        self.auth.store_mut().remove(DATA_KEY)?;
        Ok(())
    }

    /// Runs a full load with the logged-in user's key and saves the result.
    pub async fn reload(&mut self) -> Result<LoadSummary, SessionError> {
        let api_key = self.auth.api_key().ok_or(SessionError::NotLoggedIn)?;
        let provider = (self.provider_factory)(api_key)?;
        let summary = self.tickers.load_initial(provider).await;
        self.persist()?;
        Ok(summary)
    }

    /// One live-simulation step: extends every loaded series up to the day
    /// before `now` and saves when anything changed.
    pub fn simulate_tick<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> Result<usize, SessionError> {
        let appended = self.tickers.extend_synthetic(now, rng);
        if appended > 0 {
            info!(appended, "extended series with synthetic bars");
            self.persist()?;
        }
        Ok(appended)
    }

    /// Event markers for the current end date; empty until one is known.
    pub fn event_markers(&mut self) -> Vec<EventMarker> {
        match self.tickers.end_date() {
            Some(end) => self.events.markers_for(end).to_vec(),
            None => Vec::new(),
        }
    }

    pub fn chart_view(&mut self, symbol: &str) -> ChartView {
        let events = self.event_markers();
        self.chart
            .build_view(symbol, self.tickers.record(symbol), &events)
    }

    pub fn last_updated(&self) -> String {
        last_updated_label(self.tickers.end_date())
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthService<S> {
        &self.auth
    }

    pub fn tickers(&self) -> &TickerStore {
        &self.tickers
    }

    pub fn tickers_mut(&mut self) -> &mut TickerStore {
        &mut self.tickers
    }

    pub fn chart_options_mut(&mut self) -> &mut ChartOptions {
        &mut self.chart
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let snapshot = self.tickers.snapshot();
        save_json(self.auth.store_mut(), DATA_KEY, &snapshot)
    }
}
