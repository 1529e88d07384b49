mod common;
use common::{FakeFeed, day, feed};

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use chrono::{TimeZone, Utc};
use dashboard::{
    Dashboard, ProviderFactory, SessionError, SymbolState,
    auth::AuthError,
    config::load_config_str,
    storage::{DATA_KEY, JsonFileStore, KeyValueStore},
};
use rand::{SeedableRng, rngs::StdRng};
use secrecy::ExposeSecret;
use tempfile::TempDir;
use ticker_data::{events::EventSampler, providers::DataProvider};

const CONFIG: &str = r#"
tickers = ["aapl", "IBM", "AAPL"]
moving_average_periods = [10, 25]

[feed]
max_in_flight = 2
"#;

/// Factory that counts how often a provider was built and checks the key.
fn counting_factory(built: Arc<AtomicUsize>, fake: Arc<FakeFeed>) -> ProviderFactory {
    Box::new(move |api_key| {
        assert_eq!(api_key.expose_secret(), "KEY-123");
        built.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&fake) as Arc<dyn DataProvider>)
    })
}

struct Harness {
    dir: TempDir,
    built: Arc<AtomicUsize>,
    fake: Arc<FakeFeed>,
}

impl Harness {
    fn new() -> Self {
        let mut fake = FakeFeed::default();
        fake.last_days.insert("IBM".into(), day(2018, 4, 2));
        Self {
            dir: TempDir::new().unwrap(),
            built: Arc::new(AtomicUsize::new(0)),
            fake: feed(fake),
        }
    }

    fn open(&self) -> Dashboard<JsonFileStore> {
        let cfg = load_config_str(CONFIG).unwrap();
        let store = JsonFileStore::open(self.dir.path().join("store.json")).unwrap();
        Dashboard::new(cfg, store, counting_factory(self.built.clone(), self.fake.clone()))
            .unwrap()
            .with_event_sampler(EventSampler::with_seed(7))
    }
}

#[tokio::test]
async fn sign_up_loads_and_persists() {
    let h = Harness::new();
    let mut dash = h.open();

    let summary = dash.sign_up("ann", "pw", "KEY-123").await.unwrap();
    assert_eq!(summary.loaded.len(), 2);
    assert_eq!(h.built.load(Ordering::SeqCst), 1);
    assert_eq!(dash.tickers().state("AAPL"), SymbolState::Ready);
    assert_eq!(dash.last_updated(), "04/02/18");
    assert!(dash.auth().store().get(DATA_KEY).unwrap().is_some());

    let view = dash.chart_view("IBM");
    assert_eq!(view.title, "IBM Prices");
    assert!(!view.loading);
    assert_eq!(view.moving_averages.len(), 2);
    assert!((2..=4).contains(&view.events.data.len()));
    // same end date, same markers
    assert_eq!(dash.chart_view("AAPL").events, view.events);
}

#[tokio::test]
async fn restart_restores_saved_data_without_fetching() {
    let h = Harness::new();
    {
        let mut dash = h.open();
        dash.sign_up("ann", "pw", "KEY-123").await.unwrap();
    }

    let mut dash = h.open();
    assert_eq!(dash.auth().username(), Some("ann"));
    assert!(dash.start().await.unwrap().is_none());
    assert_eq!(h.built.load(Ordering::SeqCst), 1);
    assert_eq!(h.fake.calls().len(), 2);
    assert_eq!(dash.tickers().state("IBM"), SymbolState::Ready);
    assert_eq!(dash.last_updated(), "04/02/18");
}

#[tokio::test]
async fn logged_in_start_without_data_loads() {
    let h = Harness::new();
    {
        let mut dash = h.open();
        dash.sign_up("ann", "pw", "KEY-123").await.unwrap();
    }
    // drop the saved collection but keep the session
    {
        let mut store = JsonFileStore::open(h.dir.path().join("store.json")).unwrap();
        store.remove(DATA_KEY).unwrap();
    }

    let mut dash = h.open();
    let summary = dash.start().await.unwrap();
    assert_eq!(summary.map(|s| s.loaded.len()), Some(2));
    assert_eq!(h.built.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn logout_forgets_data_and_login_reloads() {
    let h = Harness::new();
    let mut dash = h.open();
    dash.sign_up("ann", "pw", "KEY-123").await.unwrap();

    dash.logout().unwrap();
    assert!(!dash.auth().is_logged_in());
    assert!(dash.auth().store().get(DATA_KEY).unwrap().is_none());
    assert!(dash.tickers().record("AAPL").is_placeholder());
    assert_eq!(dash.last_updated(), "");

    let err = dash.login("ann", "wrong").await.unwrap_err();
    assert!(matches!(err, SessionError::Auth(AuthError::InvalidCredentials)));
    assert!(matches!(dash.reload().await, Err(SessionError::NotLoggedIn)));

    dash.login("ann", "pw").await.unwrap();
    assert_eq!(dash.tickers().state("AAPL"), SymbolState::Ready);
    assert_eq!(h.built.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn simulate_tick_extends_and_saves() {
    let h = Harness::new();
    let mut dash = h.open();
    dash.sign_up("ann", "pw", "KEY-123").await.unwrap();
    let before = dash.chart_view("IBM").events;

    let now = Utc.with_ymd_and_hms(2018, 4, 6, 12, 0, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    // AAPL 03/28..04/05 (9 bars), IBM 04/03..04/05 (3 bars)
    assert_eq!(dash.simulate_tick(now, &mut rng).unwrap(), 12);
    assert_eq!(dash.last_updated(), "04/05/18");
    assert_eq!(dash.tickers().record("IBM").series.len(), 33);

    // end date moved, so markers were redrawn against it
    let after = dash.chart_view("IBM").events;
    assert!(after.data.iter().all(|m| m.timestamp <= day(2018, 4, 5)));
    assert!(!before.data.is_empty());

    // reopened store sees the synthetic bars
    let mut reopened = h.open();
    reopened.start().await.unwrap();
    assert_eq!(reopened.tickers().record("IBM").series.len(), 33);

    assert_eq!(dash.simulate_tick(now, &mut rng).unwrap(), 0);
}
