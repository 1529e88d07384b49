//! Stock dashboard backend: a local login gate, the per-symbol ticker store
//! and its load cycle, typed chart options, and the session context tying
//! them to a persisted key-value store.

pub mod auth;
pub mod chart;
pub mod config;
pub mod logging;
pub mod session;
pub mod storage;
pub mod store;

pub use session::{Dashboard, ProviderFactory, SessionError, quandl_factory};
pub use store::{StoreEvent, SymbolState, TickerStore};
