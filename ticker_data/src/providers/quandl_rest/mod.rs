//! REST provider for the Quandl-style `datasets/<SYMBOL>.json` endpoint.

pub mod provider;

pub use provider::{DEFAULT_BASE_URL, QuandlProvider};
