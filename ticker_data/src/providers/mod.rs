//! Provider abstraction for the per-symbol dataset feed.
//!
//! This module defines the [`DataProvider`] trait, the single boundary through
//! which raw daily data enters the system. A provider only fetches and
//! deserializes; turning rows into bars is the
//! [`processor`](crate::processor)'s job.
//!
//! The trait is designed for async usage and supports dynamic dispatch
//! (`Arc<dyn DataProvider>`), so the store can be driven by the REST provider
//! in production and by an in-memory one in tests.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use ticker_data::models::dataset::RawDataset;
//! use ticker_data::providers::{DataProvider, ProviderError};
//!
//! struct Fixed;
//!
//! #[async_trait]
//! impl DataProvider for Fixed {
//!     async fn fetch_dataset(&self, symbol: &str) -> Result<RawDataset, ProviderError> {
//!         Ok(RawDataset::new(symbol, vec![]))
//!     }
//! }
//! ```

pub mod quandl_rest;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::dataset::RawDataset;

/// Fetches the raw daily dataset for one symbol.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetches every available row for `symbol`, oldest first.
    async fn fetch_dataset(&self, symbol: &str) -> Result<RawDataset, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The session has no API key to authenticate with.
    #[snafu(display("An API key is required to query the data feed"))]
    EmptyApiKey { backtrace: Backtrace },
}

/// Errors that can occur within a `DataProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, undecodable body).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The feed answered with a non-success status.
    #[snafu(display("API error ({status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },
}
