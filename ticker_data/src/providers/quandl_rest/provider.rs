use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use snafu::{ResultExt, ensure};
use tracing::debug;

use crate::{
    models::dataset::RawDataset,
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, EmptyApiKeySnafu, ProviderError,
        ProviderInitError, ReqwestSnafu,
    },
};

pub const DEFAULT_BASE_URL: &str = "https://www.quandl.com/api/v3/datasets/WIKI";

pub struct QuandlProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl QuandlProvider {
    /// Creates a provider that authenticates every request with `api_key`.
    ///
    /// The key belongs to the logged-in user, so a provider lives for one
    /// session.
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Result<Self, ProviderInitError> {
        ensure!(!api_key.expose_secret().trim().is_empty(), EmptyApiKeySnafu);

        let client = Client::builder().build().context(ClientBuildSnafu)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn dataset_url(&self, symbol: &str) -> String {
        format!("{}/{}.json", self.base_url, symbol)
    }
}

#[async_trait]
impl DataProvider for QuandlProvider {
    async fn fetch_dataset(&self, symbol: &str) -> Result<RawDataset, ProviderError> {
        let url = self.dataset_url(symbol);
        debug!(symbol, url = %url, "requesting dataset");

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.expose_secret()), ("order", "asc")])
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail();
        }

        response.json::<RawDataset>().await.context(ReqwestSnafu)
    }
}
