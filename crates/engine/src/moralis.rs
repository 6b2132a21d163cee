use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use common::{Error, PriceOracle, Result};

/// DEX whose pools are used for token pricing.
const PRICE_EXCHANGE: &str = "pancakeswap-v2";

/// Token price oracle backed by the Moralis EVM API.
pub struct MoralisClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl MoralisClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        })
    }

    fn price_url(&self, address: &str, chain: &str) -> Result<Url> {
        if address.is_empty() || !address.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidParameter(format!(
                "'{address}' is not a token address"
            )));
        }
        Url::parse_with_params(
            &format!("{}/erc20/{address}/price", self.base_url),
            &[("chain", chain), ("exchange", PRICE_EXCHANGE)],
        )
        .map_err(|e| Error::Config(format!("invalid Moralis base URL: {e}")))
    }
}

#[async_trait]
impl PriceOracle for MoralisClient {
    async fn price(&self, address: &str, chain: &str) -> Result<Decimal> {
        let url = self.price_url(address, chain)?;

        let resp = self
            .http
            .get(url)
            .header("X-API-Key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::OracleUnavailable(format!("{address}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::OracleUnavailable(format!("{address}: {e}")))?;
        if !status.is_success() {
            return Err(Error::OracleUnavailable(format!(
                "{address}: HTTP {status}: {body}"
            )));
        }

        let quote: TokenPrice = serde_json::from_str(&body)
            .map_err(|e| Error::OracleUnavailable(format!("{address}: unexpected response: {e}")))?;
        let price = quote.usd_price;

        debug!(%address, %chain, price = %price, "Token price");
        Ok(price)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPrice {
    usd_price: Decimal,
}
