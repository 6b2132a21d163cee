use std::time::Duration;

use crate::{Credentials, Error, Result};

/// All configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Exchange
    pub binance: Credentials,
    pub binance_market_url: String,
    pub binance_trading_url: String,

    // Price oracle
    pub moralis_api_key: String,
    pub moralis_base_url: String,

    // Webhook
    pub whale_address: String,
    pub webhook_port: u16,
    /// Bearer token guarding the order-management routes. Routes are not
    /// mounted when unset.
    pub admin_token: Option<String>,

    pub http_timeout: Duration,

    // Strategy config file path
    pub strategy_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let webhook_port = parse_optional("WEBHOOK_PORT", 5002u16)?;
        let timeout_secs = parse_optional("HTTP_TIMEOUT_SECS", 10u64)?;
        if timeout_secs == 0 {
            return Err(Error::Config("HTTP_TIMEOUT_SECS must be positive".into()));
        }

        Ok(Config {
            binance: Credentials::new(required_env("BINANCE_API_KEY")?, required_env("BINANCE_SECRET")?),
            binance_market_url: optional_env("BINANCE_MARKET_URL")
                .unwrap_or_else(|| "https://api.binance.com".to_string()),
            binance_trading_url: optional_env("BINANCE_TRADING_URL")
                .unwrap_or_else(|| "https://testnet.binance.vision".to_string()),
            moralis_api_key: required_env("MORALIS_API_KEY")?,
            moralis_base_url: optional_env("MORALIS_BASE_URL")
                .unwrap_or_else(|| "https://deep-index.moralis.io/api/v2.2".to_string()),
            whale_address: required_env("WHALE_ADDRESS")?,
            webhook_port,
            admin_token: optional_env("ADMIN_TOKEN"),
            http_timeout: Duration::from_secs(timeout_secs),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategy.toml".to_string()),
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        Error::Config(format!(
            "Required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_optional_falls_back_to_default() {
        assert_eq!(
            parse_optional("WHALEBOT_TEST_UNSET_PORT", 5002u16).unwrap(),
            5002
        );
    }

    #[test]
    fn parse_optional_rejects_garbage() {
        std::env::set_var("WHALEBOT_TEST_BAD_PORT", "not-a-port");
        let err = parse_optional("WHALEBOT_TEST_BAD_PORT", 5002u16).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn required_env_reports_missing_key() {
        let err = required_env("WHALEBOT_TEST_DEFINITELY_MISSING").unwrap_err();
        assert!(err.to_string().contains("WHALEBOT_TEST_DEFINITELY_MISSING"));
    }
}
