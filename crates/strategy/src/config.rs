use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use common::{Error, Result};

use crate::order_params::OrderParams;
use crate::streak::ScanMode;

/// Strategy config file (TOML).
///
/// Example `config/strategy.toml`:
/// ```toml
/// symbol = "SOLUSDT"
/// quote_asset = "USDT"
/// timeframe = "1h"
/// threshold = 0.000001
/// chain = "bsc"
///
/// [tokens]
/// reference_base = "0x570A5D26f7765Ecb712C0924E4De545B89fD43dF"
/// current_base = "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56"
/// quote = "0x55d398326f99059fF775485246999027B3197955"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Trading pair, e.g. "SOLUSDT".
    pub symbol: String,
    /// Quote asset used to list candidate pairs.
    pub quote_asset: String,
    /// Kline interval, e.g. "1h".
    pub timeframe: String,
    /// Minimum relative candle move for a streak.
    pub threshold: Decimal,
    /// Quote-currency budget per order.
    #[serde(default = "default_notional")]
    pub notional: Decimal,
    /// Trailing stop band in basis points.
    #[serde(default = "default_trailing_delta")]
    pub trailing_delta: u32,
    #[serde(default)]
    pub scan_mode: ScanMode,
    /// Chain identifier passed to the price oracle.
    pub chain: String,
    pub tokens: TokenAddresses,
}

/// Contract addresses feeding the ratio gate.
///
/// reference ratio = `reference_base` / `quote`,
/// current ratio = `current_base` / `quote`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenAddresses {
    pub reference_base: String,
    pub current_base: String,
    pub quote: String,
}

fn default_notional() -> Decimal {
    OrderParams::default().notional
}

fn default_trailing_delta() -> u32 {
    OrderParams::default().trailing_delta
}

impl StrategyConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let cfg = Self::parse(&content)
            .map_err(|e| Error::Config(format!("strategy config at '{path}': {e}")))?;
        Ok(cfg)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: StrategyConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::Config("symbol must not be empty".into()));
        }
        if self.threshold <= Decimal::ZERO {
            return Err(Error::Config(format!(
                "threshold must be positive, got {}",
                self.threshold
            )));
        }
        if self.notional <= Decimal::ZERO {
            return Err(Error::Config(format!(
                "notional must be positive, got {}",
                self.notional
            )));
        }
        Ok(())
    }

    pub fn order_params(&self) -> OrderParams {
        OrderParams {
            notional: self.notional,
            trailing_delta: self.trailing_delta,
        }
    }
}
