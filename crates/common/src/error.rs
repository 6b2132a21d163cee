use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid candle: {0}")]
    InvalidCandle(String),

    #[error("Insufficient data: need {needed} candles, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("No trading rule '{filter}' for {symbol}")]
    RuleNotFound { symbol: String, filter: String },

    #[error("Invalid trading rule for {symbol}: {reason}")]
    InvalidTradingRule { symbol: String, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("Price oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
