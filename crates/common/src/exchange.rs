use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    AccountInfo, CancelAck, Candle, Credentials, OrderAck, OrderIntent, Result, SymbolInfo,
    TradingRuleSet,
};

/// Read-only market data from the exchange.
///
/// `BinanceClient` implements this against the public REST endpoints.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Most recent `count` candles, oldest first.
    async fn candles(&self, symbol: &str, timeframe: &str, count: u16) -> Result<Vec<Candle>>;

    /// Tick size, step size and minimum quantity for `symbol`.
    async fn trading_rules(&self, symbol: &str) -> Result<TradingRuleSet>;

    /// All symbols quoted in `quote_asset` that are currently trading.
    async fn tradable_symbols(&self, quote_asset: &str) -> Result<Vec<SymbolInfo>>;
}

/// Token price lookup by contract address.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Quote price of the token at `address` on `chain`, in USD.
    async fn price(&self, address: &str, chain: &str) -> Result<Decimal>;
}

/// Signed order flow. Credentials are passed on every call.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn submit(&self, order: &OrderIntent, creds: &Credentials) -> Result<OrderAck>;

    /// Cancel every open order on `symbol`.
    async fn cancel_open_orders(&self, symbol: &str, creds: &Credentials)
        -> Result<Vec<CancelAck>>;

    async fn open_orders(&self, creds: &Credentials) -> Result<Vec<OrderAck>>;

    async fn account(&self, creds: &Credentials) -> Result<AccountInfo>;
}
