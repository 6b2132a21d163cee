use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One OHLCV candlestick as returned by the exchange kline endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: DateTime<Utc>,
    pub quote_volume: Decimal,
    pub trade_count: u64,
    pub taker_buy_base_volume: Decimal,
    pub taker_buy_quote_volume: Decimal,
}

impl Candle {
    /// Up iff the candle closed above its open. A flat candle counts as Down.
    pub fn direction(&self) -> CandleDirection {
        if self.close > self.open {
            CandleDirection::Up
        } else {
            CandleDirection::Down
        }
    }
}

/// Colour of a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleDirection {
    Up,
    Down,
}

impl std::fmt::Display for CandleDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandleDirection::Up => write!(f, "up"),
            CandleDirection::Down => write!(f, "down"),
        }
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    StopLossLimit,
    TakeProfitLimit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::StopLossLimit => write!(f, "STOP_LOSS_LIMIT"),
            OrderType::TakeProfitLimit => write!(f, "TAKE_PROFIT_LIMIT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    Gtc,
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
        }
    }
}

/// Exchange-mandated precision rules for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingRuleSet {
    pub base_precision: u32,
    pub step_size: Decimal,
    pub min_quantity: Decimal,
    pub tick_size: Decimal,
}

/// A single entry of a symbol's `filters` array in exchange info.
/// Only the filters used for order sizing are decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filterType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolFilter {
    #[serde(rename_all = "camelCase")]
    PriceFilter {
        min_price: Decimal,
        max_price: Decimal,
        tick_size: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    LotSize {
        min_qty: Decimal,
        max_qty: Decimal,
        step_size: Decimal,
    },
    #[serde(other)]
    Other,
}

/// A tradable instrument as listed by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub base_asset_precision: u32,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

impl SymbolInfo {
    pub fn is_trading(&self) -> bool {
        self.status == "TRADING"
    }

    /// Collapse the `LOT_SIZE` and `PRICE_FILTER` entries into a rule set.
    pub fn trading_rules(&self) -> Result<TradingRuleSet> {
        let (min_quantity, step_size) = self
            .filters
            .iter()
            .find_map(|f| match f {
                SymbolFilter::LotSize {
                    min_qty, step_size, ..
                } => Some((*min_qty, *step_size)),
                _ => None,
            })
            .ok_or_else(|| Error::RuleNotFound {
                symbol: self.symbol.clone(),
                filter: "LOT_SIZE".into(),
            })?;

        let tick_size = self
            .filters
            .iter()
            .find_map(|f| match f {
                SymbolFilter::PriceFilter { tick_size, .. } => Some(*tick_size),
                _ => None,
            })
            .ok_or_else(|| Error::RuleNotFound {
                symbol: self.symbol.clone(),
                filter: "PRICE_FILTER".into(),
            })?;

        Ok(TradingRuleSet {
            base_precision: self.base_asset_precision,
            step_size,
            min_quantity,
            tick_size,
        })
    }
}

/// Outcome of one evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    None,
}

/// Classification of an observed on-chain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    Buy,
    Sell,
    Ignore,
}

impl TriggerEvent {
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            TriggerEvent::Buy => Some(OrderSide::Buy),
            TriggerEvent::Sell => Some(OrderSide::Sell),
            TriggerEvent::Ignore => None,
        }
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerEvent::Buy => write!(f, "buy"),
            TriggerEvent::Sell => write!(f, "sell"),
            TriggerEvent::Ignore => write!(f, "ignore"),
        }
    }
}

/// An order ready to be handed to the exchange. Built once per trade
/// decision and discarded after submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub quantity: Decimal,
    /// Limit price.
    pub price: Decimal,
    /// Trailing stop band in basis points.
    pub trailing_delta: Option<u32>,
    pub stop_price: Option<Decimal>,
    pub client_order_id: String,
}

impl OrderIntent {
    fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        order_type: OrderType,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type,
            time_in_force: TimeInForce::Gtc,
            quantity,
            price,
            trailing_delta: None,
            stop_price: None,
            client_order_id: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self::new(symbol, side, OrderType::Limit, quantity, price)
    }

    pub fn stop_loss_limit(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> Self {
        Self {
            stop_price: Some(stop_price),
            ..Self::new(symbol, side, OrderType::StopLossLimit, quantity, limit_price)
        }
    }

    pub fn take_profit_limit(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> Self {
        Self {
            stop_price: Some(stop_price),
            ..Self::new(symbol, side, OrderType::TakeProfitLimit, quantity, limit_price)
        }
    }

    /// Stop-loss-limit order whose trigger is a trailing band instead of a
    /// fixed stop price.
    pub fn trailing_stop_loss_limit(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        trailing_delta: u32,
    ) -> Self {
        Self {
            trailing_delta: Some(trailing_delta),
            ..Self::new(symbol, side, OrderType::StopLossLimit, quantity, price)
        }
    }
}

/// Exchange acknowledgement of a submitted or open order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub symbol: String,
    pub order_id: u64,
    pub client_order_id: String,
    pub status: String,
    pub side: OrderSide,
    pub order_type: String,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
}

/// Exchange acknowledgement of a cancelled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelAck {
    pub symbol: String,
    pub order_id: u64,
    pub client_order_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub can_trade: bool,
    pub balances: Vec<Balance>,
}

/// API key pair for signed exchange calls.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}
