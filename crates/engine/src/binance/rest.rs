use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;
use url::form_urlencoded;

use common::{
    AccountInfo, Balance, CancelAck, Candle, Credentials, Error, MarketDataProvider, OrderAck,
    OrderIntent, OrderSide, OrderSubmitter, Result, SymbolInfo, TradingRuleSet,
};

/// REST API client for Binance spot.
///
/// Market data is read from `market_url`; signed order and account calls go
/// to `trading_url`, which is normally the spot testnet.
pub struct BinanceClient {
    market_url: String,
    trading_url: String,
    http: Client,
}

impl BinanceClient {
    pub fn new(
        market_url: impl Into<String>,
        trading_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            market_url: market_url.into().trim_end_matches('/').to_string(),
            trading_url: trading_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn sign(secret: &str, query: &str) -> Result<String> {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| Error::Config(format!("invalid signing key: {e}")))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn public_get(&self, path: &str, query: &str) -> Result<String> {
        let url = if query.is_empty() {
            format!("{}{path}", self.market_url)
        } else {
            format!("{}{path}?{query}", self.market_url)
        };

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        read_body(path, resp).await
    }

    /// Signed request against the trading endpoint. `params` is an already
    /// url-encoded query without timestamp or signature.
    async fn signed(
        &self,
        method: Method,
        path: &str,
        params: &str,
        creds: &Credentials,
    ) -> Result<String> {
        let ts = Utc::now().timestamp_millis();
        let query = if params.is_empty() {
            format!("timestamp={ts}")
        } else {
            format!("{params}&timestamp={ts}")
        };
        let signature = Self::sign(&creds.secret, &query)?;
        let signed_query = format!("{query}&signature={signature}");

        let request = if method == Method::POST {
            self.http
                .post(format!("{}{path}", self.trading_url))
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(signed_query)
        } else {
            self.http
                .request(method, format!("{}{path}?{signed_query}", self.trading_url))
        };

        let resp = request
            .header("X-MBX-APIKEY", &creds.api_key)
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        read_body(path, resp).await
    }

    /// Whether the exchange reports normal operation.
    pub async fn system_status(&self) -> Result<bool> {
        let body = self.public_get("/sapi/v1/system/status", "").await?;
        let status: SystemStatus = decode("/sapi/v1/system/status", &body)?;
        if status.status != 0 {
            return Err(Error::Exchange(format!(
                "exchange under maintenance: {}",
                status.msg
            )));
        }
        Ok(true)
    }

    pub async fn server_time(&self) -> Result<DateTime<Utc>> {
        let body = self.public_get("/api/v3/time", "").await?;
        let time: ServerTime = decode("/api/v3/time", &body)?;
        millis_to_utc(time.server_time)
    }

    async fn exchange_info(&self, symbol: Option<&str>) -> Result<Vec<SymbolInfo>> {
        let query = match symbol {
            Some(s) => encode(&[("symbol", s)]),
            None => String::new(),
        };
        let body = self.public_get("/api/v3/exchangeInfo", &query).await?;
        let info: ExchangeInfo = decode("/api/v3/exchangeInfo", &body)?;
        Ok(info.symbols)
    }
}

#[async_trait]
impl MarketDataProvider for BinanceClient {
    async fn candles(&self, symbol: &str, timeframe: &str, count: u16) -> Result<Vec<Candle>> {
        let limit = count.to_string();
        let query = encode(&[("symbol", symbol), ("interval", timeframe), ("limit", limit.as_str())]);
        let body = self.public_get("/api/v3/klines", &query).await?;
        let candles = parse_klines(&body)?;
        debug!(%symbol, %timeframe, count = candles.len(), "Fetched candles");
        Ok(candles)
    }

    async fn trading_rules(&self, symbol: &str) -> Result<TradingRuleSet> {
        self.exchange_info(Some(symbol))
            .await?
            .into_iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| Error::RuleNotFound {
                symbol: symbol.to_string(),
                filter: "symbol".into(),
            })?
            .trading_rules()
    }

    async fn tradable_symbols(&self, quote_asset: &str) -> Result<Vec<SymbolInfo>> {
        let symbols: Vec<SymbolInfo> = self
            .exchange_info(None)
            .await?
            .into_iter()
            .filter(|s| s.quote_asset == quote_asset && s.is_trading())
            .collect();
        debug!(%quote_asset, count = symbols.len(), "Listed tradable symbols");
        Ok(symbols)
    }
}

#[async_trait]
impl OrderSubmitter for BinanceClient {
    async fn submit(&self, order: &OrderIntent, creds: &Credentials) -> Result<OrderAck> {
        let params = order_params(order);
        debug!(symbol = %order.symbol, side = %order.side, "Submitting order to Binance");
        let body = self
            .signed(Method::POST, "/api/v3/order", &params, creds)
            .await?;
        let resp: OrderResponse = decode("/api/v3/order", &body)?;
        Ok(resp.into())
    }

    async fn cancel_open_orders(
        &self,
        symbol: &str,
        creds: &Credentials,
    ) -> Result<Vec<CancelAck>> {
        let params = encode(&[("symbol", symbol)]);
        let body = self
            .signed(Method::DELETE, "/api/v3/openOrders", &params, creds)
            .await?;
        let resp: Vec<CancelResponse> = decode("/api/v3/openOrders", &body)?;
        Ok(resp.into_iter().map(Into::into).collect())
    }

    async fn open_orders(&self, creds: &Credentials) -> Result<Vec<OrderAck>> {
        let body = self
            .signed(Method::GET, "/api/v3/openOrders", "", creds)
            .await?;
        let resp: Vec<OrderResponse> = decode("/api/v3/openOrders", &body)?;
        Ok(resp.into_iter().map(Into::into).collect())
    }

    async fn account(&self, creds: &Credentials) -> Result<AccountInfo> {
        let body = self
            .signed(Method::GET, "/api/v3/account", "", creds)
            .await?;
        let resp: AccountResponse = decode("/api/v3/account", &body)?;
        Ok(AccountInfo {
            can_trade: resp.can_trade,
            balances: resp.balances,
        })
    }
}

// ─── Request helpers ──────────────────────────────────────────────────────────

fn encode(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Url-encoded `/api/v3/order` parameters for an intent.
fn order_params(order: &OrderIntent) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("symbol", &order.symbol)
        .append_pair("side", &order.side.to_string())
        .append_pair("type", &order.order_type.to_string())
        .append_pair("timeInForce", &order.time_in_force.to_string())
        .append_pair("quantity", &order.quantity.normalize().to_string())
        .append_pair("price", &order.price.normalize().to_string());
    if let Some(stop) = order.stop_price {
        query.append_pair("stopPrice", &stop.normalize().to_string());
    }
    if let Some(delta) = order.trailing_delta {
        query.append_pair("trailingDelta", &delta.to_string());
    }
    query
        .append_pair("newClientOrderId", &order.client_order_id)
        .append_pair("newOrderRespType", "RESULT");
    query.finish()
}

fn transport_error(path: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Exchange(format!("{path}: request timed out"))
    } else {
        Error::Exchange(format!("{path}: {e}"))
    }
}

async fn read_body(path: &str, resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| transport_error(path, e))?;

    if !status.is_success() {
        let reason = match serde_json::from_str::<ApiError>(&body) {
            Ok(err) => format!("code {}: {}", err.code, err.msg),
            Err(_) => body,
        };
        return Err(Error::Exchange(format!("{path}: HTTP {status}: {reason}")));
    }
    Ok(body)
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::Exchange(format!("{path}: unexpected response: {e}")))
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| Error::InvalidCandle(format!("timestamp out of range: {ms}")))
}

// ─── Kline parsing ────────────────────────────────────────────────────────────

/// Binance returns each kline as a positional JSON array:
/// `[openTime, open, high, low, close, volume, closeTime, quoteVolume,
///   trades, takerBuyBase, takerBuyQuote, ignore]`.
fn parse_klines(body: &str) -> Result<Vec<Candle>> {
    let rows: Vec<Vec<Value>> = decode("/api/v3/klines", body)?;
    rows.iter().map(|row| parse_kline_row(row)).collect()
}

fn parse_kline_row(row: &[Value]) -> Result<Candle> {
    if row.len() < 11 {
        return Err(Error::InvalidCandle(format!(
            "kline row has {} fields, expected at least 11",
            row.len()
        )));
    }

    Ok(Candle {
        open_time: millis_to_utc(int_at(row, 0)?)?,
        open: decimal_at(row, 1)?,
        high: decimal_at(row, 2)?,
        low: decimal_at(row, 3)?,
        close: decimal_at(row, 4)?,
        volume: decimal_at(row, 5)?,
        close_time: millis_to_utc(int_at(row, 6)?)?,
        quote_volume: decimal_at(row, 7)?,
        trade_count: int_at(row, 8)?
            .try_into()
            .map_err(|_| Error::InvalidCandle("negative trade count".into()))?,
        taker_buy_base_volume: decimal_at(row, 9)?,
        taker_buy_quote_volume: decimal_at(row, 10)?,
    })
}

fn decimal_at(row: &[Value], idx: usize) -> Result<Decimal> {
    row[idx]
        .as_str()
        .and_then(|s| s.parse::<Decimal>().ok())
        .ok_or_else(|| Error::InvalidCandle(format!("field {idx} is not a decimal: {}", row[idx])))
}

fn int_at(row: &[Value], idx: usize) -> Result<i64> {
    row[idx]
        .as_i64()
        .ok_or_else(|| Error::InvalidCandle(format!("field {idx} is not an integer: {}", row[idx])))
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Deserialize)]
struct SystemStatus {
    status: i64,
    msg: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTime {
    server_time: i64,
}

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    symbol: String,
    order_id: u64,
    client_order_id: String,
    status: String,
    side: OrderSide,
    #[serde(rename = "type")]
    order_type: String,
    price: Decimal,
    orig_qty: Decimal,
    executed_qty: Decimal,
}

impl From<OrderResponse> for OrderAck {
    fn from(r: OrderResponse) -> Self {
        OrderAck {
            symbol: r.symbol,
            order_id: r.order_id,
            client_order_id: r.client_order_id,
            status: r.status,
            side: r.side,
            order_type: r.order_type,
            price: r.price,
            orig_qty: r.orig_qty,
            executed_qty: r.executed_qty,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelResponse {
    symbol: String,
    order_id: u64,
    orig_client_order_id: String,
    status: String,
}

impl From<CancelResponse> for CancelAck {
    fn from(r: CancelResponse) -> Self {
        CancelAck {
            symbol: r.symbol,
            order_id: r.order_id,
            client_order_id: r.orig_client_order_id,
            status: r.status,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    can_trade: bool,
    balances: Vec<Balance>,
}
