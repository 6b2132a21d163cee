use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use api::{router, AppState};
use common::{
    AccountInfo, CancelAck, Candle, Credentials, Error, MarketDataProvider, OrderAck, OrderIntent,
    OrderSubmitter, PriceOracle, Result, SymbolInfo, TradingRuleSet,
};
use engine::TradePipeline;
use strategy::StrategyConfig;

const WHALE: &str = "0xcA3B6f18Ebc4E7C66885eaAde4C2FF3Edcf48d02";
const TOKEN: &str = "s3cret";

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

struct UpStreakMarket;

#[async_trait]
impl MarketDataProvider for UpStreakMarket {
    async fn candles(&self, _symbol: &str, _timeframe: &str, count: u16) -> Result<Vec<Candle>> {
        let mut open = d("100");
        let all: Vec<Candle> = ["0.02", "0.03", "0.015"]
            .iter()
            .map(|c| {
                let close = open * (Decimal::ONE + d(c));
                let candle = Candle {
                    open_time: Utc::now(),
                    open,
                    high: close,
                    low: open,
                    close,
                    volume: d("1"),
                    close_time: Utc::now(),
                    quote_volume: d("100"),
                    trade_count: 1,
                    taker_buy_base_volume: d("0.5"),
                    taker_buy_quote_volume: d("50"),
                };
                open = close;
                candle
            })
            .collect();
        let start = all.len().saturating_sub(count as usize);
        Ok(all[start..].to_vec())
    }

    async fn trading_rules(&self, _symbol: &str) -> Result<TradingRuleSet> {
        Ok(TradingRuleSet {
            base_precision: 2,
            step_size: d("0.01"),
            min_quantity: d("0.01"),
            tick_size: d("0.01"),
        })
    }

    async fn tradable_symbols(&self, _quote_asset: &str) -> Result<Vec<SymbolInfo>> {
        Ok(vec![SymbolInfo {
            symbol: "SOLUSDT".into(),
            status: "TRADING".into(),
            base_asset: "SOL".into(),
            quote_asset: "USDT".into(),
            base_asset_precision: 2,
            filters: Vec::new(),
        }])
    }
}

struct FixedOracle(HashMap<&'static str, Decimal>);

#[async_trait]
impl PriceOracle for FixedOracle {
    async fn price(&self, address: &str, _chain: &str) -> Result<Decimal> {
        self.0
            .get(address)
            .copied()
            .ok_or_else(|| Error::OracleUnavailable(format!("no pool for {address}")))
    }
}

#[derive(Default)]
struct Exchange {
    reject: bool,
    account_calls: StdMutex<usize>,
    submitted: StdMutex<Vec<OrderIntent>>,
}

#[async_trait]
impl OrderSubmitter for Exchange {
    async fn submit(&self, order: &OrderIntent, _creds: &Credentials) -> Result<OrderAck> {
        if self.reject {
            return Err(Error::Exchange("code -2010: insufficient balance".into()));
        }
        self.submitted.lock().unwrap().push(order.clone());
        Ok(OrderAck {
            symbol: order.symbol.clone(),
            order_id: 99,
            client_order_id: order.client_order_id.clone(),
            status: "NEW".into(),
            side: order.side,
            order_type: order.order_type.to_string(),
            price: order.price,
            orig_qty: order.quantity,
            executed_qty: Decimal::ZERO,
        })
    }

    async fn cancel_open_orders(&self, symbol: &str, _creds: &Credentials) -> Result<Vec<CancelAck>> {
        Ok(vec![CancelAck {
            symbol: symbol.into(),
            order_id: 5,
            client_order_id: "c5".into(),
            status: "CANCELED".into(),
        }])
    }

    async fn open_orders(&self, _creds: &Credentials) -> Result<Vec<OrderAck>> {
        Ok(Vec::new())
    }

    async fn account(&self, _creds: &Credentials) -> Result<AccountInfo> {
        *self.account_calls.lock().unwrap() += 1;
        Ok(AccountInfo {
            can_trade: true,
            balances: Vec::new(),
        })
    }
}

const STRATEGY: &str = r#"
symbol = "SOLUSDT"
quote_asset = "USDT"
timeframe = "1h"
threshold = 0.01
chain = "bsc"

[tokens]
reference_base = "0xsol"
current_base = "0xbusd"
quote = "0xusdt"
"#;

fn app(exchange: Arc<Exchange>, admin_token: Option<&str>) -> Router {
    let oracle = Arc::new(FixedOracle(HashMap::from([
        ("0xsol", d("150")),
        ("0xbusd", d("1")),
        ("0xusdt", d("1")),
    ])));
    let pipeline = TradePipeline::new(
        Arc::new(UpStreakMarket),
        oracle.clone(),
        exchange,
        Credentials::new("key", "secret"),
        StrategyConfig::parse(STRATEGY).unwrap(),
    );
    router(AppState {
        pipeline: Arc::new(Mutex::new(pipeline)),
        oracle,
        whale_address: WHALE.into(),
        default_chain: "bsc".into(),
        admin_token: admin_token.map(Into::into),
    })
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn webhook(body: Value) -> Request<Body> {
    Request::post("/webhook")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn healthz_is_ok() {
    let req = Request::get("/healthz").body(Body::empty()).unwrap();
    let (status, body) = send(app(Arc::default(), None), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["watching"], WHALE);
}

#[tokio::test(start_paused = true)]
async fn transfer_to_whale_places_buy_order() {
    let exchange = Arc::new(Exchange::default());
    let payload = json!({
        "confirmed": true,
        "txs": [{"hash": "0xh1", "fromAddress": "0xabc", "toAddress": WHALE.to_lowercase()}]
    });

    let (status, body) = send(app(exchange.clone(), None), webhook(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["trigger"], "buy");
    assert_eq!(body["results"][0]["result"]["outcome"], "submitted");
    assert_eq!(body["results"][0]["result"]["ack"]["order_id"], 99);
    assert_eq!(exchange.submitted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unrelated_transfer_is_ignored() {
    let exchange = Arc::new(Exchange::default());
    let payload = json!({
        "txs": [{"hash": "0xh2", "fromAddress": "0xabc", "toAddress": "0xdef"}]
    });

    let (status, body) = send(app(exchange.clone(), None), webhook(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["trigger"], "ignore");
    assert_eq!(*exchange.account_calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn empty_delivery_is_acknowledged() {
    let (status, body) = send(app(Arc::default(), None), webhook(json!({"txs": []}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([]));
}

#[tokio::test(start_paused = true)]
async fn exchange_rejection_is_reported_with_200() {
    let exchange = Arc::new(Exchange {
        reject: true,
        ..Default::default()
    });
    let payload = json!({
        "txs": [{"hash": "0xh3", "fromAddress": "0xabc", "toAddress": WHALE}]
    });

    let (status, body) = send(app(exchange, None), webhook(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["trigger"], "buy");
    let error = body["results"][0]["error"].as_str().unwrap();
    assert!(error.contains("insufficient balance"), "{error}");
}

#[tokio::test]
async fn malformed_delivery_is_client_error() {
    let req = Request::post("/webhook")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"txs": [{"hash": "0x"}]}"#))
        .unwrap();
    let (status, _) = send(app(Arc::default(), None), req).await;

    assert!(status.is_client_error(), "{status}");
}

#[tokio::test]
async fn get_price_proxies_oracle() {
    let req = Request::get("/getPrice?address=0xsol&chain=bsc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(Arc::default(), None), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], "0xsol");
    assert_eq!(body["chain"], "bsc");
    assert_eq!(body["usdPrice"], "150");
}

#[tokio::test]
async fn get_price_for_unknown_token_is_bad_gateway() {
    let req = Request::get("/getPrice?address=0xnope")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(Arc::default(), None), req).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("0xnope"));
}

#[tokio::test]
async fn order_routes_absent_without_admin_token() {
    let req = Request::get("/orders").body(Body::empty()).unwrap();
    let (status, _) = send(app(Arc::default(), None), req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_routes_require_bearer_token() {
    let req = Request::get("/orders")
        .header("Authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(Arc::default(), Some(TOKEN)), req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn cancel_orders_with_token() {
    let req = Request::delete("/orders")
        .header("Authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(Arc::default(), Some(TOKEN)), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "SOLUSDT");
    assert_eq!(body["cancelled"][0]["order_id"], 5);
}

#[tokio::test]
async fn place_limit_order_with_token() {
    let exchange = Arc::new(Exchange::default());
    let req = Request::post("/orders")
        .header("Authorization", format!("Bearer {TOKEN}"))
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({"type": "limit", "side": "BUY", "quantity": "0.5", "price": "100"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(app(exchange.clone(), Some(TOKEN)), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ack"]["order_type"], "LIMIT");
    let submitted = exchange.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].symbol, "SOLUSDT");
}

#[tokio::test]
async fn place_order_with_negative_price_is_bad_request() {
    let req = Request::post("/orders")
        .header("Authorization", format!("Bearer {TOKEN}"))
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({"type": "limit", "side": "SELL", "quantity": "1", "price": "-3"}).to_string(),
        ))
        .unwrap();
    let (status, _) = send(app(Arc::default(), Some(TOKEN)), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
