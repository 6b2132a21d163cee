use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::error_response;
use crate::AppState;

pub fn price_router() -> Router<AppState> {
    Router::new().route("/getPrice", get(get_price))
}

#[derive(Deserialize)]
struct PriceQuery {
    address: String,
    chain: Option<String>,
}

async fn get_price(
    State(state): State<AppState>,
    Query(q): Query<PriceQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let chain = q.chain.unwrap_or_else(|| state.default_chain.clone());

    match state.oracle.price(&q.address, &chain).await {
        Ok(price) => Ok(Json(json!({
            "address": q.address,
            "chain": chain,
            "usdPrice": price,
        }))),
        Err(e) => {
            warn!(address = %q.address, %chain, error = %e, "Price lookup failed");
            Err(error_response(&e))
        }
    }
}
