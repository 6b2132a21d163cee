use axum::{extract::State, http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::error;

use engine::ManualOrder;

use super::error_response;
use crate::{auth::require_admin, AppState};

/// Open-order listing, manual placement and cancellation, behind the admin
/// token.
pub fn orders_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            get(list_orders).post(place_order).delete(cancel_orders),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let pipeline = state.pipeline.lock().await;
    let orders = pipeline.open_orders().await.map_err(|e| {
        error!(error = %e, "Failed to list open orders");
        error_response(&e)
    })?;
    Ok(Json(json!({ "orders": orders })))
}

async fn place_order(
    State(state): State<AppState>,
    Json(order): Json<ManualOrder>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let pipeline = state.pipeline.lock().await;
    let ack = pipeline.place_manual(order).await.map_err(|e| {
        error!(error = %e, "Manual order failed");
        error_response(&e)
    })?;
    Ok(Json(json!({ "ack": ack })))
}

async fn cancel_orders(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let pipeline = state.pipeline.lock().await;
    let cancelled = pipeline.cancel_open_orders().await.map_err(|e| {
        error!(error = %e, "Failed to cancel open orders");
        error_response(&e)
    })?;
    Ok(Json(json!({
        "symbol": pipeline.strategy().symbol,
        "cancelled": cancelled,
    })))
}
