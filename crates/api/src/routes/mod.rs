mod health;
mod orders;
mod price;
mod webhook;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use common::Error;

pub use health::health_router;
pub use orders::orders_router;
pub use price::price_router;
pub use webhook::{classify, webhook_router, StreamPayload, StreamTx};

/// Status and JSON body for a failed request.
fn error_response(err: &Error) -> (StatusCode, Json<Value>) {
    let status = match err {
        Error::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        Error::Exchange(_) | Error::OracleUnavailable(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": err.to_string()})))
}
