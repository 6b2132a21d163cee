mod auth;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

use common::{PriceOracle, Result};
use engine::TradePipeline;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    /// Locked for the whole of a trade cycle so cycles never overlap.
    pub pipeline: Arc<Mutex<TradePipeline>>,
    pub oracle: Arc<dyn PriceOracle>,
    /// Watched address, compared case-insensitively.
    pub whale_address: String,
    /// Chain used by `/getPrice` when the query does not name one.
    pub default_chain: String,
    pub admin_token: Option<String>,
}

/// All routes with tracing. Order routes are only mounted when an admin
/// token is configured.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .merge(routes::webhook_router())
        .merge(routes::price_router())
        .merge(routes::health_router());

    if state.admin_token.is_some() {
        app = app.merge(routes::orders_router(state.clone()));
    }

    app.with_state(state).layer(TraceLayer::new_for_http())
}

/// Bind and run the webhook server until the process exits.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    info!(%addr, "Webhook server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
