use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api::AppState;
use common::Config;
use engine::{BinanceClient, MoralisClient, TradePipeline};
use strategy::StrategyConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("loading environment configuration")?;
    let strategy = StrategyConfig::load(&cfg.strategy_config_path)
        .with_context(|| format!("loading strategy from {}", cfg.strategy_config_path))?;
    info!(
        symbol = %strategy.symbol,
        timeframe = %strategy.timeframe,
        threshold = %strategy.threshold,
        scan_mode = ?strategy.scan_mode,
        trading_url = %cfg.binance_trading_url,
        "WhaleBot starting"
    );

    // ── Collaborators ─────────────────────────────────────────────────────────
    let binance = Arc::new(
        BinanceClient::new(
            &cfg.binance_market_url,
            &cfg.binance_trading_url,
            cfg.http_timeout,
        )
        .context("building Binance client")?,
    );
    let oracle = Arc::new(
        MoralisClient::new(&cfg.moralis_api_key, &cfg.moralis_base_url, cfg.http_timeout)
            .context("building Moralis client")?,
    );

    binance
        .system_status()
        .await
        .context("Binance system status check")?;
    match binance.server_time().await {
        Ok(time) => info!(server_time = %time, "Binance reachable"),
        Err(e) => warn!(error = %e, "Could not read Binance server time"),
    }

    // ── Pipeline + webhook server ─────────────────────────────────────────────
    let chain = strategy.chain.clone();
    let pipeline = TradePipeline::new(
        binance.clone(),
        oracle.clone(),
        binance,
        cfg.binance.clone(),
        strategy,
    );

    if cfg.admin_token.is_none() {
        info!("ADMIN_TOKEN not set, order routes disabled");
    }

    let state = AppState {
        pipeline: Arc::new(Mutex::new(pipeline)),
        oracle,
        whale_address: cfg.whale_address.clone(),
        default_chain: chain,
        admin_token: cfg.admin_token.clone(),
    };

    info!(whale = %cfg.whale_address, port = cfg.webhook_port, "Watching whale address");
    api::serve(state, cfg.webhook_port)
        .await
        .context("webhook server")?;
    Ok(())
}
