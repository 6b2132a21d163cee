use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use common::{
    CancelAck, Credentials, Error, MarketDataProvider, OrderAck, OrderIntent, OrderSide,
    OrderSubmitter, PriceOracle, Result, SymbolInfo, TriggerEvent,
};
use strategy::{analyze_symbols, build_order, check_pair_relation, check_ratio_relation, StrategyConfig};

/// How a trade cycle ended when no error occurred.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// The trigger was not a whale transfer.
    Ignored,
    /// The exchange account is not permitted to trade.
    AccountCannotTrade,
    /// Buy trigger, but the current ratio is not below the reference ratio.
    RatioGateClosed {
        current_ratio: Decimal,
        reference_ratio: Decimal,
    },
    /// No qualifying candle streak.
    NoSignal { side: OrderSide },
    Submitted { ack: OrderAck },
}

/// Operator-placed order on the configured symbol, outside the whale flow.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManualOrder {
    Limit {
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    },
    StopLossLimit {
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
        price: Decimal,
    },
    TakeProfitLimit {
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
        price: Decimal,
    },
}

impl ManualOrder {
    /// Intent for `symbol`. Quantity and prices must be positive.
    pub fn into_intent(self, symbol: &str) -> Result<OrderIntent> {
        let (quantity, stop_price, price) = match &self {
            ManualOrder::Limit { quantity, price, .. } => (*quantity, None, *price),
            ManualOrder::StopLossLimit {
                quantity,
                stop_price,
                price,
                ..
            }
            | ManualOrder::TakeProfitLimit {
                quantity,
                stop_price,
                price,
                ..
            } => (*quantity, Some(*stop_price), *price),
        };
        if quantity <= Decimal::ZERO {
            return Err(Error::InvalidParameter(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        if price <= Decimal::ZERO || stop_price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(Error::InvalidParameter(format!(
                "prices must be positive, got price {price} stop {stop_price:?}"
            )));
        }

        Ok(match self {
            ManualOrder::Limit {
                side,
                quantity,
                price,
            } => OrderIntent::limit(symbol, side, quantity, price),
            ManualOrder::StopLossLimit {
                side,
                quantity,
                stop_price,
                price,
            } => OrderIntent::stop_loss_limit(symbol, side, quantity, stop_price, price),
            ManualOrder::TakeProfitLimit {
                side,
                quantity,
                stop_price,
                price,
            } => OrderIntent::take_profit_limit(symbol, side, quantity, stop_price, price),
        })
    }
}

/// One whale trigger in, at most one order out.
///
/// Cycles must not overlap; callers hold the pipeline behind a mutex.
pub struct TradePipeline {
    market: Arc<dyn MarketDataProvider>,
    oracle: Arc<dyn PriceOracle>,
    submitter: Arc<dyn OrderSubmitter>,
    credentials: Credentials,
    strategy: StrategyConfig,
}

impl TradePipeline {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        oracle: Arc<dyn PriceOracle>,
        submitter: Arc<dyn OrderSubmitter>,
        credentials: Credentials,
        strategy: StrategyConfig,
    ) -> Self {
        Self {
            market,
            oracle,
            submitter,
            credentials,
            strategy,
        }
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    /// Run one full cycle for `trigger`.
    pub async fn execute(&self, trigger: TriggerEvent) -> Result<PipelineOutcome> {
        let Some(side) = trigger.side() else {
            info!("No whale in transaction, nothing to do");
            return Ok(PipelineOutcome::Ignored);
        };
        info!(%trigger, symbol = %self.strategy.symbol, "Whale trigger received");

        let account = self.submitter.account(&self.credentials).await?;
        if !account.can_trade {
            warn!("Exchange account cannot trade, skipping cycle");
            return Ok(PipelineOutcome::AccountCannotTrade);
        }
        info!("Account is ready to trade");

        let tokens = &self.strategy.tokens;
        let chain = &self.strategy.chain;
        let reference_ratio =
            check_pair_relation(&*self.oracle, &tokens.reference_base, &tokens.quote, chain)
                .await?;
        let current_ratio =
            check_pair_relation(&*self.oracle, &tokens.current_base, &tokens.quote, chain).await?;
        info!(reference_ratio = %reference_ratio, current_ratio = %current_ratio, "Pair ratios");

        let candidates = self.candidates().await?;

        if side == OrderSide::Buy && !check_ratio_relation(current_ratio, reference_ratio) {
            info!("Ratio gate closed, not buying");
            return Ok(PipelineOutcome::RatioGateClosed {
                current_ratio,
                reference_ratio,
            });
        }

        let hit = analyze_symbols(
            &*self.market,
            &candidates,
            &self.strategy.timeframe,
            self.strategy.threshold,
            side,
            self.strategy.scan_mode,
        )
        .await?;
        if !hit {
            info!(%side, "No streak, not trading");
            return Ok(PipelineOutcome::NoSignal { side });
        }

        let symbol = &self.strategy.symbol;
        let rules = self.market.trading_rules(symbol).await?;
        let candles = self.market.candles(symbol, &self.strategy.timeframe, 1).await?;
        let last = candles.last().ok_or(Error::InsufficientData { needed: 1, got: 0 })?;

        let order = build_order(side, symbol, last.close, &rules, &self.strategy.order_params())?;
        let ack = self.submitter.submit(&order, &self.credentials).await?;
        info!(
            order_id = ack.order_id,
            status = %ack.status,
            client_order_id = %ack.client_order_id,
            "Order accepted"
        );
        Ok(PipelineOutcome::Submitted { ack })
    }

    /// Tradable listings for the configured quote asset, narrowed to the
    /// configured symbol.
    async fn candidates(&self) -> Result<Vec<SymbolInfo>> {
        let symbol = &self.strategy.symbol;
        let candidates: Vec<SymbolInfo> = self
            .market
            .tradable_symbols(&self.strategy.quote_asset)
            .await?
            .into_iter()
            .filter(|s| &s.symbol == symbol)
            .collect();

        if candidates.is_empty() {
            return Err(Error::RuleNotFound {
                symbol: symbol.clone(),
                filter: format!("tradable listing quoted in {}", self.strategy.quote_asset),
            });
        }
        Ok(candidates)
    }

    /// Submit an operator order on the configured symbol.
    pub async fn place_manual(&self, order: ManualOrder) -> Result<OrderAck> {
        let intent = order.into_intent(&self.strategy.symbol)?;
        info!(
            symbol = %intent.symbol,
            side = %intent.side,
            order_type = %intent.order_type,
            quantity = %intent.quantity,
            price = %intent.price,
            "Placing manual order"
        );
        let ack = self.submitter.submit(&intent, &self.credentials).await?;
        info!(order_id = ack.order_id, status = %ack.status, "Manual order accepted");
        Ok(ack)
    }

    pub async fn open_orders(&self) -> Result<Vec<OrderAck>> {
        self.submitter.open_orders(&self.credentials).await
    }

    /// Cancel every open order on the configured symbol.
    pub async fn cancel_open_orders(&self) -> Result<Vec<CancelAck>> {
        let cancelled = self
            .submitter
            .cancel_open_orders(&self.strategy.symbol, &self.credentials)
            .await?;
        info!(symbol = %self.strategy.symbol, count = cancelled.len(), "Cancelled open orders");
        Ok(cancelled)
    }
}
