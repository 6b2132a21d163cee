use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, OrderIntent, OrderSide, Result, TradingRuleSet};

/// Sizing inputs that are configuration, not market data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParams {
    /// Quote-currency budget per order.
    pub notional: Decimal,
    /// Trailing stop band in basis points.
    pub trailing_delta: u32,
}

impl Default for OrderParams {
    fn default() -> Self {
        Self {
            notional: Decimal::new(1, 1),
            trailing_delta: 100,
        }
    }
}

/// Nearest multiple of `tick_size`. Ties round half away from zero.
pub fn round_to_tick(price: Decimal, tick_size: Decimal) -> Result<Decimal> {
    if tick_size <= Decimal::ZERO {
        return Err(Error::InvalidParameter(format!(
            "tick size must be positive, got {tick_size}"
        )));
    }
    let ticks = (price / tick_size).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    Ok(ticks * tick_size)
}

/// Quantity that spends at most `notional` at `price`: floored to a
/// multiple of the step size, truncated to the base precision, then raised to
/// the minimum quantity if it fell below it.
pub fn order_quantity(notional: Decimal, price: Decimal, rules: &TradingRuleSet) -> Result<Decimal> {
    let raw = notional
        .checked_div(price)
        .ok_or_else(|| Error::InvalidParameter(format!("cannot size an order at price {price}")))?;
    let remainder = raw
        .checked_rem(rules.step_size)
        .ok_or_else(|| Error::InvalidParameter(format!("bad step size {}", rules.step_size)))?;
    let stepped = (raw - remainder)
        .round_dp_with_strategy(rules.base_precision, RoundingStrategy::ToZero);
    Ok(stepped.max(rules.min_quantity))
}

/// Build the trailing stop-loss-limit order for a decided direction.
///
/// Buy: limit price is the last close plus 1%, rounded to the tick size, and
/// the quantity is sized against that price.
/// Sell: limit price is the unadjusted last close and the quantity is sized
/// against it too. The 1% sell stop is only logged.
pub fn build_order(
    side: OrderSide,
    symbol: &str,
    last_close: Decimal,
    rules: &TradingRuleSet,
    params: &OrderParams,
) -> Result<OrderIntent> {
    validate_rules(symbol, rules)?;
    if last_close <= Decimal::ZERO {
        return Err(Error::InvalidCandle(format!(
            "last close for {symbol} must be positive, got {last_close}"
        )));
    }
    if params.notional <= Decimal::ZERO {
        return Err(Error::InvalidParameter(format!(
            "notional must be positive, got {}",
            params.notional
        )));
    }

    let (price, quantity) = match side {
        OrderSide::Buy => {
            let buy_stop = round_to_tick(last_close * Decimal::new(101, 2), rules.tick_size)?;
            let quantity = order_quantity(params.notional, buy_stop, rules)?;
            (buy_stop, quantity)
        }
        OrderSide::Sell => {
            let sell_stop = last_close * Decimal::new(99, 2);
            info!(%symbol, sell_stop = %sell_stop, "Sell stop (informational)");
            let quantity = order_quantity(params.notional, last_close, rules)?;
            (last_close, quantity)
        }
    };

    info!(
        %symbol,
        %side,
        price = %price,
        quantity = %quantity,
        trailing_delta = params.trailing_delta,
        "Order parameters computed"
    );

    Ok(OrderIntent::trailing_stop_loss_limit(
        symbol,
        side,
        quantity,
        price,
        params.trailing_delta,
    ))
}

fn validate_rules(symbol: &str, rules: &TradingRuleSet) -> Result<()> {
    let invalid = |reason: String| Error::InvalidTradingRule {
        symbol: symbol.to_string(),
        reason,
    };
    if rules.tick_size <= Decimal::ZERO {
        return Err(invalid(format!("tick size {} is not positive", rules.tick_size)));
    }
    if rules.step_size <= Decimal::ZERO {
        return Err(invalid(format!("step size {} is not positive", rules.step_size)));
    }
    if rules.min_quantity < Decimal::ZERO {
        return Err(invalid(format!("min quantity {} is negative", rules.min_quantity)));
    }
    Ok(())
}
