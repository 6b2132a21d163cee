use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use common::{
    Candle, CandleDirection, Error, MarketDataProvider, OrderSide, Result, Signal, SymbolInfo,
};

/// Number of consecutive candles that make a streak.
pub const STREAK_LEN: usize = 3;

/// Courtesy pause toward the market data API after every symbol check.
pub const RATE_LIMIT_PAUSE: Duration = Duration::from_secs(1);

/// How `analyze_symbols` walks its candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Evaluate the first candidate and return its result. The remaining
    /// candidates are never looked at.
    #[default]
    FirstOnly,
    /// Evaluate candidates in order and stop at the first streak.
    AnyCandidate,
}

/// Relative move of a candle body: `(close - open) / open`.
pub fn percentage_change(open: Decimal, close: Decimal) -> Result<Decimal> {
    if open <= Decimal::ZERO {
        return Err(Error::InvalidCandle(format!(
            "open price must be positive, got {open}"
        )));
    }
    Ok((close - open) / open)
}

/// Candle colour a streak must have to support `side`.
pub fn streak_direction(side: OrderSide) -> CandleDirection {
    match side {
        OrderSide::Buy => CandleDirection::Up,
        OrderSide::Sell => CandleDirection::Down,
    }
}

/// True when the last [`STREAK_LEN`] candles all have colour `color` and each
/// moved by at least `threshold` in that direction.
///
/// Up candles need `change >= threshold`, down candles `change <= -threshold`.
/// Every change in the window is computed and logged, oldest first, before
/// the result is combined, so a malformed candle anywhere in the window is an
/// error even when an earlier candle already has the wrong colour.
pub fn evaluate(candles: &[Candle], threshold: Decimal, color: CandleDirection) -> Result<bool> {
    if threshold <= Decimal::ZERO {
        return Err(Error::InvalidParameter(format!(
            "streak threshold must be positive, got {threshold}"
        )));
    }
    if candles.len() < STREAK_LEN {
        return Err(Error::InsufficientData {
            needed: STREAK_LEN,
            got: candles.len(),
        });
    }

    let window = &candles[candles.len() - STREAK_LEN..];
    let changes = window
        .iter()
        .map(|c| percentage_change(c.open, c.close))
        .collect::<Result<Vec<_>>>()?;

    for (n, (candle, change)) in window.iter().zip(&changes).enumerate() {
        info!(
            position = n + 1,
            direction = %candle.direction(),
            change = %change,
            "Candle change"
        );
    }

    if window.iter().any(|c| c.direction() != color) {
        return Ok(false);
    }

    let all_pass = changes.iter().all(|&change| match color {
        CandleDirection::Up => change >= threshold,
        CandleDirection::Down => change <= -threshold,
    });
    Ok(all_pass)
}

/// Buy on an up streak, sell on a down streak, otherwise nothing.
pub fn streak_signal(candles: &[Candle], threshold: Decimal) -> Result<Signal> {
    if evaluate(candles, threshold, CandleDirection::Up)? {
        Ok(Signal::Buy)
    } else if evaluate(candles, threshold, CandleDirection::Down)? {
        Ok(Signal::Sell)
    } else {
        Ok(Signal::None)
    }
}

/// Fetch the latest candles for the candidates and look for a streak that
/// supports `side`.
///
/// With [`ScanMode::FirstOnly`] only the first candidate is ever evaluated.
/// A [`RATE_LIMIT_PAUSE`] follows each evaluation whatever its result.
pub async fn analyze_symbols(
    provider: &dyn MarketDataProvider,
    candidates: &[SymbolInfo],
    timeframe: &str,
    threshold: Decimal,
    side: OrderSide,
    mode: ScanMode,
) -> Result<bool> {
    let color = streak_direction(side);

    for candidate in candidates {
        let outcome = match provider
            .candles(&candidate.symbol, timeframe, STREAK_LEN as u16)
            .await
        {
            Ok(candles) => evaluate(&candles, threshold, color),
            Err(e) => Err(e),
        };

        // Pause even when the check failed.
        tokio::time::sleep(RATE_LIMIT_PAUSE).await;
        let hit = outcome?;

        if hit {
            info!(symbol = %candidate.symbol, %color, "{STREAK_LEN} consecutive candles in streak");
        } else {
            info!(symbol = %candidate.symbol, %color, "No streak");
        }

        match mode {
            ScanMode::FirstOnly => return Ok(hit),
            ScanMode::AnyCandidate if hit => return Ok(true),
            ScanMode::AnyCandidate => {}
        }
    }

    Ok(false)
}
