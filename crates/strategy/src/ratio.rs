use rust_decimal::Decimal;
use tracing::debug;

use common::{Error, PriceOracle, Result};

/// Gate for the buy path: open while the current ratio sits strictly below
/// the reference ratio. Equal ratios keep the gate closed.
pub fn check_ratio_relation(current_ratio: Decimal, reference_ratio: Decimal) -> bool {
    current_ratio < reference_ratio
}

/// Price of `base_address` expressed in units of `quote_address`, both looked
/// up on `chain`.
pub async fn check_pair_relation(
    oracle: &dyn PriceOracle,
    base_address: &str,
    quote_address: &str,
    chain: &str,
) -> Result<Decimal> {
    let base = oracle.price(base_address, chain).await?;
    let quote = oracle.price(quote_address, chain).await?;

    if quote.is_zero() {
        return Err(Error::OracleUnavailable(format!(
            "zero price for {quote_address} on {chain}"
        )));
    }

    let ratio = base / quote;
    debug!(base = %base, quote = %quote, ratio = %ratio, "Pair relation");
    Ok(ratio)
}
