use proptest::prelude::*;
use rust_decimal::Decimal;

use common::{OrderSide, TradingRuleSet};
use strategy::{build_order, order_quantity, round_to_tick, OrderParams};

fn rules(step_scale: u32, min_steps: i64, precision: u32) -> TradingRuleSet {
    let step = Decimal::new(1, step_scale);
    TradingRuleSet {
        base_precision: precision,
        step_size: step,
        min_quantity: step * Decimal::from(min_steps),
        tick_size: Decimal::new(1, 2),
    }
}

proptest! {
    /// Sized quantities are never below the minimum and always land on the step grid.
    #[test]
    fn quantity_respects_min_and_step(
        notional_cents in 1i64..100_000_000,
        price_cents in 1i64..10_000_000,
        step_scale in 0u32..=6,
        min_steps in 0i64..10,
        extra_precision in 0u32..=4,
    ) {
        let rules = rules(step_scale, min_steps, step_scale + extra_precision);
        let qty = order_quantity(
            Decimal::new(notional_cents, 2),
            Decimal::new(price_cents, 2),
            &rules,
        ).unwrap();

        prop_assert!(qty >= rules.min_quantity);
        prop_assert!((qty % rules.step_size).is_zero(), "{qty} not a multiple of {}", rules.step_size);
    }

    /// Above the minimum, the order never spends more than its notional.
    #[test]
    fn quantity_never_overspends(
        notional_cents in 1i64..100_000_000,
        price_cents in 1i64..10_000_000,
        step_scale in 0u32..=6,
    ) {
        let rules = rules(step_scale, 0, 8);
        let notional = Decimal::new(notional_cents, 2);
        let price = Decimal::new(price_cents, 2);
        let qty = order_quantity(notional, price, &rules).unwrap();
        prop_assert!(qty * price <= notional);
    }

    /// Tick rounding lands on the grid and moves the price by at most half a tick.
    #[test]
    fn tick_rounding_is_nearest(price_millis in 1i64..100_000_000, tick_scale in 0u32..=4) {
        let price = Decimal::new(price_millis, 3);
        let tick = Decimal::new(5, tick_scale);
        let rounded = round_to_tick(price, tick).unwrap();
        prop_assert!((rounded % tick).is_zero());
        prop_assert!((rounded - price).abs() * Decimal::TWO <= tick);
    }

    /// Buy and sell orders never panic and always carry the trailing delta.
    #[test]
    fn build_order_never_panics(close_cents in 1i64..10_000_000, sell in any::<bool>()) {
        let side = if sell { OrderSide::Sell } else { OrderSide::Buy };
        let order = build_order(
            side,
            "TESTUSDT",
            Decimal::new(close_cents, 2),
            &rules(3, 1, 8),
            &OrderParams::default(),
        ).unwrap();
        prop_assert_eq!(order.trailing_delta, Some(100));
        prop_assert!(order.quantity >= Decimal::new(1, 3));
    }
}
