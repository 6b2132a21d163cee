//! Trade-signal evaluation and order sizing.
//!
//! Everything here is pure over already-fetched data except
//! [`analyze_symbols`] and [`check_pair_relation`], which read through the
//! collaborator traits in `common`.

pub mod config;
pub mod order_params;
pub mod ratio;
pub mod streak;

pub use config::{StrategyConfig, TokenAddresses};
pub use order_params::{build_order, order_quantity, round_to_tick, OrderParams};
pub use ratio::{check_pair_relation, check_ratio_relation};
pub use streak::{
    analyze_symbols, evaluate, percentage_change, streak_direction, streak_signal, ScanMode,
    RATE_LIMIT_PAUSE, STREAK_LEN,
};
