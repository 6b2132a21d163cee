pub mod binance;
pub mod moralis;
pub mod pipeline;

pub use binance::BinanceClient;
pub use moralis::MoralisClient;
pub use pipeline::{ManualOrder, PipelineOutcome, TradePipeline};
