pub mod position;
pub mod price_candle;

// Re-export for easier access
pub use position::LiquidityPosition;
pub use price_candle::{Candle, CandleSeries, Gap};
