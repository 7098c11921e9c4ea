pub mod backtest_summary;
pub mod price;
pub mod price_range;
pub mod simulation_result;

pub use backtest_summary::{BacktestSummary, ParamKey};
pub use price::Price;
pub use price_range::PriceRange;
pub use simulation_result::{CumulativeTotals, SimulationResult, StepIncrements};
