//! File-backed repositories for price input and decomposition output.

mod price_repository;
mod report_repository;
mod result_repository;

pub use price_repository::{PriceRecord, PriceRepository, PriceSeriesSource, parse_timestamp};
pub use report_repository::SweepTableRow;
pub use result_repository::{
    DEFAULT_TOTALS_TOLERANCE, ResultRepository, SimulationResultRecord, totals_match,
};
