//! Price series loading and result persistence.
//!
//! - [`repositories::PriceRepository`] reads an OHLCV CSV into a validated
//!   [`CandleSeries`](clmm_lvr_domain::entities::CandleSeries)
//! - [`repositories::ResultRepository`] writes and re-reads per-step results,
//!   run summaries and sweep tables

pub mod error;
pub mod repositories;

pub use error::DataError;
