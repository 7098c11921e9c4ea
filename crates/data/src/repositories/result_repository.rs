//! Per-step decomposition results persisted as CSV.

use crate::error::DataError;
use chrono::{DateTime, Utc};
use clmm_lvr_domain::DataIntegrityError;
use clmm_lvr_domain::value_objects::{CumulativeTotals, Price, SimulationResult, StepIncrements};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default relative tolerance for [`totals_match`].
pub const DEFAULT_TOTALS_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// One CSV row of decomposition output. Decimals are written as exact strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResultRecord {
    /// Candle timestamp, RFC 3339.
    pub timestamp: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub fee_accrued: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub lvr_increment: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub impermanent_loss_pct: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub opportunity_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub cumulative_fees: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub cumulative_lvr: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub cumulative_opportunity_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub net_pnl: Decimal,
}

impl From<&SimulationResult> for SimulationResultRecord {
    fn from(r: &SimulationResult) -> Self {
        Self {
            timestamp: r.timestamp(),
            price: r.price().value(),
            fee_accrued: r.fee_accrued(),
            lvr_increment: r.lvr_increment(),
            impermanent_loss_pct: r.impermanent_loss_pct(),
            opportunity_cost: r.opportunity_cost(),
            cumulative_fees: r.cumulative_fees(),
            cumulative_lvr: r.cumulative_lvr(),
            cumulative_opportunity_cost: r.cumulative_opportunity_cost(),
            net_pnl: r.net_pnl(),
        }
    }
}

impl SimulationResultRecord {
    /// Rebuilds the result row, checking the net PnL identity.
    ///
    /// # Errors
    /// [`DataIntegrityError::Malformed`] for a non-positive price, a negative
    /// term, or a `net_pnl` that differs from `fees - lvr - opportunity_cost`.
    pub fn into_result(self, row: usize) -> Result<SimulationResult, DataIntegrityError> {
        let malformed = |reason: String| DataIntegrityError::Malformed { row, reason };
        let price = Price::new(self.price).map_err(|e| malformed(e.to_string()))?;
        let step = StepIncrements {
            fee_accrued: self.fee_accrued,
            lvr_increment: self.lvr_increment,
            impermanent_loss_pct: self.impermanent_loss_pct,
            opportunity_cost: self.opportunity_cost,
        };
        let totals = CumulativeTotals {
            fees: self.cumulative_fees,
            lvr: self.cumulative_lvr,
            opportunity_cost: self.cumulative_opportunity_cost,
        };
        let result = SimulationResult::new(self.timestamp, price, step, totals)
            .map_err(|e| malformed(e.to_string()))?;
        if result.net_pnl() != self.net_pnl {
            return Err(malformed(format!(
                "net_pnl {} does not equal fees - lvr - opportunity cost = {}",
                self.net_pnl,
                result.net_pnl()
            )));
        }
        Ok(result)
    }
}

/// Whether two sets of totals agree within `tolerance`, relative to the larger
/// magnitude (absolute for magnitudes below one).
#[must_use]
pub fn totals_match(a: &CumulativeTotals, b: &CumulativeTotals, tolerance: Decimal) -> bool {
    let close = |x: Decimal, y: Decimal| {
        let scale = x.abs().max(y.abs()).max(Decimal::ONE);
        (x - y).abs() <= tolerance * scale
    };
    close(a.fees, b.fees)
        && close(a.lvr, b.lvr)
        && close(a.opportunity_cost, b.opportunity_cost)
}

/// Repository writing run outputs under a root directory.
#[derive(Debug, Clone)]
pub struct ResultRepository {
    root: PathBuf,
}

impl ResultRepository {
    /// Creates a repository rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn file(&self, name: &str, extension: &str) -> Result<PathBuf, DataError> {
        fs::create_dir_all(&self.root).map_err(|e| DataError::io(&self.root, e))?;
        Ok(self.root.join(format!("{name}.{extension}")))
    }

    /// Writes results as CSV to any writer.
    ///
    /// # Errors
    /// Returns an error if a row cannot be written.
    pub fn write_results<W: Write>(writer: W, results: &[SimulationResult]) -> Result<(), DataError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for result in results {
            wtr.serialize(SimulationResultRecord::from(result))?;
        }
        wtr.flush().map_err(|e| DataError::io("<results writer>", e))?;
        Ok(())
    }

    /// Reads results from CSV, validating each row and the running totals.
    ///
    /// # Errors
    /// [`DataError::Integrity`] identifying the first inconsistent row.
    pub fn read_results<R: Read>(reader: R) -> Result<Vec<SimulationResult>, DataError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut results: Vec<SimulationResult> = Vec::new();
        for (row, record) in rdr.deserialize::<SimulationResultRecord>().enumerate() {
            let record = record.map_err(|e| DataIntegrityError::Malformed {
                row,
                reason: e.to_string(),
            })?;
            let result = record.into_result(row)?;

            let previous = results.last().map(SimulationResult::totals).unwrap_or_default();
            let expected = previous.accrue(&StepIncrements {
                fee_accrued: result.fee_accrued(),
                lvr_increment: result.lvr_increment(),
                impermanent_loss_pct: result.impermanent_loss_pct(),
                opportunity_cost: result.opportunity_cost(),
            });
            if expected != result.totals() {
                return Err(DataIntegrityError::Malformed {
                    row,
                    reason: "cumulative totals do not follow the increments".to_string(),
                }
                .into());
            }
            results.push(result);
        }
        Ok(results)
    }

    /// Saves results as `<root>/<name>.csv`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_results(&self, name: &str, results: &[SimulationResult]) -> Result<PathBuf, DataError> {
        let path = self.file(name, "csv")?;
        let file = File::create(&path).map_err(|e| DataError::io(&path, e))?;
        Self::write_results(file, results)?;
        info!(path = %path.display(), rows = results.len(), "Saved results");
        Ok(path)
    }

    /// Loads `<root>/<name>.csv`.
    ///
    /// # Errors
    /// Returns an error if the file is missing or inconsistent.
    pub fn load_results(&self, name: &str) -> Result<Vec<SimulationResult>, DataError> {
        let path = self.root.join(format!("{name}.csv"));
        let file = File::open(&path).map_err(|e| DataError::io(&path, e))?;
        Self::read_results(file)
    }
}
