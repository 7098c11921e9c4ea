//! Run summaries (JSON) and sweep tables (CSV).

use super::result_repository::ResultRepository;
use crate::error::DataError;
use clmm_lvr_domain::value_objects::{BacktestSummary, ParamKey};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

const SWEEP_HEADER: [&str; 20] = [
    "pool",
    "fee_mode",
    "base_fee_bps",
    "fee_sensitivity_k",
    "lower_price",
    "upper_price",
    "capital_value",
    "status",
    "steps",
    "time_in_range_pct",
    "total_fees",
    "total_lvr",
    "total_opportunity_cost",
    "net_pnl",
    "net_pnl_pct",
    "fee_apy",
    "fee_to_lvr_ratio",
    "final_impermanent_loss_pct",
    "worst_impermanent_loss_pct",
    "error",
];

/// One line of a sweep results table.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepTableRow {
    /// Parameter combination.
    pub key: ParamKey,
    /// Summary of a completed run; `None` for an incomplete one.
    pub summary: Option<BacktestSummary>,
    /// Rows computed (all rows for a completed run).
    pub steps: usize,
    /// Why the run halted, if it did.
    pub error: Option<String>,
}

impl SweepTableRow {
    fn record(&self) -> Vec<String> {
        let k = &self.key;
        let mut fields = vec![
            k.pool.to_string(),
            k.fee_mode.to_string(),
            k.base_fee_bps.to_string(),
            k.fee_sensitivity_k.to_string(),
            k.lower_price.to_string(),
            k.upper_price.to_string(),
            k.capital_value.to_string(),
        ];
        match &self.summary {
            Some(s) => fields.extend([
                "complete".to_string(),
                self.steps.to_string(),
                s.time_in_range_pct.to_string(),
                s.total_fees.to_string(),
                s.total_lvr.to_string(),
                s.total_opportunity_cost.to_string(),
                s.net_pnl.to_string(),
                s.net_pnl_pct.to_string(),
                s.fee_apy.to_string(),
                s.fee_to_lvr_ratio.map(|r| r.to_string()).unwrap_or_default(),
                s.final_impermanent_loss_pct.to_string(),
                s.worst_impermanent_loss_pct.to_string(),
            ]),
            None => {
                fields.push("incomplete".to_string());
                fields.push(self.steps.to_string());
                fields.extend(std::iter::repeat_n(String::new(), 10));
            }
        }
        fields.push(self.error.clone().unwrap_or_default());
        fields
    }
}

impl ResultRepository {
    /// Writes a sweep table as CSV to any writer.
    ///
    /// # Errors
    /// Returns an error if a row cannot be written.
    pub fn write_sweep_table<W: Write>(writer: W, rows: &[SweepTableRow]) -> Result<(), DataError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(SWEEP_HEADER)?;
        for row in rows {
            wtr.write_record(row.record())?;
        }
        wtr.flush().map_err(|e| DataError::io("<sweep writer>", e))?;
        Ok(())
    }

    /// Saves a sweep table as `<root>/<name>.csv`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_sweep_table(&self, name: &str, rows: &[SweepTableRow]) -> Result<PathBuf, DataError> {
        let path = self.file(name, "csv")?;
        let file = File::create(&path).map_err(|e| DataError::io(&path, e))?;
        Self::write_sweep_table(file, rows)?;
        info!(path = %path.display(), runs = rows.len(), "Saved sweep table");
        Ok(path)
    }

    /// Saves any serializable report as pretty JSON at `<root>/<name>.json`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or serialization fails.
    pub fn save_summary<T: Serialize>(&self, name: &str, report: &T) -> Result<PathBuf, DataError> {
        let path = self.file(name, "json")?;
        let file = File::create(&path).map_err(|e| DataError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush().map_err(|e| DataError::io(&path, e))?;
        info!(path = %path.display(), "Saved summary");
        Ok(path)
    }
}
