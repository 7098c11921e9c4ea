//! OHLCV price history loaded from CSV.

use crate::error::DataError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clmm_lvr_domain::DataIntegrityError;
use clmm_lvr_domain::entities::{Candle, CandleSeries};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Anything that can produce a validated candle series.
pub trait PriceSeriesSource {
    /// Loads and validates the full series.
    ///
    /// # Errors
    /// Returns an error if the data cannot be read or violates a series invariant.
    fn load(&self) -> Result<CandleSeries, DataError>;
}

/// One raw CSV row of price history.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceRecord {
    /// ISO-8601 timestamp or Unix seconds.
    pub timestamp: String,
    /// Open price.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub open: Option<Decimal>,
    /// High price.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub high: Option<Decimal>,
    /// Low price.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub low: Option<Decimal>,
    /// Close price.
    #[serde(alias = "price", with = "rust_decimal::serde::str")]
    pub close: Decimal,
    /// Traded base quantity.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub volume: Option<Decimal>,
    /// Traded quote quantity.
    #[serde(default, alias = "volume_zar", with = "rust_decimal::serde::str_option")]
    pub volume_quote: Option<Decimal>,
}

impl PriceRecord {
    /// Validates this row into a candle. Missing volumes count as zero.
    ///
    /// # Errors
    /// Returns [`DataIntegrityError`] carrying `row` for a bad timestamp or field.
    pub fn into_candle(self, row: usize) -> Result<Candle, DataIntegrityError> {
        let timestamp = parse_timestamp(&self.timestamp).ok_or_else(|| {
            DataIntegrityError::Malformed {
                row,
                reason: format!("unrecognised timestamp '{}'", self.timestamp),
            }
        })?;
        Candle::new(
            timestamp,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume.unwrap_or_default(),
            self.volume_quote.unwrap_or_default(),
        )
        .map_err(|source| DataIntegrityError::InvalidCandle { row, source })
    }
}

/// Parses RFC 3339, `YYYY-MM-DD HH:MM:SS[+offset]`, a bare date, or Unix seconds.
/// Timestamps without an offset are taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<i64>() {
        return DateTime::from_timestamp(seconds, 0);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Repository reading price history from a CSV file with a header row.
///
/// Columns: `timestamp, open, high, low, close, volume, volume_quote`.
/// `close` is required; `price` is accepted for `close` and `volume_zar` for
/// `volume_quote`.
#[derive(Debug, Clone)]
pub struct PriceRepository {
    path: PathBuf,
}

impl PriceRepository {
    /// Creates a repository over `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Source file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and validates a series from any CSV reader.
    ///
    /// Gaps larger than 1.5x the median interval are logged, not rejected.
    ///
    /// # Errors
    /// Returns [`DataError::Integrity`] identifying the first bad row.
    pub fn read_series<R: Read>(reader: R) -> Result<CandleSeries, DataError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut candles = Vec::new();
        for (row, record) in csv_reader.deserialize::<PriceRecord>().enumerate() {
            let record = record.map_err(|e| DataIntegrityError::Malformed {
                row,
                reason: e.to_string(),
            })?;
            candles.push(record.into_candle(row)?);
        }

        let series = CandleSeries::new(candles)?;
        for gap in series.gaps() {
            warn!(row = gap.row, seconds = gap.seconds, "Gap in price series");
        }
        Ok(series)
    }
}

impl PriceSeriesSource for PriceRepository {
    fn load(&self) -> Result<CandleSeries, DataError> {
        let file = File::open(&self.path).map_err(|e| DataError::io(&self.path, e))?;
        let series = Self::read_series(file)?;
        info!(
            path = %self.path.display(),
            candles = series.len(),
            first = %series.first().timestamp(),
            last = %series.last().timestamp(),
            "Loaded price series"
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_lvr_domain::error::InvalidCandle;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn read(csv: &str) -> Result<CandleSeries, DataError> {
        PriceRepository::read_series(csv.as_bytes())
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = DateTime::from_timestamp(1_704_067_200, 0).unwrap();
        for raw in [
            "1704067200",
            "2024-01-01T00:00:00Z",
            "2024-01-01 00:00:00+00:00",
            "2024-01-01 02:00:00+02:00",
            "2024-01-01 00:00:00",
            "2024-01-01T00:00:00",
            "2024-01-01",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_reads_full_schema() {
        let series = read(
            "timestamp,open,high,low,close,volume,volume_quote\n\
             2024-01-01T00:00:00Z,18.50,18.60,18.40,18.55,100,1855\n\
             2024-01-01T01:00:00Z,18.55,18.70,18.50,18.65,50,932.5\n",
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        let last = series.last();
        assert_eq!(last.close().value(), dec!(18.65));
        assert_eq!(last.volume_quote(), dec!(932.5));
        assert_eq!(last.high().unwrap().value(), dec!(18.70));
    }

    #[test]
    fn test_accepts_aliases_and_missing_columns() {
        let series = read(
            "timestamp,price,volume_zar\n\
             1704067200,18.5,1000\n\
             1704070800,18.6,\n",
        )
        .unwrap();
        assert_eq!(series.first().volume_quote(), dec!(1000));
        assert_eq!(series.last().volume_quote(), dec!(0));
        assert_eq!(series.last().open(), None);
    }

    #[test]
    fn test_identifies_bad_rows() {
        let err = read(
            "timestamp,close\n\
             1704067200,18.5\n\
             1704070800,0\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DataError::Integrity(DataIntegrityError::InvalidCandle {
                row: 1,
                source: InvalidCandle::NonPositivePrice { .. }
            })
        ));

        let err = read("timestamp,close\nnot-a-time,18.5\n").unwrap_err();
        assert!(matches!(
            err,
            DataError::Integrity(DataIntegrityError::Malformed { row: 0, .. })
        ));

        let err = read("timestamp,close\n1704067200,abc\n").unwrap_err();
        assert!(matches!(
            err,
            DataError::Integrity(DataIntegrityError::Malformed { row: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_unordered_and_empty() {
        let err = read(
            "timestamp,close\n\
             1704070800,18.5\n\
             1704067200,18.6\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DataError::Integrity(DataIntegrityError::NonMonotonicTimestamp { row: 1, .. })
        ));

        let err = read("timestamp,close\n").unwrap_err();
        assert!(matches!(err, DataError::Integrity(DataIntegrityError::EmptySeries)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,close,volume,volume_quote").unwrap();
        writeln!(file, "2024-01-01 00:00:00+00:00,18.5,10,185").unwrap();
        writeln!(file, "2024-01-01 01:00:00+00:00,18.4,10,184").unwrap();

        let repo = PriceRepository::new(file.path());
        let series = repo.load().unwrap();
        assert_eq!(series.len(), 2);

        let missing = PriceRepository::new(file.path().with_extension("missing"));
        assert!(matches!(missing.load(), Err(DataError::Io { .. })));
    }
}
