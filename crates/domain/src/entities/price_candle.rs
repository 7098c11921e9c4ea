use crate::error::{ConfigurationError, DataIntegrityError, InvalidCandle};
use crate::value_objects::price::Price;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Multiple of the median interval above which a delta counts as a gap.
const GAP_FACTOR_NUM: i64 = 3;
const GAP_FACTOR_DEN: i64 = 2;

/// One OHLCV observation. Only `close` drives step pricing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    timestamp: DateTime<Utc>,
    open: Option<Price>,
    high: Option<Price>,
    low: Option<Price>,
    close: Price,
    volume: Decimal,
    volume_quote: Decimal,
}

impl Candle {
    /// Validates and builds a candle.
    ///
    /// # Errors
    /// Returns [`InvalidCandle`] for non-positive prices, negative volumes or
    /// `high < low`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Option<Decimal>,
        high: Option<Decimal>,
        low: Option<Decimal>,
        close: Decimal,
        volume: Decimal,
        volume_quote: Decimal,
    ) -> Result<Self, InvalidCandle> {
        let price = |field: &'static str, value: Decimal| {
            Price::new(value).map_err(|_| InvalidCandle::NonPositivePrice { field, value })
        };
        let optional = |field: &'static str, value: Option<Decimal>| {
            value.map(|v| price(field, v)).transpose()
        };

        let open = optional("open", open)?;
        let high = optional("high", high)?;
        let low = optional("low", low)?;
        let close = price("close", close)?;

        if let (Some(h), Some(l)) = (high, low) {
            if h < l {
                return Err(InvalidCandle::HighBelowLow {
                    high: h.value(),
                    low: l.value(),
                });
            }
        }
        for (field, value) in [("volume", volume), ("volume_quote", volume_quote)] {
            if value < Decimal::ZERO {
                return Err(InvalidCandle::NegativeVolume { field, value });
            }
        }

        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            volume_quote,
        })
    }

    /// Candle open time.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Open price, if supplied.
    #[must_use]
    pub fn open(&self) -> Option<Price> {
        self.open
    }

    /// High price, if supplied.
    #[must_use]
    pub fn high(&self) -> Option<Price> {
        self.high
    }

    /// Low price, if supplied.
    #[must_use]
    pub fn low(&self) -> Option<Price> {
        self.low
    }

    /// Close price.
    #[must_use]
    pub fn close(&self) -> Price {
        self.close
    }

    /// Traded base-asset quantity.
    #[must_use]
    pub fn volume(&self) -> Decimal {
        self.volume
    }

    /// Traded quote-asset quantity.
    #[must_use]
    pub fn volume_quote(&self) -> Decimal {
        self.volume_quote
    }
}

/// A sampling hole: the delta ending at `row` is much larger than usual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// Row whose delta to the previous row is oversized.
    pub row: usize,
    /// Delta in seconds.
    pub seconds: i64,
}

/// A non-empty sequence of candles with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Validates ordering and builds the series.
    ///
    /// # Errors
    /// Returns [`DataIntegrityError::EmptySeries`] for an empty input and
    /// [`DataIntegrityError::NonMonotonicTimestamp`] at the first row that does
    /// not strictly follow its predecessor.
    pub fn new(candles: Vec<Candle>) -> Result<Self, DataIntegrityError> {
        if candles.is_empty() {
            return Err(DataIntegrityError::EmptySeries);
        }
        for (row, pair) in candles.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(DataIntegrityError::NonMonotonicTimestamp {
                    row: row + 1,
                    timestamp: pair[1].timestamp,
                    previous: pair[0].timestamp,
                });
            }
        }
        Ok(Self { candles })
    }

    /// All candles in time order.
    #[must_use]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Number of candles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Always false: a series holds at least one candle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// First candle.
    #[must_use]
    pub fn first(&self) -> &Candle {
        &self.candles[0]
    }

    /// Last candle.
    #[must_use]
    pub fn last(&self) -> &Candle {
        &self.candles[self.candles.len() - 1]
    }

    /// Median spacing between consecutive candles, in seconds.
    #[must_use]
    pub fn median_interval_secs(&self) -> Option<i64> {
        let mut deltas: Vec<i64> = self
            .candles
            .windows(2)
            .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds())
            .collect();
        if deltas.is_empty() {
            return None;
        }
        deltas.sort_unstable();
        Some(deltas[deltas.len() / 2])
    }

    /// Deltas larger than 1.5x the median interval.
    #[must_use]
    pub fn gaps(&self) -> Vec<Gap> {
        let Some(median) = self.median_interval_secs() else {
            return Vec::new();
        };
        self.candles
            .windows(2)
            .enumerate()
            .filter_map(|(i, w)| {
                let seconds = (w[1].timestamp - w[0].timestamp).num_seconds();
                (seconds * GAP_FACTOR_DEN > median * GAP_FACTOR_NUM).then_some(Gap {
                    row: i + 1,
                    seconds,
                })
            })
            .collect()
    }

    /// The trailing candles within `days` days of the last candle.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::ZeroWindow`] when `days` is zero.
    pub fn window_last_days(&self, days: u32) -> Result<Self, ConfigurationError> {
        if days == 0 {
            return Err(ConfigurationError::ZeroWindow);
        }
        let start = self.last().timestamp - Duration::days(i64::from(days));
        let first_in_window = self.candles.partition_point(|c| c.timestamp < start);
        Ok(Self {
            candles: self.candles[first_in_window..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle_at(hour: i64, close: Decimal) -> Candle {
        Candle::new(
            DateTime::from_timestamp(hour * 3600, 0).unwrap(),
            None,
            None,
            None,
            close,
            dec!(1),
            close,
        )
        .unwrap()
    }

    #[test]
    fn test_candle_validation() {
        let ts = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(
            Candle::new(ts, None, None, None, dec!(0), dec!(1), dec!(1)).unwrap_err(),
            InvalidCandle::NonPositivePrice {
                field: "close",
                value: dec!(0)
            }
        );
        assert_eq!(
            Candle::new(ts, None, None, None, dec!(1), dec!(-1), dec!(1)).unwrap_err(),
            InvalidCandle::NegativeVolume {
                field: "volume",
                value: dec!(-1)
            }
        );
        assert!(matches!(
            Candle::new(ts, None, Some(dec!(9)), Some(dec!(10)), dec!(9.5), dec!(1), dec!(1)),
            Err(InvalidCandle::HighBelowLow { .. })
        ));
        assert!(matches!(
            Candle::new(ts, Some(dec!(-2)), None, None, dec!(9.5), dec!(1), dec!(1)),
            Err(InvalidCandle::NonPositivePrice { field: "open", .. })
        ));
    }

    #[test]
    fn test_series_rejects_empty_and_unordered() {
        assert_eq!(
            CandleSeries::new(Vec::new()).unwrap_err(),
            DataIntegrityError::EmptySeries
        );

        let err = CandleSeries::new(vec![
            candle_at(0, dec!(10)),
            candle_at(2, dec!(10)),
            candle_at(1, dec!(10)),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            DataIntegrityError::NonMonotonicTimestamp { row: 2, .. }
        ));

        let dup = CandleSeries::new(vec![candle_at(0, dec!(10)), candle_at(0, dec!(11))]);
        assert!(matches!(
            dup,
            Err(DataIntegrityError::NonMonotonicTimestamp { row: 1, .. })
        ));
    }

    #[test]
    fn test_gap_detection() {
        let series = CandleSeries::new(vec![
            candle_at(0, dec!(10)),
            candle_at(1, dec!(10)),
            candle_at(2, dec!(10)),
            candle_at(6, dec!(10)),
            candle_at(7, dec!(10)),
        ])
        .unwrap();

        assert_eq!(series.median_interval_secs(), Some(3600));
        assert_eq!(
            series.gaps(),
            vec![Gap {
                row: 3,
                seconds: 4 * 3600
            }]
        );
    }

    #[test]
    fn test_window_last_days() {
        let candles: Vec<Candle> = (0..24 * 5).map(|h| candle_at(h, dec!(10))).collect();
        let series = CandleSeries::new(candles).unwrap();

        let window = series.window_last_days(2).unwrap();
        // last candle at hour 119, window starts at hour 71 inclusive
        assert_eq!(window.len(), 49);
        assert_eq!(window.last(), series.last());
        assert_eq!(
            series.window_last_days(0).unwrap_err(),
            ConfigurationError::ZeroWindow
        );
        assert_eq!(series.window_last_days(30).unwrap().len(), series.len());
    }
}
