use crate::enums::{FeeMode, PoolKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The parameter combination that identifies one backtest run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ParamKey {
    /// Curve the position sits on.
    pub pool: PoolKind,
    /// Fee mode.
    pub fee_mode: FeeMode,
    /// Base fee in basis points.
    pub base_fee_bps: Decimal,
    /// Dynamic fee sensitivity.
    pub fee_sensitivity_k: Decimal,
    /// Lower range bound, zero for a full-range position.
    pub lower_price: Decimal,
    /// Upper range bound, zero for a full-range position.
    pub upper_price: Decimal,
    /// Capital committed.
    pub capital_value: Decimal,
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let range = match self.pool {
            PoolKind::Concentrated => format!(
                "[{},{}]",
                self.lower_price.normalize(),
                self.upper_price.normalize()
            ),
            PoolKind::ConstantProduct => "full".to_string(),
        };
        write!(
            f,
            "{}:{}bps:k{}:{}:{}",
            self.fee_mode,
            self.base_fee_bps.normalize(),
            self.fee_sensitivity_k.normalize(),
            range,
            self.capital_value.normalize()
        )
    }
}

/// Totals and means over one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// Number of result rows.
    pub steps: u64,
    /// Rows whose price was inside the range.
    pub steps_in_range: u64,
    /// `steps_in_range / steps`.
    pub time_in_range_pct: Decimal,
    /// Elapsed time between first and last candle, in days.
    pub duration_days: Decimal,
    /// Total fees earned.
    pub total_fees: Decimal,
    /// Total LVR.
    pub total_lvr: Decimal,
    /// Total opportunity cost.
    pub total_opportunity_cost: Decimal,
    /// Final net PnL.
    pub net_pnl: Decimal,
    /// Net PnL as a fraction of capital.
    pub net_pnl_pct: Decimal,
    /// Mean fee per row.
    pub mean_fee_per_step: Decimal,
    /// Mean LVR per row.
    pub mean_lvr_per_step: Decimal,
    /// Mean opportunity cost per row.
    pub mean_opportunity_cost_per_step: Decimal,
    /// Mean impermanent loss fraction.
    pub mean_impermanent_loss_pct: Decimal,
    /// Impermanent loss at the last row.
    pub final_impermanent_loss_pct: Decimal,
    /// Most negative impermanent loss observed.
    pub worst_impermanent_loss_pct: Decimal,
    /// Annualised fee yield on capital.
    pub fee_apy: Decimal,
    /// Fees divided by LVR, absent when LVR is zero.
    pub fee_to_lvr_ratio: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_param_key_ordering_and_display() {
        let a = ParamKey {
            pool: PoolKind::Concentrated,
            fee_mode: FeeMode::Static,
            base_fee_bps: dec!(8.0),
            fee_sensitivity_k: dec!(0),
            lower_price: dec!(9.50),
            upper_price: dec!(10.50),
            capital_value: dec!(100000),
        };
        let b = ParamKey {
            base_fee_bps: dec!(30),
            ..a
        };
        assert!(a < b);
        assert_eq!(a.to_string(), "static:8bps:k0:[9.5,10.5]:100000");

        let full = ParamKey {
            pool: PoolKind::ConstantProduct,
            lower_price: dec!(0),
            upper_price: dec!(0),
            ..a
        };
        assert!(b < full);
        assert_eq!(full.to_string(), "static:8bps:k0:full:100000");
    }
}
