use crate::error::DomainError;
use crate::value_objects::price::Price;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Step-dependent terms computed for one candle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepIncrements {
    /// Fees earned this step, in quote currency.
    pub fee_accrued: Decimal,
    /// Loss versus the rebalancing benchmark this step, in quote currency.
    pub lvr_increment: Decimal,
    /// Impermanent loss versus holding, as a fraction (negative is a loss).
    pub impermanent_loss_pct: Decimal,
    /// Interest forgone this step, in quote currency.
    pub opportunity_cost: Decimal,
}

/// Running totals of the additive PnL terms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CumulativeTotals {
    /// Sum of fees.
    pub fees: Decimal,
    /// Sum of LVR increments.
    pub lvr: Decimal,
    /// Sum of opportunity cost accruals.
    pub opportunity_cost: Decimal,
}

impl CumulativeTotals {
    /// Adds one step's increments.
    #[must_use]
    pub fn accrue(&self, step: &StepIncrements) -> Self {
        Self {
            fees: self.fees + step.fee_accrued,
            lvr: self.lvr + step.lvr_increment,
            opportunity_cost: self.opportunity_cost + step.opportunity_cost,
        }
    }

    /// `fees - lvr - opportunity_cost`.
    #[must_use]
    pub fn net_pnl(&self) -> Decimal {
        self.fees - self.lvr - self.opportunity_cost
    }
}

/// One row of the decomposition output. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    timestamp: DateTime<Utc>,
    price: Price,
    fee_accrued: Decimal,
    lvr_increment: Decimal,
    impermanent_loss_pct: Decimal,
    opportunity_cost: Decimal,
    cumulative_fees: Decimal,
    cumulative_lvr: Decimal,
    cumulative_opportunity_cost: Decimal,
    net_pnl: Decimal,
}

impl SimulationResult {
    /// Builds a row, deriving `net_pnl` from the totals.
    ///
    /// # Errors
    /// Returns [`DomainError::NegativeTerm`] if any increment or total that
    /// must be non-negative is negative.
    pub fn new(
        timestamp: DateTime<Utc>,
        price: Price,
        step: StepIncrements,
        totals: CumulativeTotals,
    ) -> Result<Self, DomainError> {
        let non_negative = [
            ("fee_accrued", step.fee_accrued),
            ("lvr_increment", step.lvr_increment),
            ("opportunity_cost", step.opportunity_cost),
            ("cumulative_fees", totals.fees),
            ("cumulative_lvr", totals.lvr),
            ("cumulative_opportunity_cost", totals.opportunity_cost),
        ];
        if let Some((field, value)) = non_negative.into_iter().find(|(_, v)| *v < Decimal::ZERO) {
            return Err(DomainError::NegativeTerm { field, value });
        }

        Ok(Self {
            timestamp,
            price,
            fee_accrued: step.fee_accrued,
            lvr_increment: step.lvr_increment,
            impermanent_loss_pct: step.impermanent_loss_pct,
            opportunity_cost: step.opportunity_cost,
            cumulative_fees: totals.fees,
            cumulative_lvr: totals.lvr,
            cumulative_opportunity_cost: totals.opportunity_cost,
            net_pnl: totals.net_pnl(),
        })
    }

    /// Candle timestamp.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Close price of the candle.
    #[must_use]
    pub fn price(&self) -> Price {
        self.price
    }

    /// Fees earned this step.
    #[must_use]
    pub fn fee_accrued(&self) -> Decimal {
        self.fee_accrued
    }

    /// LVR increment this step.
    #[must_use]
    pub fn lvr_increment(&self) -> Decimal {
        self.lvr_increment
    }

    /// Impermanent loss fraction at this step.
    #[must_use]
    pub fn impermanent_loss_pct(&self) -> Decimal {
        self.impermanent_loss_pct
    }

    /// Opportunity cost accrued this step.
    #[must_use]
    pub fn opportunity_cost(&self) -> Decimal {
        self.opportunity_cost
    }

    /// Fees earned up to and including this step.
    #[must_use]
    pub fn cumulative_fees(&self) -> Decimal {
        self.cumulative_fees
    }

    /// LVR up to and including this step.
    #[must_use]
    pub fn cumulative_lvr(&self) -> Decimal {
        self.cumulative_lvr
    }

    /// Opportunity cost up to and including this step.
    #[must_use]
    pub fn cumulative_opportunity_cost(&self) -> Decimal {
        self.cumulative_opportunity_cost
    }

    /// Net LP result: fees minus LVR minus opportunity cost.
    #[must_use]
    pub fn net_pnl(&self) -> Decimal {
        self.net_pnl
    }

    /// The cumulative totals carried by this row.
    #[must_use]
    pub fn totals(&self) -> CumulativeTotals {
        CumulativeTotals {
            fees: self.cumulative_fees,
            lvr: self.cumulative_lvr,
            opportunity_cost: self.cumulative_opportunity_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_net_pnl_identity() {
        let step = StepIncrements {
            fee_accrued: dec!(1.25),
            lvr_increment: dec!(0.4),
            impermanent_loss_pct: dec!(-0.001),
            opportunity_cost: dec!(0.9),
        };
        let totals = CumulativeTotals::default().accrue(&step).accrue(&step);
        let row = SimulationResult::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            Price::new(dec!(18.2)).unwrap(),
            step,
            totals,
        )
        .unwrap();

        assert_eq!(row.cumulative_fees(), dec!(2.5));
        assert_eq!(row.net_pnl(), dec!(2.5) - dec!(0.8) - dec!(1.8));
        assert_eq!(row.totals(), totals);
    }

    #[test]
    fn test_rejects_negative_lvr() {
        let step = StepIncrements {
            lvr_increment: dec!(-0.01),
            ..StepIncrements::default()
        };
        let err = SimulationResult::new(
            DateTime::from_timestamp(0, 0).unwrap(),
            Price::new(dec!(1)).unwrap(),
            step,
            CumulativeTotals::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DomainError::NegativeTerm {
                field: "lvr_increment",
                value: dec!(-0.01)
            }
        );
    }
}
