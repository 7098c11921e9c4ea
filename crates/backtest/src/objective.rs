use crate::harness::CompletedRun;
use clmm_lvr_domain::value_objects::BacktestSummary;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Scores a run summary; higher is better.
pub trait ObjectiveFunction: Send + Sync {
    fn evaluate(&self, summary: &BacktestSummary) -> Decimal;
    fn compare(&self, a: &BacktestSummary, b: &BacktestSummary) -> Ordering {
        self.evaluate(a).cmp(&self.evaluate(b))
    }
}

pub struct MaximizeNetPnL;
impl ObjectiveFunction for MaximizeNetPnL {
    fn evaluate(&self, summary: &BacktestSummary) -> Decimal {
        summary.net_pnl
    }
}

pub struct MaximizeFees;
impl ObjectiveFunction for MaximizeFees {
    fn evaluate(&self, summary: &BacktestSummary) -> Decimal {
        summary.total_fees
    }
}

pub struct MinimizeLvr;
impl ObjectiveFunction for MinimizeLvr {
    fn evaluate(&self, summary: &BacktestSummary) -> Decimal {
        -summary.total_lvr
    }
}

pub struct MaximizeFeeLvrRatio;
impl ObjectiveFunction for MaximizeFeeLvrRatio {
    fn evaluate(&self, summary: &BacktestSummary) -> Decimal {
        // No LVR at all: any fee income beats every finite ratio.
        match summary.fee_to_lvr_ratio {
            Some(ratio) => ratio,
            None if summary.total_fees > Decimal::ZERO => Decimal::MAX,
            None => Decimal::ZERO,
        }
    }
}

/// Ranking objectives selectable by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    NetPnl,
    Fees,
    Lvr,
    FeeLvrRatio,
}

impl Objective {
    #[must_use]
    pub fn function(self) -> Box<dyn ObjectiveFunction> {
        match self {
            Self::NetPnl => Box::new(MaximizeNetPnL),
            Self::Fees => Box::new(MaximizeFees),
            Self::Lvr => Box::new(MinimizeLvr),
            Self::FeeLvrRatio => Box::new(MaximizeFeeLvrRatio),
        }
    }
}

/// Completed runs ordered best first. Ties keep parameter-key order.
#[must_use]
pub fn rank<'a, I>(runs: I, objective: &dyn ObjectiveFunction) -> Vec<&'a CompletedRun>
where
    I: IntoIterator<Item = &'a CompletedRun>,
{
    let mut ranked: Vec<&CompletedRun> = runs.into_iter().collect();
    ranked.sort_by(|a, b| {
        objective
            .compare(&b.summary, &a.summary)
            .then_with(|| a.key.cmp(&b.key))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn summary(fees: Decimal, lvr: Decimal, net: Decimal) -> BacktestSummary {
        BacktestSummary {
            steps: 10,
            steps_in_range: 10,
            time_in_range_pct: dec!(1),
            duration_days: dec!(1),
            total_fees: fees,
            total_lvr: lvr,
            total_opportunity_cost: fees - lvr - net,
            net_pnl: net,
            net_pnl_pct: net / dec!(100000),
            mean_fee_per_step: fees / dec!(10),
            mean_lvr_per_step: lvr / dec!(10),
            mean_opportunity_cost_per_step: dec!(0),
            mean_impermanent_loss_pct: dec!(0),
            final_impermanent_loss_pct: dec!(0),
            worst_impermanent_loss_pct: dec!(0),
            fee_apy: dec!(0),
            fee_to_lvr_ratio: (lvr > Decimal::ZERO).then(|| fees / lvr),
        }
    }

    #[test]
    fn test_objectives() {
        let a = summary(dec!(100), dec!(50), dec!(20));
        let b = summary(dec!(80), dec!(10), dec!(30));

        assert_eq!(MaximizeNetPnL.compare(&a, &b), Ordering::Less);
        assert_eq!(MaximizeFees.compare(&a, &b), Ordering::Greater);
        assert_eq!(MinimizeLvr.compare(&a, &b), Ordering::Less);
        assert_eq!(MaximizeFeeLvrRatio.evaluate(&a), dec!(2));
        assert_eq!(MaximizeFeeLvrRatio.evaluate(&b), dec!(8));
    }

    #[test]
    fn test_zero_lvr_ratio() {
        assert_eq!(
            MaximizeFeeLvrRatio.evaluate(&summary(dec!(1), dec!(0), dec!(0))),
            Decimal::MAX
        );
        assert_eq!(
            MaximizeFeeLvrRatio.evaluate(&summary(dec!(0), dec!(0), dec!(-1))),
            dec!(0)
        );
    }

    #[test]
    fn test_objective_names() {
        #[derive(Deserialize)]
        struct Ranking {
            objective: Objective,
        }
        let parsed: Ranking = toml::from_str("objective = \"fee_lvr_ratio\"").unwrap();
        assert_eq!(parsed.objective, Objective::FeeLvrRatio);
        let s = summary(dec!(5), dec!(1), dec!(2));
        assert_eq!(Objective::Fees.function().evaluate(&s), dec!(5));
        assert_eq!(Objective::Lvr.function().evaluate(&s), dec!(-1));
    }
}
