//! Summary statistics over a completed decomposition.

use clmm_lvr_domain::DomainError;
use clmm_lvr_domain::metrics::fees::calculate_apy;
use clmm_lvr_domain::value_objects::BacktestSummary;
use clmm_lvr_simulation::engine::Decomposition;
use rust_decimal::Decimal;

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Aggregates a completed run. Fee APY is zero for a run spanning no time.
///
/// # Errors
/// [`DomainError::Arithmetic`] when `capital_value` is zero.
pub fn summarize(decomposition: &Decomposition, capital_value: Decimal) -> Result<BacktestSummary, DomainError> {
    let results = &decomposition.results;
    let (Some(first), Some(last)) = (results.first(), results.last()) else {
        return Err(DomainError::Arithmetic("cannot summarise a run with no rows"));
    };
    if capital_value.is_zero() {
        return Err(DomainError::Arithmetic("capital cannot be zero"));
    }

    let steps = Decimal::from(results.len());
    let steps_in_range = decomposition.steps_in_range();
    let totals = last.totals();
    let net_pnl = totals.net_pnl();

    let elapsed = (last.timestamp() - first.timestamp())
        .num_microseconds()
        .ok_or(DomainError::Arithmetic("run duration overflow"))?;
    let duration_days = Decimal::from(elapsed) / Decimal::from(MICROS_PER_DAY);
    let fee_apy = if elapsed > 0 {
        calculate_apy(totals.fees, capital_value, duration_days)?
    } else {
        Decimal::ZERO
    };

    let il_sum: Decimal = results.iter().map(|r| r.impermanent_loss_pct()).sum();
    let worst_il = results
        .iter()
        .map(|r| r.impermanent_loss_pct())
        .min()
        .unwrap_or_default();

    Ok(BacktestSummary {
        steps: results.len() as u64,
        steps_in_range: steps_in_range as u64,
        time_in_range_pct: Decimal::from(steps_in_range) / steps,
        duration_days,
        total_fees: totals.fees,
        total_lvr: totals.lvr,
        total_opportunity_cost: totals.opportunity_cost,
        net_pnl,
        net_pnl_pct: net_pnl / capital_value,
        mean_fee_per_step: totals.fees / steps,
        mean_lvr_per_step: totals.lvr / steps,
        mean_opportunity_cost_per_step: totals.opportunity_cost / steps,
        mean_impermanent_loss_pct: il_sum / steps,
        final_impermanent_loss_pct: last.impermanent_loss_pct(),
        worst_impermanent_loss_pct: worst_il,
        fee_apy,
        fee_to_lvr_ratio: (totals.lvr > Decimal::ZERO).then(|| totals.fees / totals.lvr),
    })
}
