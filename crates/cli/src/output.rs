//! Terminal tables and the JSON run report.

use clmm_lvr_backtest::{BacktestConfig, CompletedRun, PoolComparison};
use clmm_lvr_domain::enums::PoolKind;
use clmm_lvr_domain::math::price_to_tick;
use clmm_lvr_domain::value_objects::{BacktestSummary, ParamKey, Price};
use prettytable::{Table, row};
use rust_decimal::Decimal;
use serde::Serialize;

/// What gets written next to the per-step results of a single backtest.
#[derive(Serialize)]
pub struct RunReport<'a> {
    pub key: String,
    pub parameters: &'a ParamKey,
    pub config: &'a BacktestConfig,
    /// Range bounds as the nearest ticks; `None` for a full-range position.
    pub ticks: Option<(i32, i32)>,
    pub liquidity: Decimal,
    pub final_value: Decimal,
    pub final_benchmark_value: Decimal,
    pub range_exits: usize,
    pub summary: &'a BacktestSummary,
}

impl<'a> RunReport<'a> {
    pub fn new(run: &'a CompletedRun, config: &'a BacktestConfig) -> Self {
        Self {
            key: run.key.to_string(),
            parameters: &run.key,
            config,
            ticks: ticks(&run.key),
            liquidity: run.decomposition.position.liquidity(),
            final_value: run.decomposition.final_value,
            final_benchmark_value: run.decomposition.final_benchmark_value,
            range_exits: run.decomposition.events.range_exits(),
            summary: &run.summary,
        }
    }
}

/// Nearest ticks to the range bounds of `key`.
fn ticks(key: &ParamKey) -> Option<(i32, i32)> {
    if key.pool == PoolKind::ConstantProduct {
        return None;
    }
    let tick = |bound| Price::new(bound).and_then(price_to_tick).ok();
    Some((tick(key.lower_price)?, tick(key.upper_price)?))
}

fn range_label(key: &ParamKey, dp: u32) -> String {
    match key.pool {
        PoolKind::ConstantProduct => "full range".to_string(),
        PoolKind::Concentrated => format!(
            "[{}, {}]",
            key.lower_price.round_dp(dp),
            key.upper_price.round_dp(dp)
        ),
    }
}

fn money(value: Decimal) -> String {
    value.round_dp(2).to_string()
}

fn pct(fraction: Decimal) -> String {
    format!("{}%", (fraction * Decimal::ONE_HUNDRED).round_dp(4))
}

fn ratio(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |r| r.round_dp(2).to_string())
}

pub fn print_summary(run: &CompletedRun) {
    let s = &run.summary;
    let k = &run.key;

    let mut table = Table::new();
    table.set_titles(row!["Metric", "Value"]);
    table.add_row(row!["Pool", k.pool]);
    table.add_row(row!["Fee mode", k.fee_mode]);
    table.add_row(row!["Base fee (bps)", k.base_fee_bps.normalize()]);
    table.add_row(row!["Range", range_label(k, 6)]);
    if let Some((lower, upper)) = ticks(k) {
        table.add_row(row!["Ticks", format!("[{lower}, {upper}]")]);
    }
    table.add_row(row!["Liquidity", run.decomposition.position.liquidity().round_dp(6)]);
    table.add_row(row!["Capital", money(k.capital_value)]);
    table.add_row(row!["Steps", s.steps]);
    table.add_row(row!["Duration (days)", s.duration_days.round_dp(2)]);
    table.add_row(row!["Time in range", pct(s.time_in_range_pct)]);
    table.add_row(row!["Range exits", run.decomposition.events.range_exits()]);
    table.add_row(row!["Fees", money(s.total_fees)]);
    table.add_row(row!["LVR", money(s.total_lvr)]);
    table.add_row(row!["Opportunity cost", money(s.total_opportunity_cost)]);
    table.add_row(row!["Net PnL", money(s.net_pnl)]);
    table.add_row(row!["Net PnL / capital", pct(s.net_pnl_pct)]);
    table.add_row(row!["Fee APY", pct(s.fee_apy)]);
    table.add_row(row!["Fee / LVR", ratio(s.fee_to_lvr_ratio)]);
    table.add_row(row!["Final IL", pct(s.final_impermanent_loss_pct)]);
    table.add_row(row!["Worst IL", pct(s.worst_impermanent_loss_pct)]);
    table.add_row(row!["Final position value", money(run.decomposition.final_value)]);
    table.add_row(row!["Rebalancing benchmark", money(run.decomposition.final_benchmark_value)]);
    table.printstd();
}

pub fn print_ranking(ranked: &[&CompletedRun], top: usize) {
    let mut table = Table::new();
    table.set_titles(row![
        "#", "Pool", "Mode", "Base bps", "k", "Range", "Capital", "Fees", "LVR", "Opp. cost", "Net PnL",
        "Fee/LVR", "In range"
    ]);
    for (i, run) in ranked.iter().take(top).enumerate() {
        let k = &run.key;
        let s = &run.summary;
        table.add_row(row![
            i + 1,
            k.pool,
            k.fee_mode,
            k.base_fee_bps.normalize(),
            k.fee_sensitivity_k.normalize(),
            range_label(k, 4),
            money(k.capital_value),
            money(s.total_fees),
            money(s.total_lvr),
            money(s.total_opportunity_cost),
            money(s.net_pnl),
            ratio(s.fee_to_lvr_ratio),
            pct(s.time_in_range_pct)
        ]);
    }
    table.printstd();
}

pub fn print_comparison(comparison: &PoolComparison) {
    let (a, b) = (&comparison.position.summary, &comparison.full_range.summary);
    let mut table = Table::new();
    table.set_titles(row![
        "Metric",
        range_label(&comparison.position.key, 4),
        range_label(&comparison.full_range.key, 4)
    ]);
    table.add_row(row![
        "Liquidity",
        comparison.position.decomposition.position.liquidity().round_dp(4),
        comparison.full_range.decomposition.position.liquidity().round_dp(4)
    ]);
    table.add_row(row!["Time in range", pct(a.time_in_range_pct), pct(b.time_in_range_pct)]);
    table.add_row(row!["Fees", money(a.total_fees), money(b.total_fees)]);
    table.add_row(row!["LVR", money(a.total_lvr), money(b.total_lvr)]);
    table.add_row(row![
        "Opportunity cost",
        money(a.total_opportunity_cost),
        money(b.total_opportunity_cost)
    ]);
    table.add_row(row!["Net PnL", money(a.net_pnl), money(b.net_pnl)]);
    table.add_row(row!["Final IL", pct(a.final_impermanent_loss_pct), pct(b.final_impermanent_loss_pct)]);
    table.add_row(row!["Fee / LVR", ratio(a.fee_to_lvr_ratio), ratio(b.fee_to_lvr_ratio)]);
    table.printstd();
    println!("Net PnL advantage over full range: {}", money(comparison.net_pnl_advantage()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_lvr_domain::enums::FeeMode;
    use rust_decimal_macros::dec;

    fn key(pool: PoolKind) -> ParamKey {
        ParamKey {
            pool,
            fee_mode: FeeMode::Static,
            base_fee_bps: dec!(8),
            fee_sensitivity_k: dec!(0),
            lower_price: dec!(1),
            upper_price: dec!(1.0100496620928754),
            capital_value: dec!(100000),
        }
    }

    #[test]
    fn test_ticks_of_range() {
        // 1.0001^100 ~= 1.01005
        assert_eq!(ticks(&key(PoolKind::Concentrated)), Some((0, 100)));
        assert_eq!(ticks(&key(PoolKind::ConstantProduct)), None);
        assert_eq!(range_label(&key(PoolKind::ConstantProduct), 4), "full range");
        assert_eq!(range_label(&key(PoolKind::Concentrated), 2), "[1, 1.01]");
    }
}
