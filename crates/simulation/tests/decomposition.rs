//! End-to-end decomposition scenarios on small hand-built price paths.

use chrono::{DateTime, TimeDelta, Utc};
use clmm_lvr_domain::entities::{Candle, CandleSeries};
use clmm_lvr_domain::enums::{FeeMode, InterestMode, PoolKind, VolumeSource};
use clmm_lvr_domain::fees::{FeePolicyConfig, VolatilityRegimeFee};
use clmm_lvr_domain::math::Reserves;
use clmm_lvr_domain::{DomainError, LvrError};
use clmm_lvr_simulation::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const HOUR: i64 = 3600;

fn candle(ts: DateTime<Utc>, close: Decimal, volume_quote: Decimal) -> Candle {
    Candle::new(ts, None, None, None, close, dec!(0), volume_quote).unwrap()
}

fn hourly(closes: &[Decimal]) -> CandleSeries {
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            candle(
                DateTime::from_timestamp(1_700_000_000 + i as i64 * HOUR, 0).unwrap(),
                *close,
                dec!(50000),
            )
        })
        .collect();
    CandleSeries::new(candles).unwrap()
}

fn static_config() -> SimulationConfig {
    SimulationConfig::new(dec!(9.50), dec!(10.50))
        .with_capital(dec!(100000))
        .with_fee_policy(FeePolicyConfig::fixed(dec!(8)))
        .with_interest_rate(dec!(0.08))
}

#[test]
fn three_candle_scenario() {
    let out = decompose(&hourly(&[dec!(10.00), dec!(10.05), dec!(9.95)]), static_config()).unwrap();
    let rows = &out.results;
    assert_eq!(rows.len(), 3);

    assert!(rows[1].fee_accrued() > Decimal::ZERO);
    assert!(rows[2].fee_accrued() > Decimal::ZERO);
    // The down move is twice as large so it trades (and earns) more.
    assert!(rows[2].fee_accrued() > rows[1].fee_accrued());

    let mut previous = Decimal::ZERO;
    for row in rows {
        assert!(row.lvr_increment() >= Decimal::ZERO);
        assert!(row.cumulative_lvr() >= previous);
        previous = row.cumulative_lvr();
    }

    let last = rows.last().unwrap();
    assert_eq!(
        last.net_pnl(),
        last.cumulative_fees() - last.cumulative_lvr() - last.cumulative_opportunity_cost()
    );
}

#[test]
fn hourly_opportunity_cost() {
    let out = decompose(&hourly(&[dec!(10), dec!(10), dec!(10)]), static_config()).unwrap();
    // 100000 * 0.08 / 8760 per hour
    let per_hour = dec!(0.91324200913242);
    for row in &out.results[1..] {
        assert!((row.opportunity_cost() - per_hour).abs() < dec!(0.000001));
        assert_eq!(row.fee_accrued(), dec!(0));
        assert_eq!(row.lvr_increment(), dec!(0));
    }
    assert_eq!(out.results[2].opportunity_cost(), out.results[1].opportunity_cost());
    assert!(out.net_pnl() < Decimal::ZERO);
}

#[test]
fn exit_without_return_freezes_fees() {
    let out = decompose(
        &hourly(&[dec!(10), dec!(10.3), dec!(10.8), dec!(11.0), dec!(11.4), dec!(11.2)]),
        static_config(),
    )
    .unwrap();
    let rows = &out.results;

    assert!(rows[1].fee_accrued() > Decimal::ZERO);
    let frozen = rows[1].cumulative_fees();
    for row in &rows[2..] {
        assert_eq!(row.fee_accrued(), dec!(0));
        assert_eq!(row.cumulative_fees(), frozen);
    }

    // Once fully above the range the position is all quote: no further LVR.
    for row in &rows[3..] {
        assert_eq!(row.lvr_increment(), dec!(0));
    }

    assert_eq!(out.events.range_exits(), 1);
    assert_eq!(out.events.count_by_type(SimulationEventType::BackInRange), 0);
    assert_eq!(out.steps_in_range(), 2);
}

#[test]
fn exit_and_return_are_logged() {
    let out = decompose(
        &hourly(&[dec!(10), dec!(10.6), dec!(10.7), dec!(10.2), dec!(9.4)]),
        static_config(),
    )
    .unwrap();
    let kinds: Vec<SimulationEventType> =
        out.events.events().iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            SimulationEventType::PositionOpened,
            SimulationEventType::OutOfRange,
            SimulationEventType::BackInRange,
            SimulationEventType::OutOfRange,
            SimulationEventType::PositionClosed,
        ]
    );
    assert_eq!(out.events.events_of_type(SimulationEventType::BackInRange)[0].step, 3);
}

#[test]
fn observed_volume_pays_on_candle_volume() {
    let config = static_config().with_volume_source(VolumeSource::Observed);
    let out = decompose(&hourly(&[dec!(10), dec!(10.05), dec!(11)]), config).unwrap();
    // 50000 * 8 / 10000
    assert_eq!(out.results[1].fee_accrued(), dec!(40));
    assert_eq!(out.results[2].fee_accrued(), dec!(0));
}

#[test]
fn compound_accrual_tracks_simple() {
    let closes = [dec!(10); 48];
    let simple = decompose(&hourly(&closes), static_config()).unwrap();
    let compound = decompose(
        &hourly(&closes),
        static_config().with_interest_mode(InterestMode::Compound),
    )
    .unwrap();
    let s = simple.totals().opportunity_cost;
    let c = compound.totals().opportunity_cost;
    assert!(s > Decimal::ZERO);
    // (1 + r)^t - 1 accrues a little less than r * t over short steps.
    assert!(c < s);
    assert!((s - c) / s < dec!(0.05));
}

#[test]
fn fractional_seconds_accrue_exactly() {
    let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let series = CandleSeries::new(vec![
        candle(t0, dec!(10), dec!(1)),
        candle(t0 + TimeDelta::milliseconds(1500), dec!(10), dec!(1)),
        candle(t0 + TimeDelta::milliseconds(3000), dec!(10), dec!(1)),
    ])
    .unwrap();

    let out = decompose(&series, static_config()).unwrap();
    let rows = &out.results;
    assert!(rows[1].opportunity_cost() > Decimal::ZERO);
    assert_eq!(rows[1].opportunity_cost(), rows[2].opportunity_cost());
    // 100000 * 0.08 * 3 / 31536000
    assert!((out.totals().opportunity_cost - dec!(0.00076103500761035)).abs() < dec!(0.000000000001));
}

#[test]
fn half_second_step_completes() {
    let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let series = CandleSeries::new(vec![
        candle(t0, dec!(10), dec!(1)),
        candle(t0 + TimeDelta::milliseconds(500), dec!(10.01), dec!(1)),
    ])
    .unwrap();

    let out = decompose(&series, static_config()).unwrap();
    assert_eq!(out.results.len(), 2);
    assert!(out.results[1].opportunity_cost() > Decimal::ZERO);
    assert!(out.results[1].fee_accrued() > Decimal::ZERO);
}

#[test]
fn interest_overflow_halts_with_partial_rows() {
    let rate = Decimal::from_i128_with_scale(10_i128.pow(26), 0);
    let err = decompose(
        &hourly(&[dec!(10), dec!(10.01), dec!(10.02)]),
        static_config().with_interest_rate(rate),
    )
    .unwrap_err();
    assert_eq!(err.step, 1);
    assert_eq!(err.partial.len(), 1);
    assert_eq!(
        err.error,
        LvrError::Domain {
            step: 1,
            source: DomainError::Arithmetic("simple interest overflow"),
        }
    );
}

#[test]
fn full_range_position_trades_on_every_move() {
    let closes = [dec!(10), dec!(10.2), dec!(9.8), dec!(12), dec!(12.4)];
    let concentrated = decompose(&hourly(&closes), static_config()).unwrap();
    let full = decompose(
        &hourly(&closes),
        static_config().with_pool(PoolKind::ConstantProduct),
    )
    .unwrap();

    assert!(full.position.range().is_none());
    assert_eq!(full.steps_in_range(), closes.len());
    assert_eq!(full.events.range_exits(), 0);
    // Out of the concentrated range the full-range position still earns.
    assert_eq!(concentrated.results[4].fee_accrued(), dec!(0));
    assert!(full.results[4].fee_accrued() > Decimal::ZERO);

    // Thinner liquidity: smaller fees and LVR on the same in-range move.
    assert!(full.results[1].fee_accrued() < concentrated.results[1].fee_accrued());
    assert!(full.results[1].lvr_increment() < concentrated.results[1].lvr_increment());
    for row in &full.results {
        assert!(row.lvr_increment() >= Decimal::ZERO);
    }

    assert_eq!(full.totals().opportunity_cost, concentrated.totals().opportunity_cost);
    let rhs = full.final_benchmark_value - full.totals().lvr;
    assert!((full.final_value - rhs).abs() < dec!(0.000001));
}

#[test]
fn deposit_sets_capital() {
    let config = SimulationConfig::new(dec!(9), dec!(11))
        .with_fee_policy(FeePolicyConfig::fixed(dec!(8)))
        .with_deposit(Reserves {
            base: dec!(1000),
            quote: dec!(1000),
        });
    let out = decompose(&hourly(&[dec!(10), dec!(10)]), config).unwrap();
    assert_eq!(out.position.capital_value(), dec!(11000));
    // 11000 * 0.08 / 8760 per hour
    assert!((out.results[1].opportunity_cost() - dec!(0.100456621004566)).abs() < dec!(0.000001));
    assert!((out.initial_reserves.quote - dec!(1000)).abs() < dec!(0.000001));
}

#[test]
fn regime_fee_follows_rolling_volatility() {
    let mut closes = vec![dec!(10); 8];
    closes.extend([dec!(10.1), dec!(9.95), dec!(10.2), dec!(9.9)]);
    let series = hourly(&closes);
    let fees = FeePolicyConfig::default()
        .with_mode(FeeMode::Regime)
        .with_regime(dec!(30), dec!(50), 3);
    let config = static_config()
        .with_fee_policy(fees)
        .with_volume_source(VolumeSource::Observed);

    let out = decompose(&series, config).unwrap();
    let policy = VolatilityRegimeFee::fit(&series, 3, dec!(30), dec!(50)).unwrap();
    for (step, row) in out.results.iter().enumerate().skip(1) {
        // 50000 notional at 30 or 50 bps
        let expected = if policy.is_volatile(step) { dec!(250) } else { dec!(150) };
        assert_eq!(row.fee_accrued(), expected, "step {step}");
    }
    assert_eq!(out.results[3].fee_accrued(), dec!(150));
    assert_eq!(out.results[11].fee_accrued(), dec!(250));
}
