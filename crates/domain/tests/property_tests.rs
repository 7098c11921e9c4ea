//! Property tests for the AMM math, fee policy and accrual invariants.
//!
//! 1. LVR increments are never negative, concentrated or full range
//! 2. A swap between equal prices moves nothing
//! 3. Dynamic fees are monotone in the oracle step and collapse to static at k = 0
//! 4. Simple opportunity cost is linear in elapsed microseconds
//! 5. The value split is even at the geometric midpoint of any range

use clmm_lvr_domain::entities::LiquidityPosition;
use clmm_lvr_domain::fees::{FeePolicy, FeePolicyConfig};
use clmm_lvr_domain::math::{reserves_at, swap_to_price};
use clmm_lvr_domain::metrics::{lvr::lvr_increment, opportunity_cost::simple_interest};
use clmm_lvr_domain::value_objects::{Price, PriceRange};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = Price> {
    (500i64..2000).prop_map(|c| Price::new(Decimal::new(c, 2)).unwrap())
}

fn arb_range() -> impl Strategy<Value = PriceRange> {
    (500i64..1500, 1i64..1000).prop_map(|(lower, width)| {
        PriceRange::from_bounds(Decimal::new(lower, 2), Decimal::new(lower + width, 2)).unwrap()
    })
}

fn arb_step() -> impl Strategy<Value = Decimal> {
    (0i64..200_000).prop_map(|s| Decimal::new(s, 6))
}

fn position(range: PriceRange) -> LiquidityPosition {
    let entry = range.geometric_mid().unwrap();
    LiquidityPosition::from_capital(range, dec!(100000), entry).unwrap()
}

// ── 1. LVR non-negativity ────────────────────────────────────────────

proptest! {
    #[test]
    fn lvr_is_non_negative(range in arb_range(), from in arb_price(), to in arb_price()) {
        let pos = position(range);
        let lvr = lvr_increment(from, to, &pos).unwrap();
        prop_assert!(lvr >= Decimal::ZERO);
    }

    #[test]
    fn full_range_lvr_is_non_negative(entry in arb_price(), from in arb_price(), to in arb_price()) {
        let pos = LiquidityPosition::full_range_from_capital(dec!(100000), entry).unwrap();
        let lvr = lvr_increment(from, to, &pos).unwrap();
        prop_assert!(lvr >= Decimal::ZERO);
    }

    // ── 2. Zero trade ────────────────────────────────────────────────

    #[test]
    fn swap_between_equal_prices_is_zero(range in arb_range(), p in arb_price()) {
        let pos = position(range);
        let quote = swap_to_price(p, p, &pos).unwrap();
        prop_assert!(quote.is_zero());
        prop_assert_eq!(quote.notional, Decimal::ZERO);
        prop_assert_eq!(quote.amount_in, Decimal::ZERO);
        prop_assert_eq!(quote.amount_out, Decimal::ZERO);
    }

    #[test]
    fn quote_reserve_grows_with_price(range in arb_range(), a in arb_price(), b in arb_price()) {
        let pos = position(range);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let r_lo = reserves_at(lo, &pos).unwrap();
        let r_hi = reserves_at(hi, &pos).unwrap();
        prop_assert!(r_hi.quote >= r_lo.quote);
        prop_assert!(r_hi.base <= r_lo.base);
    }

    // ── 3. Fee monotonicity ──────────────────────────────────────────

    #[test]
    fn dynamic_fee_is_monotone(a in arb_step(), b in arb_step(), k in 0i64..500) {
        let config = FeePolicyConfig::default().with_sensitivity(Decimal::new(k, 2));
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(config.fee_bps(lo) <= config.fee_bps(hi));
    }

    #[test]
    fn dynamic_fee_with_zero_k_is_static(step in arb_step(), base in 1i64..100) {
        let base = Decimal::from(base);
        let dynamic = FeePolicyConfig::default().with_base_bps(base).with_sensitivity(Decimal::ZERO);
        let fixed = FeePolicyConfig::fixed(base);
        prop_assert_eq!(dynamic.fee_bps(step), fixed.fee_bps(step));
    }

    // ── 4. Linear accrual ────────────────────────────────────────────

    #[test]
    fn simple_interest_is_linear(
        capital in 1i64..10_000_000,
        rate_bps in 0i64..2000,
        micros in 1i64..10_000_000_000_000,
    ) {
        let capital = Decimal::from(capital);
        let rate = Decimal::new(rate_bps, 4);
        let once = simple_interest(capital, rate, micros).unwrap();
        let twice = simple_interest(capital, rate, micros * 2).unwrap();
        prop_assert_eq!(twice, once * Decimal::TWO);
    }

    // ── 5. Even split at the geometric mid ───────────────────────────

    #[test]
    fn even_split_at_geometric_mid(range in arb_range()) {
        let mid = range.geometric_mid().unwrap();
        let pos = position(range);
        let r = reserves_at(mid, &pos).unwrap();
        let base_value = r.base * mid.value();
        let tolerance = (base_value + r.quote) * dec!(0.0000001);
        prop_assert!((base_value - r.quote).abs() <= tolerance);
    }
}
