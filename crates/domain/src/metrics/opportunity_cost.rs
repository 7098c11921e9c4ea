use crate::enums::InterestMode;
use crate::error::DomainError;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// A year of 365 days, in microseconds.
pub const MICROS_PER_YEAR: i64 = 31_536_000_000_000;

/// Decimal places kept on the per-microsecond rate; products with whole microseconds stay exact.
const PER_MICRO_SCALE: u32 = 22;

fn check_elapsed(elapsed_micros: i64) -> Result<(), DomainError> {
    if elapsed_micros < 0 {
        return Err(DomainError::NegativeTerm {
            field: "elapsed_micros",
            value: Decimal::from(elapsed_micros),
        });
    }
    Ok(())
}

/// `capital * rate * dt_years` on the initial capital.
///
/// Computed as a per-microsecond accrual times elapsed microseconds, so it is
/// exactly linear in elapsed time.
pub fn simple_interest(
    capital: Decimal,
    annual_rate: Decimal,
    elapsed_micros: i64,
) -> Result<Decimal, DomainError> {
    check_elapsed(elapsed_micros)?;
    let per_micro = capital
        .checked_mul(annual_rate)
        .ok_or(DomainError::Arithmetic("simple interest overflow"))?
        / Decimal::from(MICROS_PER_YEAR);
    per_micro
        .round_dp(PER_MICRO_SCALE)
        .checked_mul(Decimal::from(elapsed_micros))
        .ok_or(DomainError::Arithmetic("simple interest overflow"))
}

/// `(capital + accrued) * ((1 + rate)^dt_years - 1)`.
pub fn compound_interest(
    capital: Decimal,
    accrued: Decimal,
    annual_rate: Decimal,
    elapsed_micros: i64,
) -> Result<Decimal, DomainError> {
    check_elapsed(elapsed_micros)?;
    let rate = annual_rate
        .to_f64()
        .ok_or(DomainError::Arithmetic("rate not representable as f64"))?;
    let years = elapsed_micros as f64 / MICROS_PER_YEAR as f64;
    let growth = Decimal::from_f64((1.0 + rate).powf(years) - 1.0)
        .ok_or(DomainError::Arithmetic("compound growth overflow"))?;
    (capital + accrued)
        .checked_mul(growth)
        .ok_or(DomainError::Arithmetic("compound interest overflow"))
}

/// Interest forgone over one step under `mode`.
pub fn opportunity_cost(
    mode: InterestMode,
    capital: Decimal,
    accrued: Decimal,
    annual_rate: Decimal,
    elapsed_micros: i64,
) -> Result<Decimal, DomainError> {
    match mode {
        InterestMode::Simple => simple_interest(capital, annual_rate, elapsed_micros),
        InterestMode::Compound => compound_interest(capital, accrued, annual_rate, elapsed_micros),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HOUR: i64 = 3_600_000_000;

    #[test]
    fn test_simple_is_linear() {
        let one = simple_interest(dec!(100000), dec!(0.08), HOUR).unwrap();
        let two = simple_interest(dec!(100000), dec!(0.08), 2 * HOUR).unwrap();
        assert_eq!(two, one * dec!(2));
        // 100000 * 0.08 / 8760 ~= 0.913242
        assert!((one - dec!(0.913242)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_fractional_seconds_accrue() {
        let half = simple_interest(dec!(100000), dec!(0.08), 1_500_000).unwrap();
        let whole = simple_interest(dec!(100000), dec!(0.08), 3_000_000).unwrap();
        assert_eq!(whole, half * dec!(2));
        // 100000 * 0.08 * 3 / 31536000
        assert!((whole - dec!(0.00076103500761035)).abs() < dec!(0.000000000001));
        assert!(simple_interest(dec!(100000), dec!(0.08), 500_000).unwrap() > Decimal::ZERO);
    }

    #[test]
    fn test_simple_full_year() {
        let year = simple_interest(dec!(100000), dec!(0.08), MICROS_PER_YEAR).unwrap();
        assert!((year - dec!(8000)).abs() < dec!(0.00001));
    }

    #[test]
    fn test_compound_exceeds_simple_over_a_year() {
        let year = compound_interest(dec!(100000), dec!(0), dec!(0.08), MICROS_PER_YEAR).unwrap();
        assert!((year - dec!(8000)).abs() < dec!(0.01));
        let with_accrued =
            compound_interest(dec!(100000), dec!(8000), dec!(0.08), MICROS_PER_YEAR).unwrap();
        assert!(with_accrued > year);
    }

    #[test]
    fn test_zero_rate_and_zero_time() {
        assert_eq!(simple_interest(dec!(100000), dec!(0), HOUR).unwrap(), dec!(0));
        assert_eq!(
            opportunity_cost(InterestMode::Compound, dec!(100000), dec!(0), dec!(0.08), 0).unwrap(),
            dec!(0)
        );
        assert!(simple_interest(dec!(1), dec!(0.08), -1).is_err());
    }

    #[test]
    fn test_overflow_is_an_error() {
        let huge_rate = Decimal::from_i128_with_scale(10_i128.pow(26), 0);
        assert_eq!(
            simple_interest(dec!(100000), huge_rate, HOUR),
            Err(DomainError::Arithmetic("simple interest overflow"))
        );
    }
}
