use crate::error::DomainError;
use crate::fees::BPS_DENOMINATOR;
use rust_decimal::Decimal;

/// Fee earned on `notional` at `fee_bps`.
#[must_use]
pub fn fee_for_notional(notional: Decimal, fee_bps: Decimal) -> Decimal {
    notional * fee_bps / BPS_DENOMINATOR
}

/// Annualises fees earned over `days` against `principal`.
pub fn calculate_apy(
    fees_earned: Decimal,
    principal: Decimal,
    days: Decimal,
) -> Result<Decimal, DomainError> {
    if principal.is_zero() {
        return Err(DomainError::Arithmetic("principal cannot be zero"));
    }
    if days <= Decimal::ZERO {
        return Err(DomainError::Arithmetic("duration must be positive"));
    }

    let year_days = Decimal::from(365);
    let roi = fees_earned / principal;
    Ok(roi * (year_days / days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_for_notional() {
        assert_eq!(fee_for_notional(dec!(10000), dec!(8)), dec!(8));
        assert_eq!(fee_for_notional(dec!(0), dec!(100)), dec!(0));
    }

    #[test]
    fn test_calculate_apy() {
        // 1% over 36.5 days is 10% a year
        let apy = calculate_apy(dec!(1000), dec!(100000), dec!(36.5)).unwrap();
        assert_eq!(apy, dec!(0.1));
        assert!(calculate_apy(dec!(1), dec!(0), dec!(1)).is_err());
        assert!(calculate_apy(dec!(1), dec!(1), dec!(0)).is_err());
    }
}
