use clmm_lvr_domain::DomainError;
use clmm_lvr_domain::entities::{Candle, LiquidityPosition};
use clmm_lvr_domain::enums::VolumeSource;
use clmm_lvr_domain::math::swap_to_price;
use clmm_lvr_domain::value_objects::Price;
use rust_decimal::Decimal;

/// Trait for modeling the fee-generating notional of a step.
pub trait VolumeModel: Send + Sync {
    /// Quote-currency notional that pays fees when price moves from
    /// `previous_price` to the close of `candle`.
    fn fee_notional(
        &self,
        previous_price: Price,
        candle: &Candle,
        position: &LiquidityPosition,
    ) -> Result<Decimal, DomainError>;
}

/// Notional of the arbitrage trade that re-prices the position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArbitrageVolume;

impl VolumeModel for ArbitrageVolume {
    fn fee_notional(
        &self,
        previous_price: Price,
        candle: &Candle,
        position: &LiquidityPosition,
    ) -> Result<Decimal, DomainError> {
        Ok(swap_to_price(previous_price, candle.close(), position)?.notional)
    }
}

/// Observed quote-currency volume of the candle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservedVolume;

impl VolumeModel for ObservedVolume {
    fn fee_notional(
        &self,
        _previous_price: Price,
        candle: &Candle,
        _position: &LiquidityPosition,
    ) -> Result<Decimal, DomainError> {
        Ok(candle.volume_quote())
    }
}

impl VolumeModel for VolumeSource {
    fn fee_notional(
        &self,
        previous_price: Price,
        candle: &Candle,
        position: &LiquidityPosition,
    ) -> Result<Decimal, DomainError> {
        match self {
            Self::Arbitrage => ArbitrageVolume.fee_notional(previous_price, candle, position),
            Self::Observed => ObservedVolume.fee_notional(previous_price, candle, position),
        }
    }
}
