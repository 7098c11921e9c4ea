use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod fees;
pub mod impermanent_loss;
pub mod lvr;
pub mod opportunity_cost;

/// Position value versus holding the initial reserves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpermanentLoss {
    /// `position_value - hold_value`, in quote currency.
    pub absolute_loss: Decimal,
    /// `absolute_loss / hold_value`; negative is a loss.
    pub percentage_loss: Decimal,
}
