//! Simulation events for tracking what happens during a decomposition run.
//!
//! The engine records when the position opens, each time the close price
//! leaves or re-enters the range, and when the position is closed at the
//! last candle.

use chrono::{DateTime, Utc};
use clmm_lvr_domain::value_objects::Price;
use rust_decimal::Decimal;

/// What happened to the position at a given step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEventType {
    /// Position was opened.
    PositionOpened,
    /// Position was closed.
    PositionClosed,
    /// Close left the range; fees stop accruing.
    OutOfRange,
    /// Close re-entered the range.
    BackInRange,
}

/// One lifecycle or range event of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationEvent {
    /// Step index when the event occurred.
    pub step: usize,
    /// Candle timestamp.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: SimulationEventType,
    /// Close price at the time of event.
    pub price: Price,
    /// Payload for this kind of event.
    pub data: EventData,
}

/// Values attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// Position opened data.
    PositionOpened {
        /// Capital committed.
        capital: Decimal,
        /// Liquidity sized from the capital.
        liquidity: Decimal,
    },
    /// Position closed data.
    PositionClosed {
        /// Final position value.
        final_value: Decimal,
        /// Final value of the rebalancing benchmark.
        benchmark_value: Decimal,
        /// Final impermanent loss fraction.
        final_il_pct: Decimal,
        /// Net PnL.
        net_pnl: Decimal,
    },
    /// Range transition.
    RangeTransition {
        /// Whether entering (true) or exiting (false) the range.
        entering: bool,
    },
}

impl SimulationEvent {
    /// Creates a position opened event.
    #[must_use]
    pub fn position_opened(
        step: usize,
        timestamp: DateTime<Utc>,
        price: Price,
        capital: Decimal,
        liquidity: Decimal,
    ) -> Self {
        Self {
            step,
            timestamp,
            event_type: SimulationEventType::PositionOpened,
            price,
            data: EventData::PositionOpened { capital, liquidity },
        }
    }

    /// Creates a position closed event.
    #[must_use]
    pub fn position_closed(
        step: usize,
        timestamp: DateTime<Utc>,
        price: Price,
        final_value: Decimal,
        benchmark_value: Decimal,
        final_il_pct: Decimal,
        net_pnl: Decimal,
    ) -> Self {
        Self {
            step,
            timestamp,
            event_type: SimulationEventType::PositionClosed,
            price,
            data: EventData::PositionClosed {
                final_value,
                benchmark_value,
                final_il_pct,
                net_pnl,
            },
        }
    }

    /// The close left the range at `step`.
    #[must_use]
    pub fn out_of_range(step: usize, timestamp: DateTime<Utc>, price: Price) -> Self {
        Self {
            step,
            timestamp,
            event_type: SimulationEventType::OutOfRange,
            price,
            data: EventData::RangeTransition { entering: false },
        }
    }

    /// The close re-entered the range at `step`.
    #[must_use]
    pub fn back_in_range(step: usize, timestamp: DateTime<Utc>, price: Price) -> Self {
        Self {
            step,
            timestamp,
            event_type: SimulationEventType::BackInRange,
            price,
            data: EventData::RangeTransition { entering: true },
        }
    }
}

/// Ordered record of the events of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    /// All recorded events.
    events: Vec<SimulationEvent>,
}

impl EventLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Records an event.
    pub fn record(&mut self, event: SimulationEvent) {
        self.events.push(event);
    }

    /// Returns all events.
    #[must_use]
    pub fn events(&self) -> &[SimulationEvent] {
        &self.events
    }

    /// Events of `event_type`, in step order.
    #[must_use]
    pub fn events_of_type(&self, event_type: SimulationEventType) -> Vec<&SimulationEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// How many events of `event_type` were recorded.
    #[must_use]
    pub fn count_by_type(&self, event_type: SimulationEventType) -> usize {
        self.events_of_type(event_type).len()
    }

    /// Number of times price left the range.
    #[must_use]
    pub fn range_exits(&self) -> usize {
        self.count_by_type(SimulationEventType::OutOfRange)
    }
}
