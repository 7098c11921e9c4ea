//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use clmm_lvr_simulation::prelude::*;
//! ```

// Engine
pub use crate::engine::{Decomposition, DecompositionEngine, IncompleteRun, decompose};

// Events
pub use crate::event::{EventData, EventLog, SimulationEvent, SimulationEventType};

// State management
pub use crate::state::{RunState, SimulationConfig};

// Volume models
pub use crate::volume::{ArbitrageVolume, ObservedVolume, VolumeModel};
