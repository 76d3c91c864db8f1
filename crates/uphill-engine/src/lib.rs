//! Uphill Engine -- fixed-timestep driver around the Uphill movement core.
//!
//! This crate builds on [`uphill_core`] to provide everything a host needs to
//! run the platformer: a [`Simulation`](simulation::Simulation) that turns
//! variable frame times into whole fixed ticks, an
//! [`InputCollector`](input::InputCollector) that folds keyboard and touch
//! events into per-frame input, [`LevelData`](level::LevelData) records, and
//! BLAKE3-hashed snapshots with deterministic replay.
//!
//! # Quick Start
//!
//! ```
//! use uphill_engine::prelude::*;
//!
//! let level = LevelData::uphill_proto();
//! let mut sim = Simulation::from_level(&level, MovementConfig::default(), TickConfig::default())
//!     .unwrap();
//!
//! // One second of wall time at 60 fps with nothing pressed.
//! for _ in 0..60 {
//!     sim.advance(1.0 / 60.0, InputSnapshot::default());
//! }
//!
//! assert!(sim.body().grounded);
//! assert_eq!(sim.body().position.y, 536.0);
//! ```

#![deny(unsafe_code)]

pub mod input;
pub mod level;
pub mod replay;
pub mod simulation;
pub mod snapshot;
pub mod tick;

/// Re-export the core crate for convenience.
pub use uphill_core;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while setting up a simulation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The tick configuration is unusable.
    #[error("invalid tick configuration: {0}")]
    InvalidTickConfig(String),

    /// A body, field or movement configuration failed validation.
    #[error(transparent)]
    Core(#[from] uphill_core::CoreError),

    /// A level record could not be parsed.
    #[error("malformed level data: {0}")]
    LevelFormat(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the core prelude.
    pub use uphill_core::prelude::*;

    pub use crate::input::{ButtonStates, InputCollector, InputEvent, Key, TouchLayout};
    pub use crate::level::LevelData;
    pub use crate::replay::{
        replay, ReplayDivergence, ReplayEntry, ReplayLog, ReplayRecorder, ReplayResult,
    };
    pub use crate::simulation::{FrameReport, Simulation};
    pub use crate::snapshot::SimulationSnapshot;
    pub use crate::tick::{FixedTimestep, FrameClock, TickConfig, TickDiagnostics};
    pub use crate::EngineError;
}
