//! Uphill Core -- deterministic platformer body physics over static geometry.
//!
//! This crate holds the simulation core of the Uphill movement engine: one
//! controllable [`Body`](body::Body) moving through an immutable
//! [`ObstacleField`](field::ObstacleField) of axis-aligned rectangles under
//! gravity. The [`Integrator`](integrator::Integrator) advances the body by a
//! single fixed timestep, applies the movement-feel rules (acceleration,
//! friction, two-phase jump, apex float, jump buffering) and resolves overlaps
//! axis by axis.
//!
//! Input arrives as a normalized [`InputSnapshot`](input::InputSnapshot);
//! how it was collected (keyboard, touch, replay) is not this crate's concern.
//!
//! # Quick Start
//!
//! ```
//! use uphill_core::prelude::*;
//!
//! let field = ObstacleField::new(vec![Obstacle::solid(0.0, 600.0, 1280.0, 120.0)]).unwrap();
//! let integrator = Integrator::new(MovementConfig::default(), WorldBounds::default()).unwrap();
//! let mut body = Body::new(Vec2::new(100.0, 500.0), Vec2::new(32.0, 64.0)).unwrap();
//!
//! for _ in 0..60 {
//!     integrator.step(&mut body, &InputSnapshot::default(), &field, 0.016);
//! }
//!
//! assert!(body.grounded);
//! assert_eq!(body.position.y, 536.0);
//! ```

#![deny(unsafe_code)]

pub mod body;
pub mod config;
pub mod field;
pub mod input;
pub mod integrator;
pub mod math;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while building core simulation objects.
///
/// Stepping never fails; these only surface when a body, field or
/// configuration is constructed from data that violates the core invariants.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A body was given a non-positive or non-finite size.
    #[error("body size must be strictly positive and finite, got {width}x{height}")]
    InvalidBodySize { width: f64, height: f64 },

    /// A body was given a non-finite spawn point.
    #[error("spawn point must be finite, got ({x}, {y})")]
    InvalidSpawn { x: f64, y: f64 },

    /// An obstacle rectangle is non-finite or has a negative extent.
    #[error("obstacle #{index} has an invalid rectangle {rect:?}")]
    InvalidObstacle { index: usize, rect: math::Rect },

    /// A movement or world parameter is outside its legal range.
    #[error("invalid parameter '{name}' = {value}: {expected}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::body::Body;
    pub use crate::config::{JumpCut, MovementConfig, WorldBounds};
    pub use crate::field::{Obstacle, ObstacleField, SurfaceKind};
    pub use crate::input::InputSnapshot;
    pub use crate::integrator::{Integrator, StepEvents};
    pub use crate::math::{approach, Rect, Vec2};
    pub use crate::CoreError;
}
