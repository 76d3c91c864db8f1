//! The simulated actor.

use serde::{Deserialize, Serialize};

use crate::math::{Rect, Vec2};
use crate::CoreError;

/// The single controllable body.
///
/// Created once per level at its spawn point, mutated in place by the
/// [`Integrator`](crate::integrator::Integrator) every fixed tick and reset
/// to the spawn point when it falls out of the world. It is never destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Top-left corner of the bounding box, in world units.
    pub position: Vec2,
    /// Velocity in world units per second.
    pub velocity: Vec2,
    /// Bounding-box extents. Constant and strictly positive.
    pub size: Vec2,
    /// True iff the last vertical resolution left the body resting on a
    /// surface.
    pub grounded: bool,
    /// Seconds left during which a held jump keeps the ascent going.
    /// Zero when no extendable jump is in progress.
    pub var_jump_timer: f64,
    /// Seconds left during which an early jump press is still honoured on
    /// landing.
    pub jump_buffer_timer: f64,
    /// Where the body reappears after falling out of the world.
    pub spawn: Vec2,
}

impl Body {
    /// Create a body at rest at `spawn`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidBodySize`] if either extent is not strictly
    /// positive and finite, and [`CoreError::InvalidSpawn`] if the spawn point
    /// is not finite.
    pub fn new(spawn: Vec2, size: Vec2) -> Result<Self, CoreError> {
        if !(size.x > 0.0 && size.y > 0.0 && size.is_finite()) {
            return Err(CoreError::InvalidBodySize {
                width: size.x,
                height: size.y,
            });
        }
        if !spawn.is_finite() {
            return Err(CoreError::InvalidSpawn {
                x: spawn.x,
                y: spawn.y,
            });
        }
        Ok(Self {
            position: spawn,
            velocity: Vec2::ZERO,
            size,
            grounded: false,
            var_jump_timer: 0.0,
            jump_buffer_timer: 0.0,
            spawn,
        })
    }

    /// Current world-space bounding box.
    pub fn bounds(&self) -> Rect {
        Rect::from_pos_size(self.position, self.size)
    }

    /// Send the body back to its spawn point with zero velocity and no jump
    /// in progress. `grounded` is left for the next vertical pass to decide.
    pub fn respawn(&mut self) {
        self.position = self.spawn;
        self.velocity = Vec2::ZERO;
        self.var_jump_timer = 0.0;
        self.jump_buffer_timer = 0.0;
    }

    /// Whether position and velocity are both finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_body_rests_at_spawn() {
        let body = Body::new(Vec2::new(100.0, 500.0), Vec2::new(32.0, 64.0)).unwrap();
        assert_eq!(body.position, Vec2::new(100.0, 500.0));
        assert_eq!(body.velocity, Vec2::ZERO);
        assert!(!body.grounded);
        assert_eq!(body.var_jump_timer, 0.0);
        assert_eq!(body.bounds(), Rect::new(100.0, 500.0, 32.0, 64.0));
    }

    #[test]
    fn new_rejects_degenerate_size() {
        for size in [
            Vec2::new(0.0, 64.0),
            Vec2::new(32.0, -1.0),
            Vec2::new(f64::INFINITY, 64.0),
            Vec2::new(f64::NAN, 64.0),
        ] {
            let err = Body::new(Vec2::ZERO, size).unwrap_err();
            assert!(matches!(err, CoreError::InvalidBodySize { .. }), "size {size:?}");
        }
    }

    #[test]
    fn new_rejects_non_finite_spawn() {
        let err = Body::new(Vec2::new(f64::NAN, 0.0), Vec2::new(1.0, 1.0)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSpawn { .. }));
    }

    #[test]
    fn respawn_clears_motion_and_timers() {
        let mut body = Body::new(Vec2::new(100.0, 500.0), Vec2::new(32.0, 64.0)).unwrap();
        body.position = Vec2::new(640.0, 900.0);
        body.velocity = Vec2::new(-120.0, 1000.0);
        body.var_jump_timer = 0.1;
        body.jump_buffer_timer = 0.05;
        body.grounded = true;

        body.respawn();

        assert_eq!(body.position, Vec2::new(100.0, 500.0));
        assert_eq!(body.velocity, Vec2::ZERO);
        assert_eq!(body.var_jump_timer, 0.0);
        assert_eq!(body.jump_buffer_timer, 0.0);
        assert!(body.grounded, "grounded is left for the next tick to recompute");
    }
}
