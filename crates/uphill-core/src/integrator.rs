//! Fixed-step integration and axis-separated collision resolution.
//!
//! [`Integrator::step`] advances one [`Body`] by one fixed tick. The order of
//! operations is part of the contract, because replays depend on it:
//!
//! 1. Horizontal target speed from input (right wins over left).
//! 2. Horizontal acceleration, or friction when no direction is held.
//! 3. Jump trigger (fresh or buffered press while grounded).
//! 4. Variable jump window: hold keeps the ascent at jump speed, release
//!    closes the window and applies the configured [`JumpCut`].
//! 5. Gravity toward terminal velocity, softened near the apex if enabled.
//! 6. Move along X and resolve, then move along Y and resolve.
//! 7. Respawn if the body fell past the kill plane.
//!
//! # Known approximations
//!
//! Resolution is iterative, not exact: every obstacle overlapping the moved
//! box is resolved in field order and the last write wins. There is no
//! sub-stepping, so a body fast enough to cross a thin obstacle in one tick
//! passes through it.

use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::config::{JumpCut, MovementConfig, WorldBounds};
use crate::field::ObstacleField;
use crate::input::InputSnapshot;
use crate::math::approach;
use crate::CoreError;

// ---------------------------------------------------------------------------
// StepEvents
// ---------------------------------------------------------------------------

/// Things that happened during one step, for audio/animation/respawn hooks.
///
/// None of these are needed for the simulation to be correct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvents {
    /// A jump was triggered this tick.
    pub jumped: bool,
    /// The body became grounded this tick after not being grounded.
    pub landed: bool,
    /// The body hit a ceiling while rising.
    pub bonked: bool,
    /// The body fell out of the world and was sent back to spawn.
    pub respawned: bool,
}

impl StepEvents {
    /// Fold another step's events into this one (logical OR per flag).
    pub fn merge(&mut self, other: StepEvents) {
        self.jumped |= other.jumped;
        self.landed |= other.landed;
        self.bonked |= other.bonked;
        self.respawned |= other.respawned;
    }

    /// Whether no flag is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Integrator
// ---------------------------------------------------------------------------

/// Advances a body by fixed timesteps using validated tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct Integrator {
    config: MovementConfig,
    bounds: WorldBounds,
}

impl Integrator {
    /// Create an integrator after validating both configurations.
    pub fn new(config: MovementConfig, bounds: WorldBounds) -> Result<Self, CoreError> {
        config.validate()?;
        bounds.validate()?;
        Ok(Self { config, bounds })
    }

    /// The movement tuning in use.
    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// The world bounds in use.
    pub fn bounds(&self) -> &WorldBounds {
        &self.bounds
    }

    /// Advance `body` by `dt` seconds.
    ///
    /// Deterministic: identical body, input, field and `dt` always produce
    /// the identical result. A `dt` of zero is a no-op. A negative or
    /// non-finite `dt` trips a debug assertion and is treated as zero in
    /// release builds. If the step would leave the body with a non-finite
    /// position or velocity, the body is restored to its pre-step state.
    pub fn step(
        &self,
        body: &mut Body,
        input: &InputSnapshot,
        field: &ObstacleField,
        dt: f64,
    ) -> StepEvents {
        debug_assert!(dt >= 0.0 && dt.is_finite(), "dt must be >= 0 and finite, got {dt}");
        debug_assert!(
            body.size.x > 0.0 && body.size.y > 0.0,
            "body size must be strictly positive, got {:?}",
            body.size
        );
        if !(dt > 0.0 && dt.is_finite()) {
            return StepEvents::default();
        }

        let before = *body;
        let mut events = StepEvents::default();

        self.apply_run(body, input, dt);
        events.jumped = self.apply_jump(body, input, dt);
        self.apply_variable_jump(body, input, dt);
        self.apply_gravity(body, input, dt);

        self.move_x(body, field, dt);
        events.bonked = self.move_y(body, field, dt);
        events.landed = body.grounded && !before.grounded;

        if body.position.y > self.bounds.kill_plane() {
            tracing::debug!(
                x = body.position.x,
                y = body.position.y,
                kill_plane = self.bounds.kill_plane(),
                "body fell out of the world; respawning"
            );
            body.respawn();
            events.respawned = true;
        }

        if !body.is_finite() {
            tracing::warn!(
                position = ?body.position,
                velocity = ?body.velocity,
                dt,
                "step produced a non-finite body; rolling back"
            );
            *body = before;
            return StepEvents::default();
        }

        events
    }

    // -- movement rules -----------------------------------------------------

    fn apply_run(&self, body: &mut Body, input: &InputSnapshot, dt: f64) {
        let c = &self.config;
        let direction = input.move_direction();

        if direction == 0.0 {
            let friction = if body.grounded {
                c.run_reduce
            } else {
                c.air_friction
            };
            body.velocity.x = approach(body.velocity.x, 0.0, friction * dt);
            return;
        }

        let mult = if body.grounded { 1.0 } else { c.air_mult };
        let target = direction * c.max_run;
        let vx = body.velocity.x;
        let rate = if vx.abs() > c.max_run && vx.signum() == direction {
            // Over-speed in the held direction bleeds off instead of snapping.
            c.run_reduce
        } else {
            c.run_accel
        };
        body.velocity.x = approach(vx, target, rate * mult * dt);
    }

    /// Returns whether a jump was triggered.
    fn apply_jump(&self, body: &mut Body, input: &InputSnapshot, dt: f64) -> bool {
        if input.jump_pressed {
            body.jump_buffer_timer = self.config.jump_buffer_time;
        }
        let wants_jump = input.jump_pressed || body.jump_buffer_timer > 0.0;

        if wants_jump && body.grounded {
            body.velocity.y = self.config.jump_speed;
            body.grounded = false;
            body.var_jump_timer = self.config.var_jump_time;
            body.jump_buffer_timer = 0.0;
            return true;
        }

        body.jump_buffer_timer = (body.jump_buffer_timer - dt).max(0.0);
        false
    }

    fn apply_variable_jump(&self, body: &mut Body, input: &InputSnapshot, dt: f64) {
        if body.var_jump_timer <= 0.0 {
            return;
        }

        if input.jump_held {
            body.var_jump_timer = (body.var_jump_timer - dt).max(0.0);
            if body.var_jump_timer > 0.0 {
                body.velocity.y = body.velocity.y.min(self.config.jump_speed);
            }
            return;
        }

        body.var_jump_timer = 0.0;
        if self.config.jump_cut == JumpCut::Halve && body.velocity.y < 0.0 {
            body.velocity.y *= 0.5;
        }
    }

    fn apply_gravity(&self, body: &mut Body, input: &InputSnapshot, dt: f64) {
        let c = &self.config;
        let near_apex = body.velocity.y.abs() < c.apex_threshold && !input.jump_held;
        let gravity = if near_apex {
            c.gravity * c.apex_gravity_mult
        } else {
            c.gravity
        };
        body.velocity.y = approach(body.velocity.y, c.max_fall, gravity * dt).min(c.max_fall);
    }

    // -- collision resolution -----------------------------------------------

    fn move_x(&self, body: &mut Body, field: &ObstacleField, dt: f64) {
        body.position.x += body.velocity.x * dt;

        let travel = body.velocity.x;
        for obstacle in field.overlapping(body.bounds()) {
            if travel > 0.0 {
                body.position.x = obstacle.rect.x - body.size.x;
            } else if travel < 0.0 {
                body.position.x = obstacle.rect.right();
            }
            body.velocity.x = 0.0;
        }
    }

    /// Returns whether the body hit a ceiling.
    fn move_y(&self, body: &mut Body, field: &ObstacleField, dt: f64) -> bool {
        body.position.y += body.velocity.y * dt;
        body.grounded = false;

        let travel = body.velocity.y;
        let mut bonked = false;
        for obstacle in field.overlapping(body.bounds()) {
            if travel > 0.0 {
                body.position.y = obstacle.rect.y - body.size.y;
                body.grounded = true;
                body.velocity.y = 0.0;
            } else if travel < 0.0 {
                body.position.y = obstacle.rect.bottom();
                body.velocity.y = 0.0;
                body.var_jump_timer = 0.0;
                bonked = true;
            }
        }
        bonked
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Obstacle;
    use crate::math::Vec2;

    const DT: f64 = 0.016;

    fn floor() -> ObstacleField {
        ObstacleField::new(vec![Obstacle::solid(0.0, 600.0, 1280.0, 120.0)]).unwrap()
    }

    fn integrator() -> Integrator {
        Integrator::new(MovementConfig::default(), WorldBounds::default()).unwrap()
    }

    fn grounded_body() -> Body {
        let mut body = Body::new(Vec2::new(100.0, 500.0), Vec2::new(32.0, 64.0)).unwrap();
        body.position = Vec2::new(100.0, 536.0);
        body.grounded = true;
        body
    }

    fn held_jump() -> InputSnapshot {
        InputSnapshot {
            jump_held: true,
            ..Default::default()
        }
    }

    fn pressed_jump() -> InputSnapshot {
        InputSnapshot {
            jump_pressed: true,
            jump_held: true,
            ..Default::default()
        }
    }

    #[test]
    fn new_rejects_invalid_config() {
        let bad = MovementConfig {
            max_run: -1.0,
            ..Default::default()
        };
        assert!(Integrator::new(bad, WorldBounds::default()).is_err());
    }

    #[test]
    fn zero_dt_is_a_noop() {
        let mut body = grounded_body();
        body.velocity = Vec2::new(200.0, -300.0);
        let before = body;

        let events = integrator().step(&mut body, &pressed_jump(), &floor(), 0.0);

        assert_eq!(body, before);
        assert!(events.is_empty());
    }

    #[test]
    fn jump_press_while_grounded_launches_body() {
        let mut body = grounded_body();
        let events = integrator().step(&mut body, &pressed_jump(), &floor(), DT);

        assert!(events.jumped);
        assert!(!body.grounded);
        assert!(body.position.y < 536.0);
        // Jump speed, then one tick of gravity.
        assert!((body.velocity.y - (-950.0 + 2200.0 * DT)).abs() < 1e-9);
        assert!(body.var_jump_timer > 0.0);
    }

    #[test]
    fn jump_press_while_airborne_is_ignored_without_buffer() {
        let mut body = grounded_body();
        body.position.y = 300.0;
        body.grounded = false;

        let events = integrator().step(&mut body, &pressed_jump(), &floor(), DT);

        assert!(!events.jumped);
        assert!(body.velocity.y > 0.0);
        assert_eq!(body.jump_buffer_timer, 0.0);
    }

    #[test]
    fn held_jump_keeps_ascent_at_jump_speed() {
        let integ = integrator();
        let field = floor();
        let mut body = grounded_body();
        integ.step(&mut body, &pressed_jump(), &field, DT);

        integ.step(&mut body, &held_jump(), &field, DT);
        // Clamped back to jump speed before gravity applied.
        assert!((body.velocity.y - (-950.0 + 2200.0 * DT)).abs() < 1e-9);
    }

    #[test]
    fn release_halves_rising_velocity_by_default() {
        let integ = integrator();
        let field = floor();
        let mut body = grounded_body();
        integ.step(&mut body, &pressed_jump(), &field, DT);
        let vy_before = body.velocity.y;

        integ.step(&mut body, &InputSnapshot::IDLE, &field, DT);

        assert_eq!(body.var_jump_timer, 0.0);
        let expected = vy_before * 0.5 + 2200.0 * DT;
        assert!((body.velocity.y - expected).abs() < 1e-9);
    }

    #[test]
    fn release_with_stop_extending_only_closes_window() {
        let config = MovementConfig {
            jump_cut: JumpCut::StopExtending,
            ..Default::default()
        };
        let integ = Integrator::new(config, WorldBounds::default()).unwrap();
        let field = floor();
        let mut body = grounded_body();
        integ.step(&mut body, &pressed_jump(), &field, DT);
        let vy_before = body.velocity.y;

        integ.step(&mut body, &InputSnapshot::IDLE, &field, DT);

        assert_eq!(body.var_jump_timer, 0.0);
        assert!((body.velocity.y - (vy_before + 2200.0 * DT)).abs() < 1e-9);
    }

    #[test]
    fn release_after_window_has_no_cut() {
        let integ = integrator();
        let field = floor();
        let mut body = grounded_body();
        integ.step(&mut body, &pressed_jump(), &field, DT);
        while body.var_jump_timer > 0.0 {
            integ.step(&mut body, &held_jump(), &field, DT);
        }
        let vy_before = body.velocity.y;
        assert!(vy_before < 0.0, "still rising after the window closes");

        integ.step(&mut body, &InputSnapshot::IDLE, &field, DT);
        assert!((body.velocity.y - (vy_before + 2200.0 * DT)).abs() < 1e-9);
    }

    #[test]
    fn gravity_never_exceeds_max_fall() {
        let integ = integrator();
        let field = ObstacleField::empty();
        let mut body = grounded_body();
        body.position.y = -10_000.0;
        body.grounded = false;
        body.velocity.y = 5000.0;

        integ.step(&mut body, &InputSnapshot::IDLE, &field, DT);
        assert_eq!(body.velocity.y, 1000.0);

        for _ in 0..10 {
            integ.step(&mut body, &InputSnapshot::IDLE, &field, DT);
            assert!(body.velocity.y <= 1000.0);
        }
    }

    #[test]
    fn apex_gravity_applies_only_near_apex_without_hold() {
        let config = MovementConfig {
            apex_threshold: 100.0,
            apex_gravity_mult: 0.5,
            ..Default::default()
        };
        let integ = Integrator::new(config, WorldBounds::default()).unwrap();
        let field = ObstacleField::empty();

        let mut floating = grounded_body();
        floating.grounded = false;
        floating.position.y = 0.0;
        floating.velocity.y = -20.0;
        integ.step(&mut floating, &InputSnapshot::IDLE, &field, DT);
        assert!((floating.velocity.y - (-20.0 + 1100.0 * DT)).abs() < 1e-9);

        let mut held = grounded_body();
        held.grounded = false;
        held.position.y = 0.0;
        held.velocity.y = -20.0;
        integ.step(&mut held, &held_jump(), &field, DT);
        assert!((held.velocity.y - (-20.0 + 2200.0 * DT)).abs() < 1e-9);
    }

    #[test]
    fn airborne_acceleration_uses_air_mult() {
        let integ = integrator();
        let mut body = grounded_body();
        body.grounded = false;
        body.position.y = 0.0;
        let input = InputSnapshot {
            move_right: true,
            ..Default::default()
        };

        integ.step(&mut body, &input, &ObstacleField::empty(), DT);
        assert!((body.velocity.x - 3000.0 * 0.65 * DT).abs() < 1e-9);
    }

    #[test]
    fn ground_friction_stops_without_overshoot() {
        let integ = integrator();
        let field = floor();
        let mut body = grounded_body();
        body.velocity.x = 50.0;

        integ.step(&mut body, &InputSnapshot::IDLE, &field, DT);
        assert_eq!(body.velocity.x, 10.0);
        integ.step(&mut body, &InputSnapshot::IDLE, &field, DT);
        assert_eq!(body.velocity.x, 0.0);
    }

    #[test]
    fn air_friction_is_gentler_than_ground() {
        let integ = integrator();
        let mut body = grounded_body();
        body.grounded = false;
        body.position.y = 0.0;
        body.velocity.x = -100.0;

        integ.step(&mut body, &InputSnapshot::IDLE, &ObstacleField::empty(), DT);
        assert!((body.velocity.x - (-100.0 + 500.0 * DT)).abs() < 1e-9);
    }

    #[test]
    fn over_speed_bleeds_off_at_reduce_rate() {
        let integ = integrator();
        let field = floor();
        let mut body = grounded_body();
        body.velocity.x = 600.0;
        let input = InputSnapshot {
            move_right: true,
            ..Default::default()
        };

        integ.step(&mut body, &input, &field, DT);
        assert!((body.velocity.x - (600.0 - 2500.0 * DT)).abs() < 1e-9);
    }

    #[test]
    fn reversing_direction_accelerates_through_zero() {
        let integ = integrator();
        let field = floor();
        let mut body = grounded_body();
        body.velocity.x = 450.0;
        let input = InputSnapshot {
            move_left: true,
            ..Default::default()
        };

        integ.step(&mut body, &input, &field, DT);
        assert!((body.velocity.x - (450.0 - 3000.0 * DT)).abs() < 1e-9);
    }

    #[test]
    fn wall_stops_horizontal_motion() {
        let integ = integrator();
        let field = ObstacleField::new(vec![
            Obstacle::solid(0.0, 600.0, 1280.0, 120.0),
            Obstacle::solid(1280.0, 0.0, 50.0, 720.0),
        ])
        .unwrap();
        let mut body = grounded_body();
        body.position.x = 1240.0;
        let input = InputSnapshot {
            move_right: true,
            ..Default::default()
        };

        for _ in 0..30 {
            integ.step(&mut body, &input, &field, DT);
        }

        assert_eq!(body.position.x, 1248.0);
        assert_eq!(body.velocity.x, 0.0);
        assert!(body.grounded);
    }

    #[test]
    fn left_wall_pushes_to_its_right_edge() {
        let integ = integrator();
        let field = ObstacleField::new(vec![
            Obstacle::solid(0.0, 600.0, 1280.0, 120.0),
            Obstacle::solid(-50.0, 0.0, 50.0, 720.0),
        ])
        .unwrap();
        let mut body = grounded_body();
        body.position.x = 3.0;
        body.velocity.x = -450.0;
        let input = InputSnapshot {
            move_left: true,
            ..Default::default()
        };

        integ.step(&mut body, &input, &field, DT);

        assert_eq!(body.position.x, 0.0);
        assert_eq!(body.velocity.x, 0.0);
    }

    #[test]
    fn head_bonk_cancels_jump_window() {
        let integ = integrator();
        let field = ObstacleField::new(vec![
            Obstacle::solid(0.0, 600.0, 1280.0, 120.0),
            Obstacle::solid(0.0, 440.0, 1280.0, 20.0),
        ])
        .unwrap();
        let mut body = grounded_body();

        let mut events = integ.step(&mut body, &pressed_jump(), &field, DT);
        let mut ticks = 1;
        while !events.bonked {
            assert!(ticks < 30, "body should hit the ceiling");
            events = integ.step(&mut body, &held_jump(), &field, DT);
            ticks += 1;
        }

        assert_eq!(body.position.y, 460.0);
        assert_eq!(body.velocity.y, 0.0);
        assert_eq!(body.var_jump_timer, 0.0);

        // With the window closed the hold no longer pins the ascent.
        integ.step(&mut body, &held_jump(), &field, DT);
        assert!(body.velocity.y > 0.0);
    }

    #[test]
    fn overlapping_two_obstacles_resolves_in_field_order() {
        let integ = Integrator::new(
            MovementConfig {
                gravity: 0.0,
                ..Default::default()
            },
            WorldBounds::default(),
        )
        .unwrap();
        // Two floor slabs at different heights under the body; the later one wins.
        let field = ObstacleField::new(vec![
            Obstacle::solid(0.0, 110.0, 100.0, 50.0),
            Obstacle::solid(0.0, 105.0, 100.0, 50.0),
        ])
        .unwrap();
        let mut body = Body::new(Vec2::new(10.0, 40.0), Vec2::new(20.0, 60.0)).unwrap();
        body.velocity.y = 1000.0;

        let events = integ.step(&mut body, &InputSnapshot::IDLE, &field, DT);

        assert_eq!(body.position.y, 45.0);
        assert!(body.grounded);
        assert!(events.landed);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn overlapping_two_walls_resolves_in_field_order() {
        let integ = Integrator::new(
            MovementConfig {
                gravity: 0.0,
                air_friction: 0.0,
                ..Default::default()
            },
            WorldBounds::default(),
        )
        .unwrap();
        // Body ends up at x 26..46, inside both walls; the later one wins.
        let field = ObstacleField::new(vec![
            Obstacle::solid(40.0, 0.0, 50.0, 200.0),
            Obstacle::solid(35.0, 0.0, 50.0, 200.0),
        ])
        .unwrap();
        let mut body = Body::new(Vec2::new(10.0, 40.0), Vec2::new(20.0, 60.0)).unwrap();
        body.velocity.x = 1000.0;

        integ.step(&mut body, &InputSnapshot::IDLE, &field, DT);

        assert_eq!(body.position.x, 15.0);
        assert_eq!(body.velocity.x, 0.0);
        assert_eq!(body.position.y, 40.0);
    }

    #[test]
    fn landing_event_fires_once() {
        let integ = integrator();
        let field = floor();
        let mut body = Body::new(Vec2::new(100.0, 500.0), Vec2::new(32.0, 64.0)).unwrap();

        let mut landings = 0;
        for _ in 0..60 {
            if integ.step(&mut body, &InputSnapshot::IDLE, &field, DT).landed {
                landings += 1;
            }
        }
        assert_eq!(landings, 1);
    }

    #[test]
    fn buffered_press_jumps_on_landing() {
        let config = MovementConfig {
            jump_buffer_time: 0.1,
            ..Default::default()
        };
        let integ = Integrator::new(config, WorldBounds::default()).unwrap();
        let field = floor();
        let mut body = grounded_body();
        body.grounded = false;
        body.position.y = 530.0;
        body.velocity.y = 400.0;

        // Pressed just before touching down: lands this tick, jumps on the next.
        let events = integ.step(&mut body, &pressed_jump(), &field, DT);
        assert!(events.landed);
        assert!(!events.jumped);
        assert!(body.jump_buffer_timer > 0.0);

        let events = integ.step(&mut body, &held_jump(), &field, DT);
        assert!(events.jumped);
        assert!(body.velocity.y < 0.0);
        assert_eq!(body.jump_buffer_timer, 0.0);
    }

    #[test]
    fn buffered_press_expires() {
        let config = MovementConfig {
            jump_buffer_time: 0.03,
            ..Default::default()
        };
        let integ = Integrator::new(config, WorldBounds::default()).unwrap();
        let field = ObstacleField::empty();
        let mut body = grounded_body();
        body.grounded = false;
        body.position.y = 0.0;

        integ.step(&mut body, &pressed_jump(), &field, DT);
        integ.step(&mut body, &held_jump(), &field, DT);
        assert_eq!(body.jump_buffer_timer, 0.0);
    }

    #[test]
    fn falling_out_of_world_respawns() {
        let integ = integrator();
        let mut body = Body::new(Vec2::new(100.0, 500.0), Vec2::new(32.0, 64.0)).unwrap();
        body.position.y = 821.0;
        body.velocity = Vec2::new(120.0, 400.0);

        let events = integ.step(&mut body, &InputSnapshot::IDLE, &ObstacleField::empty(), DT);

        assert!(events.respawned);
        assert_eq!(body.position, Vec2::new(100.0, 500.0));
        assert_eq!(body.velocity, Vec2::ZERO);
        assert_eq!(body.var_jump_timer, 0.0);
    }

    #[test]
    fn non_finite_result_is_rolled_back() {
        let integ = integrator();
        let mut body = grounded_body();
        body.grounded = false;
        // Far above the kill plane so the respawn path cannot mask the overflow.
        body.position = Vec2::new(f64::MAX, -100_000.0);
        body.velocity = Vec2::new(f64::MAX, 0.0);
        let before = body;

        let events = integ.step(&mut body, &InputSnapshot::IDLE, &ObstacleField::empty(), 1.0);

        assert_eq!(body, before);
        assert!(events.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "dt must be >= 0")]
    fn negative_dt_asserts_in_debug() {
        let mut body = grounded_body();
        integrator().step(&mut body, &InputSnapshot::IDLE, &floor(), -0.016);
    }

    #[test]
    fn step_events_merge() {
        let mut a = StepEvents {
            jumped: true,
            ..Default::default()
        };
        a.merge(StepEvents {
            respawned: true,
            ..Default::default()
        });
        assert!(a.jumped && a.respawned);
        assert!(!a.landed && !a.bonked);
    }
}
