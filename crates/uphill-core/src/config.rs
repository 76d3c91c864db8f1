//! Movement tuning and world bounds.
//!
//! Both structs are plain data with public fields and serde support so a
//! host can load them alongside level data. [`Integrator::new`] validates
//! them once; the integrator never re-checks them per tick.
//!
//! [`Integrator::new`]: crate::integrator::Integrator::new

use serde::{Deserialize, Serialize};

use crate::CoreError;

// ---------------------------------------------------------------------------
// JumpCut
// ---------------------------------------------------------------------------

/// What happens when jump is released while the variable-jump window is
/// still open.
///
/// In both cases the window closes immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpCut {
    /// Halve the upward velocity once.
    #[default]
    Halve,
    /// Stop holding the ascent at jump speed and let gravity take over.
    StopExtending,
}

// ---------------------------------------------------------------------------
// MovementConfig
// ---------------------------------------------------------------------------

/// Tuning constants for the integrator. Units are world units and seconds;
/// y grows downward so `jump_speed` is negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Top horizontal speed reached by holding a direction.
    pub max_run: f64,
    /// Horizontal acceleration toward `max_run`.
    pub run_accel: f64,
    /// Ground deceleration with no horizontal input, also used to bleed off
    /// speed above `max_run`.
    pub run_reduce: f64,
    /// Airborne deceleration with no horizontal input.
    pub air_friction: f64,
    /// Multiplier on `run_accel` (and over-speed reduction) while airborne.
    pub air_mult: f64,
    /// Downward acceleration.
    pub gravity: f64,
    /// Terminal downward speed.
    pub max_fall: f64,
    /// Vertical velocity set by a jump. Negative.
    pub jump_speed: f64,
    /// Length of the window during which a held jump keeps rising at
    /// `jump_speed`.
    pub var_jump_time: f64,
    /// Rule applied when jump is released inside that window.
    pub jump_cut: JumpCut,
    /// Below this `|vy|`, with jump not held, gravity is scaled by
    /// `apex_gravity_mult`.
    pub apex_threshold: f64,
    /// Gravity scale near the apex. `1.0` turns the rule off.
    pub apex_gravity_mult: f64,
    /// How long an airborne jump press stays buffered. `0.0` disables
    /// buffering.
    pub jump_buffer_time: f64,
}

impl Default for MovementConfig {
    /// The prototype's tuning: 450 u/s run, 2200 u/s² gravity, halving jump
    /// cut, no apex float, no buffering.
    fn default() -> Self {
        Self {
            max_run: 450.0,
            run_accel: 3000.0,
            run_reduce: 2500.0,
            air_friction: 500.0,
            air_mult: 0.65,
            gravity: 2200.0,
            max_fall: 1000.0,
            jump_speed: -950.0,
            var_jump_time: 0.2,
            jump_cut: JumpCut::Halve,
            apex_threshold: 0.0,
            apex_gravity_mult: 1.0,
            jump_buffer_time: 0.0,
        }
    }
}

impl MovementConfig {
    /// Celeste's player constants scaled four times up to a 1280x720 world,
    /// with its release rule, half gravity at the apex and a short jump
    /// buffer.
    pub fn celeste() -> Self {
        Self {
            max_run: 360.0,
            run_accel: 4000.0,
            run_reduce: 1600.0,
            air_friction: 2600.0,
            air_mult: 0.65,
            gravity: 3600.0,
            max_fall: 640.0,
            jump_speed: -420.0,
            var_jump_time: 0.2,
            jump_cut: JumpCut::StopExtending,
            apex_threshold: 160.0,
            apex_gravity_mult: 0.5,
            jump_buffer_time: 0.08,
        }
    }

    /// Check every parameter against its legal range.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParameter`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), CoreError> {
        positive("max_run", self.max_run)?;
        positive("run_accel", self.run_accel)?;
        non_negative("run_reduce", self.run_reduce)?;
        non_negative("air_friction", self.air_friction)?;
        positive("air_mult", self.air_mult)?;
        non_negative("gravity", self.gravity)?;
        positive("max_fall", self.max_fall)?;
        if !(self.jump_speed < 0.0 && self.jump_speed.is_finite()) {
            return Err(CoreError::InvalidParameter {
                name: "jump_speed",
                value: self.jump_speed,
                expected: "negative (upward) and finite",
            });
        }
        non_negative("var_jump_time", self.var_jump_time)?;
        non_negative("apex_threshold", self.apex_threshold)?;
        non_negative("apex_gravity_mult", self.apex_gravity_mult)?;
        non_negative("jump_buffer_time", self.jump_buffer_time)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WorldBounds
// ---------------------------------------------------------------------------

/// Vertical extent of the playable area, used for the fall-out safety net.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBounds {
    /// Height of the playable area.
    pub height: f64,
    /// How far below `height` the body may fall before it respawns.
    pub fall_margin: f64,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            height: 720.0,
            fall_margin: 100.0,
        }
    }
}

impl WorldBounds {
    /// The y coordinate past which the body respawns.
    pub fn kill_plane(&self) -> f64 {
        self.height + self.fall_margin
    }

    /// Check that both fields are usable.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.height.is_finite() {
            return Err(CoreError::InvalidParameter {
                name: "height",
                value: self.height,
                expected: "finite",
            });
        }
        non_negative("fall_margin", self.fall_margin)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn positive(name: &'static str, value: f64) -> Result<(), CoreError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(CoreError::InvalidParameter {
            name,
            value,
            expected: "strictly positive and finite",
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), CoreError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(CoreError::InvalidParameter {
            name,
            value,
            expected: "non-negative and finite",
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        MovementConfig::default().validate().unwrap();
        MovementConfig::celeste().validate().unwrap();
        WorldBounds::default().validate().unwrap();
    }

    #[test]
    fn default_matches_prototype_tuning() {
        let c = MovementConfig::default();
        assert_eq!(c.max_run, 450.0);
        assert_eq!(c.run_accel, 3000.0);
        assert_eq!(c.gravity, 2200.0);
        assert_eq!(c.max_fall, 1000.0);
        assert_eq!(c.jump_speed, -950.0);
        assert_eq!(c.jump_cut, JumpCut::Halve);
    }

    #[test]
    fn rejects_upward_fall_speed() {
        let c = MovementConfig {
            max_fall: 0.0,
            ..Default::default()
        };
        match c.validate() {
            Err(CoreError::InvalidParameter { name, .. }) => assert_eq!(name, "max_fall"),
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn rejects_downward_jump() {
        let c = MovementConfig {
            jump_speed: 300.0,
            ..Default::default()
        };
        assert!(matches!(
            c.validate(),
            Err(CoreError::InvalidParameter { name: "jump_speed", .. })
        ));
    }

    #[test]
    fn rejects_nan_gravity() {
        let c = MovementConfig {
            gravity: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            c.validate(),
            Err(CoreError::InvalidParameter { name: "gravity", .. })
        ));
    }

    #[test]
    fn zero_gravity_and_friction_are_allowed() {
        let c = MovementConfig {
            gravity: 0.0,
            run_reduce: 0.0,
            air_friction: 0.0,
            ..Default::default()
        };
        c.validate().unwrap();
    }

    #[test]
    fn kill_plane_is_height_plus_margin() {
        assert_eq!(WorldBounds::default().kill_plane(), 820.0);
        let bad = WorldBounds {
            height: 720.0,
            fall_margin: -1.0,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let c: MovementConfig =
            serde_json::from_str(r#"{"max_run": 300.0, "jump_cut": "StopExtending"}"#).unwrap();
        assert_eq!(c.max_run, 300.0);
        assert_eq!(c.jump_cut, JumpCut::StopExtending);
        assert_eq!(c.gravity, 2200.0);
    }
}
