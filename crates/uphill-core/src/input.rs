//! Per-tick input consumed by the integrator.

use serde::{Deserialize, Serialize};

/// Normalized input for one simulation tick.
///
/// `jump_pressed` is edge-triggered: it is true only on the tick where the
/// jump input became active. `jump_held` is level-triggered and stays true
/// for as long as the input is held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Move-left is held.
    pub move_left: bool,
    /// Move-right is held.
    pub move_right: bool,
    /// Jump transitioned to pressed this tick.
    pub jump_pressed: bool,
    /// Jump is currently held.
    pub jump_held: bool,
}

impl InputSnapshot {
    /// No input at all.
    pub const IDLE: InputSnapshot = InputSnapshot {
        move_left: false,
        move_right: false,
        jump_pressed: false,
        jump_held: false,
    };

    /// Horizontal intent as `-1.0`, `0.0` or `1.0`.
    ///
    /// When both directions are held, right wins.
    pub fn move_direction(&self) -> f64 {
        if self.move_right {
            1.0
        } else if self.move_left {
            -1.0
        } else {
            0.0
        }
    }

    /// Whether nothing is pressed or held.
    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }

    /// The same snapshot with the jump edge consumed.
    pub fn without_press(self) -> Self {
        Self {
            jump_pressed: false,
            ..self
        }
    }
}
