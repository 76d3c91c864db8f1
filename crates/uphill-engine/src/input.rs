//! Folding host input events into per-frame [`InputSnapshot`]s.
//!
//! The collector is host-neutral: a windowing layer translates its native
//! events into [`InputEvent`]s and calls [`InputCollector::collect`] once per
//! frame. Keyboard and touch are merged, so a player can run with a key and
//! jump with a finger.
//!
//! Touch positions arrive normalized to `0..1` and are scaled to the
//! 1280x720 logical screen before hit testing against the [`TouchLayout`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use uphill_core::input::InputSnapshot;
use uphill_core::math::{Rect, Vec2};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Keys the collector cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Run left.
    Left,
    /// Run right.
    Right,
    /// Jump; presses on key down, holds until key up.
    Jump,
    /// Request exit.
    Escape,
}

/// A host input event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// The window or app was asked to close.
    Quit,
    /// A key went down. `repeat` marks OS auto-repeat.
    KeyDown { key: Key, repeat: bool },
    /// A key went up.
    KeyUp { key: Key },
    /// A finger touched the screen at normalized coordinates.
    FingerDown { finger: u64, x: f64, y: f64 },
    /// A finger moved to normalized coordinates.
    FingerMotion { finger: u64, x: f64, y: f64 },
    /// A finger left the screen.
    FingerUp { finger: u64 },
}

// ---------------------------------------------------------------------------
// TouchLayout
// ---------------------------------------------------------------------------

/// On-screen button placement in logical screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchLayout {
    /// Logical screen width that normalized x is scaled by.
    pub screen_width: f64,
    /// Logical screen height that normalized y is scaled by.
    pub screen_height: f64,
    /// Run-left button.
    pub left: Rect,
    /// Run-right button.
    pub right: Rect,
    /// Jump button.
    pub jump: Rect,
}

impl Default for TouchLayout {
    /// Run buttons bottom-left, jump bottom-right, on a 1280x720 screen.
    fn default() -> Self {
        Self {
            screen_width: 1280.0,
            screen_height: 720.0,
            left: Rect::new(50.0, 550.0, 150.0, 150.0),
            right: Rect::new(250.0, 550.0, 150.0, 150.0),
            jump: Rect::new(1030.0, 550.0, 200.0, 150.0),
        }
    }
}

impl TouchLayout {
    /// Scale normalized touch coordinates to the logical screen.
    pub fn to_screen(&self, x: f64, y: f64) -> Vec2 {
        Vec2::new(x * self.screen_width, y * self.screen_height)
    }
}

/// Which on-screen buttons currently have a finger on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonStates {
    /// A finger is on the run-left button.
    pub left: bool,
    /// A finger is on the run-right button.
    pub right: bool,
    /// A finger is on the jump button.
    pub jump: bool,
}

// ---------------------------------------------------------------------------
// InputCollector
// ---------------------------------------------------------------------------

/// Tracks held keys and active fingers across frames.
#[derive(Debug, Clone, Default)]
pub struct InputCollector {
    layout: TouchLayout,
    left_key: bool,
    right_key: bool,
    jump_key: bool,
    /// Ordered by finger id so hit testing is deterministic.
    fingers: BTreeMap<u64, Vec2>,
    buttons: ButtonStates,
    quit_requested: bool,
}

impl InputCollector {
    /// Create a collector with the default touch layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collector with a custom touch layout.
    pub fn with_layout(layout: TouchLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Apply this frame's events and produce the frame's input.
    ///
    /// `jump_pressed` is set only by a non-repeat jump key press or by a
    /// finger landing on the jump button during this frame. Everything else
    /// reflects what is held once all events are applied.
    pub fn collect<I>(&mut self, events: I) -> InputSnapshot
    where
        I: IntoIterator<Item = InputEvent>,
    {
        let mut jump_pressed = false;

        for event in events {
            match event {
                InputEvent::Quit => self.quit_requested = true,
                InputEvent::KeyDown { key, repeat } => match key {
                    Key::Escape => self.quit_requested = true,
                    Key::Left => self.left_key = true,
                    Key::Right => self.right_key = true,
                    Key::Jump => {
                        if !repeat {
                            jump_pressed = true;
                        }
                        self.jump_key = true;
                    }
                },
                InputEvent::KeyUp { key } => match key {
                    Key::Left => self.left_key = false,
                    Key::Right => self.right_key = false,
                    Key::Jump => self.jump_key = false,
                    Key::Escape => {}
                },
                InputEvent::FingerDown { finger, x, y } => {
                    let point = self.layout.to_screen(x, y);
                    self.fingers.insert(finger, point);
                    if self.layout.jump.contains_point(point) {
                        jump_pressed = true;
                    }
                }
                InputEvent::FingerMotion { finger, x, y } => {
                    let point = self.layout.to_screen(x, y);
                    self.fingers.insert(finger, point);
                }
                InputEvent::FingerUp { finger } => {
                    self.fingers.remove(&finger);
                }
            }
        }

        self.buttons = ButtonStates::default();
        for point in self.fingers.values() {
            self.buttons.left |= self.layout.left.contains_point(*point);
            self.buttons.right |= self.layout.right.contains_point(*point);
            self.buttons.jump |= self.layout.jump.contains_point(*point);
        }

        InputSnapshot {
            move_left: self.left_key || self.buttons.left,
            move_right: self.right_key || self.buttons.right,
            jump_pressed,
            jump_held: self.jump_key || self.buttons.jump,
        }
    }

    /// Button feedback from the last [`collect`](Self::collect).
    pub fn buttons(&self) -> ButtonStates {
        self.buttons
    }

    /// Whether Quit or Escape has been seen.
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Number of fingers currently on the screen.
    pub fn active_fingers(&self) -> usize {
        self.fingers.len()
    }

    /// The layout used for hit testing.
    pub fn layout(&self) -> &TouchLayout {
        &self.layout
    }

    /// Forget all held keys and fingers, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        let layout = std::mem::take(&mut self.layout);
        *self = Self::with_layout(layout);
    }
}
