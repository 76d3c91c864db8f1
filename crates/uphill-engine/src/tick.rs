//! Fixed-timestep accounting.
//!
//! Hosts hand the engine whatever wall time elapsed since the previous frame.
//! [`FixedTimestep`] banks that time in an accumulator and pays it out in
//! whole ticks of `fixed_dt`, so the simulation always steps by the same
//! amount regardless of frame rate:
//!
//! 1. The frame time is clamped to `max_frame_time` (a stalled frame cannot
//!    trigger a burst of catch-up ticks).
//! 2. The clamped time is added to the accumulator.
//! 3. While at least `fixed_dt` is banked, one tick is consumed.
//! 4. The remainder carries over; [`FixedTimestep::alpha`] exposes it as a
//!    fraction of a tick for render interpolation.
//!
//! # Example
//!
//! ```
//! use uphill_engine::tick::{FixedTimestep, TickConfig};
//!
//! let config = TickConfig { fixed_dt: 1.0 / 64.0, ..Default::default() };
//! let mut timestep = FixedTimestep::new(&config).unwrap();
//!
//! timestep.accumulate(0.05);
//! let mut ticks = 0;
//! while timestep.consume_tick() {
//!     ticks += 1;
//! }
//!
//! assert_eq!(ticks, 3);
//! assert!((timestep.alpha() - 0.2).abs() < 1e-9);
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::EngineError;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Longest frame time honoured in one call; anything longer is clamped.
    pub max_frame_time: f64,
}

impl Default for TickConfig {
    /// 0.016 s ticks (62.5 Hz), frames clamped to 0.25 s.
    fn default() -> Self {
        Self {
            fixed_dt: 0.016,
            max_frame_time: 0.25,
        }
    }
}

impl TickConfig {
    /// Check that both durations are usable.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTickConfig`] if `fixed_dt` is not
    /// positive and finite, or if `max_frame_time` is smaller than
    /// `fixed_dt` (no frame could ever produce a tick).
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(EngineError::InvalidTickConfig(format!(
                "fixed_dt must be positive and finite, got {}",
                self.fixed_dt
            )));
        }
        if !(self.max_frame_time >= self.fixed_dt && self.max_frame_time.is_finite()) {
            return Err(EngineError::InvalidTickConfig(format!(
                "max_frame_time must be finite and at least fixed_dt ({}), got {}",
                self.fixed_dt, self.max_frame_time
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last frame.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Fixed ticks run during the frame.
    pub steps: u32,
    /// Frame time actually accumulated, after clamping.
    pub frame_time: f64,
    /// Wall-clock time spent running the ticks.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// FixedTimestep
// ---------------------------------------------------------------------------

/// Accumulator that converts variable frame times into whole fixed ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTimestep {
    fixed_dt: f64,
    max_frame_time: f64,
    accumulator: f64,
}

impl FixedTimestep {
    /// Create an empty accumulator.
    pub fn new(config: &TickConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            fixed_dt: config.fixed_dt,
            max_frame_time: config.max_frame_time,
            accumulator: 0.0,
        })
    }

    /// Bank `frame_time` seconds and return the amount actually banked.
    ///
    /// Negative or non-finite frame times bank nothing. Frame times above
    /// `max_frame_time` are clamped.
    pub fn accumulate(&mut self, frame_time: f64) -> f64 {
        if !(frame_time >= 0.0 && frame_time.is_finite()) {
            tracing::warn!(frame_time, "ignoring invalid frame time");
            return 0.0;
        }
        let clamped = if frame_time > self.max_frame_time {
            tracing::debug!(
                frame_time,
                max_frame_time = self.max_frame_time,
                "clamping long frame"
            );
            self.max_frame_time
        } else {
            frame_time
        };
        self.accumulator += clamped;
        clamped
    }

    /// Consume one tick's worth of banked time if available.
    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            true
        } else {
            false
        }
    }

    /// Banked time as a fraction of one tick, in `[0, 1)`.
    pub fn alpha(&self) -> f64 {
        self.accumulator / self.fixed_dt
    }

    /// Banked time in seconds.
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Fixed time step in seconds per tick.
    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    /// Longest frame time honoured in one call.
    pub fn max_frame_time(&self) -> f64 {
        self.max_frame_time
    }

    /// Drop any banked time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Switch to a new tick length. Banked time is dropped.
    pub(crate) fn set_fixed_dt(&mut self, fixed_dt: f64) {
        self.fixed_dt = fixed_dt;
        self.max_frame_time = self.max_frame_time.max(fixed_dt);
        self.accumulator = 0.0;
    }
}

// ---------------------------------------------------------------------------
// FrameClock
// ---------------------------------------------------------------------------

/// Measures real elapsed time between frames for hosts without their own
/// timer.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
}

impl FrameClock {
    /// Start the clock now.
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Seconds since the previous call (or since construction).
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed.as_secs_f64()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
