//! The fixed-timestep simulation driver.
//!
//! A [`Simulation`] owns the body, the obstacle field, the integrator and a
//! [`FixedTimestep`] accumulator. Each frame the host calls
//! [`Simulation::advance`] with the elapsed wall time and the frame's input;
//! the simulation runs as many whole ticks as the banked time allows.
//!
//! # Input across ticks
//!
//! The frame's input snapshot is reused for every tick of the frame, except
//! for `jump_pressed`, which is an edge and must reach the integrator exactly
//! once. It goes to the first tick of the frame; if the frame is too short to
//! run any tick, the press is held until the next tick that does run.
//!
//! # Determinism
//!
//! Given the same initial state and the same per-tick inputs, a simulation
//! produces bit-identical bodies on every run. Simulation time is computed
//! as `tick_count * fixed_dt`, never accumulated.

use std::time::Instant;

use uphill_core::body::Body;
use uphill_core::config::MovementConfig;
use uphill_core::field::ObstacleField;
use uphill_core::input::InputSnapshot;
use uphill_core::integrator::{Integrator, StepEvents};

use crate::level::LevelData;
use crate::replay::{ReplayLog, ReplayRecorder};
use crate::tick::{FixedTimestep, TickConfig, TickDiagnostics};
use crate::EngineError;

// ---------------------------------------------------------------------------
// FrameReport
// ---------------------------------------------------------------------------

/// What one call to [`Simulation::advance`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// Fixed ticks run this frame.
    pub steps: u32,
    /// Events of all ticks this frame, merged.
    pub events: StepEvents,
    /// Leftover banked time as a fraction of a tick, for interpolation.
    pub alpha: f64,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// A single body moving through a static level at a fixed tick rate.
#[derive(Debug)]
pub struct Simulation {
    body: Body,
    field: ObstacleField,
    integrator: Integrator,
    timestep: FixedTimestep,
    tick_counter: u64,
    /// A jump press that arrived in a frame that ran no tick.
    pending_press: bool,
    last_input: InputSnapshot,
    last_diagnostics: TickDiagnostics,
    recorder: Option<ReplayRecorder>,
}

impl Simulation {
    /// Create a simulation from already validated parts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTickConfig`] if `tick` is unusable.
    pub fn new(
        body: Body,
        field: ObstacleField,
        integrator: Integrator,
        tick: TickConfig,
    ) -> Result<Self, EngineError> {
        let timestep = FixedTimestep::new(&tick)?;
        tracing::debug!(
            obstacles = field.len(),
            fixed_dt = tick.fixed_dt,
            spawn_x = body.spawn.x,
            spawn_y = body.spawn.y,
            "simulation created"
        );
        Ok(Self {
            body,
            field,
            integrator,
            timestep,
            tick_counter: 0,
            pending_press: false,
            last_input: InputSnapshot::IDLE,
            last_diagnostics: TickDiagnostics::default(),
            recorder: None,
        })
    }

    /// Build a simulation for `level` with the given tuning.
    pub fn from_level(
        level: &LevelData,
        config: MovementConfig,
        tick: TickConfig,
    ) -> Result<Self, EngineError> {
        let field = level.build_field()?;
        let body = level.spawn_body()?;
        let integrator = Integrator::new(config, level.bounds)?;
        Self::new(body, field, integrator, tick)
    }

    // -- driving ------------------------------------------------------------

    /// Bank `frame_time` seconds and run every whole tick now available.
    pub fn advance(&mut self, frame_time: f64, input: InputSnapshot) -> FrameReport {
        let start = Instant::now();
        let banked = self.timestep.accumulate(frame_time);
        self.pending_press |= input.jump_pressed;

        let held = input.without_press();
        let mut events = StepEvents::default();
        let mut steps = 0u32;
        while self.timestep.consume_tick() {
            events.merge(self.run_tick(held));
            steps += 1;
        }

        self.last_diagnostics = TickDiagnostics {
            steps,
            frame_time: banked,
            total_time: start.elapsed(),
        };

        FrameReport {
            steps,
            events,
            alpha: self.timestep.alpha(),
        }
    }

    /// Run exactly one tick with `input`, bypassing the accumulator.
    ///
    /// A press held over from an earlier [`advance`](Self::advance) is
    /// delivered with this tick.
    pub fn step(&mut self, input: InputSnapshot) -> StepEvents {
        self.pending_press |= input.jump_pressed;
        self.run_tick(input.without_press())
    }

    /// Run `count` ticks holding `input`. A jump press in `input` applies to
    /// the first tick only.
    pub fn run_ticks(&mut self, count: u64, input: InputSnapshot) -> StepEvents {
        let mut events = StepEvents::default();
        if count == 0 {
            return events;
        }
        events.merge(self.step(input));
        let held = input.without_press();
        for _ in 1..count {
            events.merge(self.run_tick(held));
        }
        events
    }

    fn run_tick(&mut self, held: InputSnapshot) -> StepEvents {
        let input = InputSnapshot {
            jump_pressed: std::mem::take(&mut self.pending_press),
            ..held
        };

        let checkpoint = match &self.recorder {
            Some(recorder) if recorder.wants_checkpoint(self.tick_counter) => {
                Some(self.state_hash())
            }
            _ => None,
        };
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record_tick(self.tick_counter, &input, checkpoint);
        }

        let events =
            self.integrator
                .step(&mut self.body, &input, &self.field, self.timestep.fixed_dt());
        self.tick_counter += 1;
        self.last_input = input;
        events
    }

    // -- recording ----------------------------------------------------------

    /// Start recording every tick from now on into a [`ReplayLog`].
    ///
    /// A state-hash checkpoint is stored every `checkpoint_interval` ticks
    /// (every tick if zero). Replaces any recording in progress. Restoring a
    /// snapshot restarts the recording from the restored state.
    pub fn attach_recorder(&mut self, checkpoint_interval: u64) {
        let snapshot = self.capture_snapshot();
        self.recorder = Some(ReplayRecorder::new(snapshot, checkpoint_interval));
    }

    /// Stop recording and return the log, if a recorder was attached.
    pub fn take_recording(&mut self) -> Option<ReplayLog> {
        self.recorder.take().map(ReplayRecorder::finish)
    }

    /// Whether a recorder is attached.
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub(crate) fn detach_recorder(&mut self) -> Option<ReplayRecorder> {
        self.recorder.take()
    }

    /// Put a detached recorder back, restarted from the current state.
    pub(crate) fn resume_recorder(&mut self, recorder: Option<ReplayRecorder>) {
        self.recorder = recorder;
        self.restart_recorder();
    }

    /// Restart an attached recorder from the current state, keeping its
    /// checkpoint interval. Ticks it recorded so far are dropped.
    fn restart_recorder(&mut self) {
        let Some(old) = &self.recorder else {
            return;
        };
        let interval = old.checkpoint_interval();
        if old.ticks_recorded() > 0 {
            tracing::warn!(
                dropped_ticks = old.ticks_recorded(),
                tick = self.tick_counter,
                "state rewound while recording; restarting recording"
            );
        }
        self.attach_recorder(interval);
    }

    // -- accessors ----------------------------------------------------------

    /// The number of ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// The current simulation time in seconds.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.timestep.fixed_dt()
    }

    /// The fixed time step in seconds per tick.
    pub fn fixed_dt(&self) -> f64 {
        self.timestep.fixed_dt()
    }

    /// Banked time as a fraction of a tick, for render interpolation.
    pub fn alpha(&self) -> f64 {
        self.timestep.alpha()
    }

    /// The simulated body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Mutable access to the body.
    ///
    /// Intended for setup and tests; changing the body mid-run breaks any
    /// replay being recorded.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// The level geometry.
    pub fn field(&self) -> &ObstacleField {
        &self.field
    }

    /// The integrator and its tuning.
    pub fn integrator(&self) -> &Integrator {
        &self.integrator
    }

    /// The effective input of the most recent tick.
    pub fn last_input(&self) -> InputSnapshot {
        self.last_input
    }

    /// Whether a jump press is waiting for the next tick.
    pub fn has_pending_press(&self) -> bool {
        self.pending_press
    }

    /// Diagnostics from the last [`advance`](Self::advance).
    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    // -- restore helpers ----------------------------------------------------

    pub(crate) fn restore_state(&mut self, body: Body, tick_counter: u64, fixed_dt: f64) {
        self.body = body;
        self.tick_counter = tick_counter;
        if fixed_dt != self.timestep.fixed_dt() {
            self.timestep.set_fixed_dt(fixed_dt);
        }
        self.timestep.reset();
        self.pending_press = false;
        self.last_input = InputSnapshot::IDLE;
        self.restart_recorder();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
