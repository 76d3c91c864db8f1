//! Deterministic replay with input recording and checkpoint verification.
//!
//! A [`ReplayRecorder`] stores the effective per-tick [`InputSnapshot`]s of a
//! run together with periodic state-hash checkpoints, producing a
//! [`ReplayLog`]. [`replay`] restores the log's initial snapshot, feeds the
//! recorded inputs back tick by tick and compares hashes at each checkpoint.
//!
//! # Recording and replaying
//!
//! ```
//! use uphill_engine::prelude::*;
//!
//! let mut sim = Simulation::from_level(
//!     &LevelData::uphill_proto(),
//!     MovementConfig::default(),
//!     TickConfig::default(),
//! )
//! .unwrap();
//!
//! sim.attach_recorder(10); // checkpoint every 10 ticks
//! let right = InputSnapshot { move_right: true, ..Default::default() };
//! for _ in 0..60 {
//!     sim.advance(1.0 / 60.0, right);
//! }
//! let log = sim.take_recording().unwrap();
//!
//! let result = replay(&mut sim, &log).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! ```

use std::collections::BTreeMap;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use uphill_core::input::InputSnapshot;

use crate::simulation::Simulation;
use crate::snapshot::SimulationSnapshot;

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// A complete replay log: initial snapshot plus the ordered inputs and
/// checkpoints recorded after it.
///
/// Fully serializable to JSON, e.g. as a regression test fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Replay begins by restoring this snapshot.
    pub initial_snapshot: SimulationSnapshot,
    /// Number of ticks recorded. Replay runs exactly this many ticks.
    pub total_ticks: u64,
    /// Inputs and checkpoints in recording order.
    pub entries: Vec<ReplayEntry>,
}

// ---------------------------------------------------------------------------
// ReplayEntry
// ---------------------------------------------------------------------------

/// A single entry in a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// The non-idle input applied at `tick`.
    Input { tick: u64, input: InputSnapshot },
    /// The state hash before `tick` was executed.
    Checkpoint { tick: u64, state_hash: String },
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// The outcome of replaying a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Whether every recorded tick was replayed.
    pub completed: bool,
    /// Ticks replayed before finishing or diverging.
    pub ticks_replayed: u64,
    /// The first checkpoint whose hash did not match, if any.
    pub first_divergence: Option<ReplayDivergence>,
}

/// Details about a determinism failure detected during replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    /// The tick at which the divergence was detected.
    pub tick: u64,
    /// The hash recorded in the log.
    pub expected_hash: String,
    /// The hash computed during replay.
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Records a run into a [`ReplayLog`].
///
/// Usually attached to a [`Simulation`] with
/// [`Simulation::attach_recorder`], which calls
/// [`record_tick`](Self::record_tick) before every tick it runs. Ticks must
/// be recorded in strictly increasing order.
#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    log: ReplayLog,
    /// Checkpoint every this many ticks; 0 means every tick.
    checkpoint_interval: u64,
    ticks_recorded: u64,
    last_tick: Option<u64>,
}

impl ReplayRecorder {
    /// Create a recorder starting from `snapshot`.
    pub fn new(snapshot: SimulationSnapshot, checkpoint_interval: u64) -> Self {
        Self {
            log: ReplayLog {
                initial_snapshot: snapshot,
                total_ticks: 0,
                entries: Vec::new(),
            },
            checkpoint_interval,
            ticks_recorded: 0,
            last_tick: None,
        }
    }

    /// Whether a checkpoint is due at `tick`.
    pub fn wants_checkpoint(&self, tick: u64) -> bool {
        self.checkpoint_interval == 0 || tick % self.checkpoint_interval == 0
    }

    /// Record a tick before it executes.
    ///
    /// Idle inputs are not stored. `state_hash` is stored as a checkpoint
    /// when it is `Some` and a checkpoint is due at `tick`.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is not strictly greater than the previously recorded
    /// tick.
    pub fn record_tick(&mut self, tick: u64, input: &InputSnapshot, state_hash: Option<String>) {
        if let Some(prev) = self.last_tick {
            assert!(
                tick > prev,
                "ReplayRecorder::record_tick: tick {tick} is not strictly greater than previous tick {prev}"
            );
        }
        self.last_tick = Some(tick);
        self.ticks_recorded += 1;

        if !input.is_idle() {
            self.log.entries.push(ReplayEntry::Input {
                tick,
                input: *input,
            });
        }

        if let Some(hash) = state_hash {
            if self.wants_checkpoint(tick) {
                self.log.entries.push(ReplayEntry::Checkpoint {
                    tick,
                    state_hash: hash,
                });
            }
        }
    }

    /// Ticks recorded so far.
    pub fn ticks_recorded(&self) -> u64 {
        self.ticks_recorded
    }

    pub fn checkpoint_interval(&self) -> u64 {
        self.checkpoint_interval
    }

    /// Finish recording and return the log.
    pub fn finish(mut self) -> ReplayLog {
        self.log.total_ticks = self.ticks_recorded;
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay `log` on `simulation`, verifying determinism at each checkpoint.
///
/// The log is validated (no duplicate entries, no tick overflow) before the
/// simulation is touched. The initial snapshot is then restored and every
/// recorded tick is re-run with its recorded input, or idle input where none
/// was stored. Replay stops at the first checkpoint mismatch.
///
/// The simulation must have been built from the same level and tuning as
/// the recording. A recorder attached to it is suspended for the duration.
///
/// # Errors
///
/// Returns an error if the log is malformed or the initial snapshot cannot
/// be restored. In both cases the simulation is unmodified.
pub fn replay(simulation: &mut Simulation, log: &ReplayLog) -> anyhow::Result<ReplayResult> {
    let mut inputs: BTreeMap<u64, InputSnapshot> = BTreeMap::new();
    let mut checkpoints: BTreeMap<u64, &str> = BTreeMap::new();

    for entry in &log.entries {
        match entry {
            ReplayEntry::Input { tick, input } => {
                if inputs.insert(*tick, *input).is_some() {
                    return Err(anyhow!(
                        "replay log contains duplicate Input entry at tick {tick}"
                    ));
                }
            }
            ReplayEntry::Checkpoint { tick, state_hash } => {
                if checkpoints.insert(*tick, state_hash.as_str()).is_some() {
                    return Err(anyhow!(
                        "replay log contains duplicate Checkpoint entry at tick {tick}"
                    ));
                }
            }
        }
    }

    let start_tick = log.initial_snapshot.tick_counter;
    let total_ticks = log.total_ticks;

    // Replayed ticks are [start_tick, end_tick).
    let end_tick = start_tick.checked_add(total_ticks).ok_or_else(|| {
        anyhow!(
            "tick range overflow: start_tick ({start_tick}) + total_ticks ({total_ticks}) exceeds u64::MAX"
        )
    })?;

    simulation
        .restore_from_snapshot(&log.initial_snapshot)
        .context("failed to restore initial snapshot for replay")?;

    // The restore restarted any attached recorder; keep it out of the replayed
    // ticks and restart it again from wherever the replay stops.
    let recorder = simulation.detach_recorder();
    let result = run_ticks(simulation, start_tick..end_tick, &inputs, &checkpoints);
    simulation.resume_recorder(recorder);

    Ok(result)
}

fn run_ticks(
    simulation: &mut Simulation,
    ticks: std::ops::Range<u64>,
    inputs: &BTreeMap<u64, InputSnapshot>,
    checkpoints: &BTreeMap<u64, &str>,
) -> ReplayResult {
    let mut ticks_replayed = 0u64;

    for tick in ticks {
        if let Some(&expected_hash) = checkpoints.get(&tick) {
            let actual_hash = simulation.state_hash();
            if actual_hash != expected_hash {
                tracing::warn!(
                    tick,
                    expected = expected_hash,
                    actual = %actual_hash,
                    "replay diverged"
                );
                return ReplayResult {
                    completed: false,
                    ticks_replayed,
                    first_divergence: Some(ReplayDivergence {
                        tick,
                        expected_hash: expected_hash.to_owned(),
                        actual_hash,
                    }),
                };
            }
        }

        let input = inputs.get(&tick).copied().unwrap_or_default();
        simulation.step(input);
        ticks_replayed += 1;
    }

    ReplayResult {
        completed: true,
        ticks_replayed,
        first_divergence: None,
    }
}
