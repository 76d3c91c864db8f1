//! Simulation snapshot and restore with BLAKE3 hashing.
//!
//! Provides [`SimulationSnapshot`] -- the deterministic state of a
//! [`Simulation`] (body, tick counter, fixed dt) with a BLAKE3 content hash
//! for integrity checks and determinism testing.
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
//! sim.run_ticks(10, InputSnapshot::IDLE);
//!
//! let snapshot = sim.capture_snapshot();
//! assert_eq!(snapshot.tick_counter, 10);
//! assert_eq!(snapshot.hash.len(), 64); // BLAKE3 hex digest
//!
//! sim.run_ticks(10, InputSnapshot::IDLE);
//! sim.restore_from_snapshot(&snapshot).unwrap();
//! assert_eq!(sim.tick_count(), 10);
//! assert_eq!(sim.state_hash(), snapshot.hash);
//! ```
//!
//! # What Is NOT Captured
//!
//! - **Geometry and tuning** -- the field and integrator are immutable and
//!   belong to the level; restore onto a simulation built from the same one.
//! - **Accumulator and pending press** -- frame-timing state, cleared on
//!   restore.
//! - **Diagnostics and recorder** -- transient, left untouched.
//!
//! This is an in-memory determinism tool, not a save-game format.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use uphill_core::body::Body;

use crate::simulation::Simulation;

// ---------------------------------------------------------------------------
// SimulationSnapshot
// ---------------------------------------------------------------------------

/// A serializable snapshot of the deterministic simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// The body, including its timers and spawn point.
    pub body: Body,
    /// Number of ticks executed at the time of capture.
    pub tick_counter: u64,
    /// Fixed time step in seconds per tick.
    pub fixed_dt: f64,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the other fields.
    pub hash: String,
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

/// BLAKE3 hex digest of the canonical JSON encoding of the hashable state.
fn compute_hash(body: &Body, tick_counter: u64, fixed_dt: f64) -> String {
    #[derive(Serialize)]
    struct HashableState<'a> {
        body: &'a Body,
        tick_counter: u64,
        fixed_dt: f64,
    }

    let hashable = HashableState {
        body,
        tick_counter,
        fixed_dt,
    };

    let json_bytes = serde_json::to_vec(&hashable)
        .expect("simulation state should always be JSON-serializable");

    blake3::hash(&json_bytes).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// Simulation snapshot/restore methods
// ---------------------------------------------------------------------------

impl Simulation {
    /// Capture the deterministic state and its hash.
    pub fn capture_snapshot(&self) -> SimulationSnapshot {
        let body = *self.body();
        let tick_counter = self.tick_count();
        let fixed_dt = self.fixed_dt();
        let hash = compute_hash(&body, tick_counter, fixed_dt);

        SimulationSnapshot {
            body,
            tick_counter,
            fixed_dt,
            hash,
        }
    }

    /// Restore state from a snapshot.
    ///
    /// The snapshot is fully validated before anything is modified: its
    /// `fixed_dt` must be positive and finite, its body must be well formed
    /// and its hash must match its contents. On success the accumulator and
    /// any pending jump press are cleared, and an attached recorder restarts
    /// from the restored state.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first failed check; the simulation is
    /// left untouched in that case.
    pub fn restore_from_snapshot(&mut self, snapshot: &SimulationSnapshot) -> anyhow::Result<()> {
        if !(snapshot.fixed_dt > 0.0 && snapshot.fixed_dt.is_finite()) {
            bail!(
                "snapshot has invalid fixed_dt: {}. Must be positive and finite.",
                snapshot.fixed_dt
            );
        }

        let body = snapshot.body;
        Body::new(body.spawn, body.size).context("snapshot body is malformed")?;
        if !body.is_finite() {
            bail!(
                "snapshot body has non-finite state: position {:?}, velocity {:?}",
                body.position,
                body.velocity
            );
        }

        let expected_hash = compute_hash(&body, snapshot.tick_counter, snapshot.fixed_dt);
        if expected_hash != snapshot.hash {
            bail!(
                "snapshot hash mismatch: recorded {} but recomputed {}. \
                 The snapshot may be corrupted or tampered with.",
                snapshot.hash,
                expected_hash
            );
        }

        self.restore_state(body, snapshot.tick_counter, snapshot.fixed_dt);
        tracing::debug!(
            tick = snapshot.tick_counter,
            hash = %snapshot.hash,
            "restored simulation snapshot"
        );
        Ok(())
    }

    /// BLAKE3 hash of the current state, equal to
    /// `capture_snapshot().hash`.
    pub fn state_hash(&self) -> String {
        compute_hash(self.body(), self.tick_count(), self.fixed_dt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelData;
    use crate::tick::TickConfig;
    use uphill_core::config::MovementConfig;
    use uphill_core::input::InputSnapshot;

    fn sim() -> Simulation {
        Simulation::from_level(
            &LevelData::uphill_proto(),
            MovementConfig::default(),
            TickConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn hash_changes_with_state() {
        let mut sim = sim();
        let a = sim.state_hash();
        sim.step(InputSnapshot::IDLE);
        let b = sim.state_hash();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_snapshot_is_rejected_without_mutation() {
        let mut sim = sim();
        sim.run_ticks(5, InputSnapshot::IDLE);
        let mut snapshot = sim.capture_snapshot();
        snapshot.body.position.x += 1.0;

        sim.run_ticks(5, InputSnapshot::IDLE);
        let before = sim.capture_snapshot();

        let err = sim.restore_from_snapshot(&snapshot).unwrap_err();
        assert!(err.to_string().contains("hash mismatch"), "{err}");
        assert_eq!(sim.capture_snapshot(), before);
    }

    #[test]
    fn invalid_fixed_dt_is_rejected() {
        let mut sim = sim();
        let mut snapshot = sim.capture_snapshot();
        snapshot.fixed_dt = 0.0;
        let err = sim.restore_from_snapshot(&snapshot).unwrap_err();
        assert!(err.to_string().contains("fixed_dt"), "{err}");
    }

    #[test]
    fn malformed_body_is_rejected() {
        let mut sim = sim();
        let mut snapshot = sim.capture_snapshot();
        snapshot.body.size.y = -64.0;
        assert!(sim.restore_from_snapshot(&snapshot).is_err());
    }
}
