//! Headless run -- drives the prototype level with a scripted input session,
//! records it and verifies the recording replays bit for bit.
//!
//! Run with:
//!   cargo run --example headless_run -p uphill-engine
//!   cargo run --example headless_run -p uphill-engine -- --celeste path/to/level.json
//!
//! Set `RUST_LOG=debug` to see respawns and frame clamping.

use anyhow::Context;
use uphill_engine::prelude::*;

// ---------------------------------------------------------------------------
// Scripted session
// ---------------------------------------------------------------------------

/// Frames per second of the simulated display.
const FPS: f64 = 60.0;

/// Host events for frame `frame`: run right, hop onto the steps, then let go.
fn scripted_events(frame: u32) -> Vec<InputEvent> {
    let key = |key, down| {
        if down {
            InputEvent::KeyDown { key, repeat: false }
        } else {
            InputEvent::KeyUp { key }
        }
    };
    match frame {
        10 => vec![key(Key::Right, true)],
        40 | 95 | 150 => vec![key(Key::Jump, true)],
        60 | 115 | 170 => vec![key(Key::Jump, false)],
        // Touch the jump button once, as a phone would.
        220 => vec![InputEvent::FingerDown {
            finger: 1,
            x: 0.86,
            y: 0.875,
        }],
        235 => vec![InputEvent::FingerUp { finger: 1 }],
        260 => vec![key(Key::Right, false)],
        299 => vec![key(Key::Escape, true)],
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut config = MovementConfig::default();
    let mut level = LevelData::uphill_proto();
    for arg in std::env::args().skip(1) {
        if arg == "--celeste" {
            config = MovementConfig::celeste();
        } else {
            let json = std::fs::read_to_string(&arg)
                .with_context(|| format!("failed to read level file {arg}"))?;
            level = LevelData::from_json(&json)
                .with_context(|| format!("failed to parse level file {arg}"))?;
        }
    }

    let mut sim = Simulation::from_level(&level, config, TickConfig::default())
        .context("failed to build simulation")?;
    let mut collector = InputCollector::new();
    let mut clock = FrameClock::new();
    sim.attach_recorder(30);

    let mut frame = 0u32;
    let mut events = StepEvents::default();
    let mut wall_time = 0.0;
    while !collector.quit_requested() {
        let input = collector.collect(scripted_events(frame));
        let report = sim.advance(1.0 / FPS, input);
        events.merge(report.events);
        wall_time += clock.tick();

        if report.events.jumped || report.events.landed {
            let body = sim.body();
            println!(
                "tick {:4}  x {:7.2}  y {:7.2}  {}",
                sim.tick_count(),
                body.position.x,
                body.position.y,
                if report.events.jumped { "jump" } else { "land" },
            );
        }
        frame += 1;
    }

    let log = sim
        .take_recording()
        .context("recorder was detached during the run")?;
    let final_hash = sim.state_hash();
    println!(
        "level '{}': {} frames, {} ticks, {:.3} s simulated in {:.3} ms",
        level.name,
        frame,
        sim.tick_count(),
        sim.sim_time(),
        wall_time * 1000.0,
    );
    println!("final state {final_hash}");

    let result = replay(&mut sim, &log)?;
    match result.first_divergence {
        None => println!("replay of {} ticks matches", result.ticks_replayed),
        Some(divergence) => anyhow::bail!(
            "replay diverged at tick {}: expected {}, got {}",
            divergence.tick,
            divergence.expected_hash,
            divergence.actual_hash
        ),
    }
    anyhow::ensure!(sim.state_hash() == final_hash, "replayed end state differs");
    if events.respawned {
        println!("body fell out of the world at least once");
    }

    Ok(())
}
