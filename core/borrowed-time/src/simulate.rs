//! Scripted dry run against a manual clock and in-memory storage.
//!
//! Nothing on disk is read or written, so this is safe to run while a real
//! session is in progress. The same seed always prints the same transcript.

use std::io::{self, Write};

use borrowed_time_core::{
    format_seconds, Experience, ExperienceConfig, ManualClock, MemoryStore, Point,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::render::Redraw;

const FRAME_MS: u64 = 16;
const SIM_EPOCH_MS: i64 = 1_700_000_000_000;

#[derive(Debug, Clone)]
pub struct Script {
    /// Total simulated time.
    pub run_ms: u64,
    /// Tap interval; 0 disables taps.
    pub tap_every_ms: u64,
    /// Request a second chance at this offset.
    pub second_chance_at_ms: Option<u64>,
    pub reduced_motion: bool,
    pub seed: u64,
}

/// Summary of a finished script, for the caller and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub frames_drawn: usize,
    pub taps_landed: usize,
    pub ended: bool,
    pub expired_committed: bool,
    pub resets: usize,
}

pub fn run(config: ExperienceConfig, script: &Script, out: &mut impl Write) -> io::Result<Transcript> {
    let clock = ManualClock::new(SIM_EPOCH_MS);
    let mut experience = Experience::new(
        config,
        Box::new(clock.clone()),
        Box::new(MemoryStore::new()),
        Box::new(StdRng::seed_from_u64(script.seed)),
    );
    experience.set_reduced_motion(script.reduced_motion);
    experience.start();

    let mut transcript = Transcript::default();
    let mut redraw = Redraw::default();
    let mut elapsed = 0;
    let mut next_tap = script.tap_every_ms;
    let mut second_chance_at = script.second_chance_at_ms;

    if redraw.draw(out, &experience.view())? {
        transcript.frames_drawn += 1;
    }

    while elapsed < script.run_ms {
        let step = FRAME_MS.min(script.run_ms - elapsed);
        clock.advance(step);
        elapsed += step;

        if script.tap_every_ms > 0 && elapsed >= next_tap {
            next_tap += script.tap_every_ms;
            // Spread taps across an 80x24 grid so positions vary.
            let n = transcript.taps_landed as f64;
            let point = Point::new((n * 7.0) % 80.0, (n * 3.0) % 24.0);
            if experience.tap(point).is_some() {
                transcript.taps_landed += 1;
            }
        }
        if second_chance_at.is_some_and(|at| elapsed >= at) {
            second_chance_at = None;
            experience.request_second_chance();
        }

        let report = experience.pump();
        transcript.ended |= report.ended;
        transcript.expired_committed |= report.expired_committed;
        if report.reset {
            transcript.resets += 1;
        }

        if redraw.draw(out, &experience.view())? {
            transcript.frames_drawn += 1;
        }
    }

    writeln!(
        out,
        "-- simulated {} | taps {} | status {:?}",
        format_seconds(elapsed),
        transcript.taps_landed,
        experience.status()
    )?;
    debug!(?transcript, "Simulation finished");
    Ok(transcript)
}
