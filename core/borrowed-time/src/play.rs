//! Interactive session in the terminal.
//!
//! ## Usage
//!
//! ```bash
//! borrowed-time run
//! ```
//!
//! Stdin is read on a helper thread and forwarded line by line over a
//! channel. The main thread owns the [`Experience`] and pumps one frame per
//! `recv_timeout`, so commands and the countdown interleave without locks.
//!
//! ```text
//! stdin thread ──lines──▶ mpsc ──recv_timeout(frame)──▶ apply command
//!                                                      └─▶ pump ──▶ redraw
//! ```

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use borrowed_time_core::{
    load_config, Experience, Point, Scene, StorageConfig, SystemClock,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info};

use crate::render::{self, Redraw};

pub const HELP: &str = "Commands: tap [X Y] | second-chance | reset | motion on|off | \
     media-error serene|ruins | help | quit";

#[derive(Error, Debug)]
pub enum PlayError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One line of user input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Tap(Point),
    SecondChance,
    Reset,
    Motion { reduced: bool },
    MediaError(Scene),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(Command::Tap(Point::default()));
        };
        let args: Vec<&str> = words.collect();

        match (head.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("tap" | "t", []) => Ok(Command::Tap(Point::default())),
            ("tap" | "t", [x, y]) => {
                let x = x.parse::<f64>().map_err(|_| format!("Bad x coordinate: {x}"))?;
                let y = y.parse::<f64>().map_err(|_| format!("Bad y coordinate: {y}"))?;
                Ok(Command::Tap(Point::new(x, y)))
            }
            ("second-chance" | "again", []) => Ok(Command::SecondChance),
            ("reset", []) => Ok(Command::Reset),
            ("motion", ["on"]) => Ok(Command::Motion { reduced: false }),
            ("motion", ["off"]) => Ok(Command::Motion { reduced: true }),
            ("media-error", ["serene"]) => Ok(Command::MediaError(Scene::Serene)),
            ("media-error", ["ruins"]) => Ok(Command::MediaError(Scene::Ruins)),
            ("help" | "?", []) => Ok(Command::Help),
            ("quit" | "q" | "exit", []) => Ok(Command::Quit),
            _ => Err(format!("Unrecognized command: {}", line.trim())),
        }
    }
}

pub struct RunOptions {
    pub reduced_motion: bool,
    pub skip_landing: bool,
    pub frame_ms: u64,
}

pub fn run(storage: &StorageConfig, options: RunOptions) -> Result<(), PlayError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let input = spawn_input();

    if !options.skip_landing {
        writeln!(out, "{}", render::landing())?;
        writeln!(out, "Press Enter to enter.")?;
        out.flush()?;
        if input.recv().is_err() {
            return Ok(());
        }
    }

    let config = load_config(storage);
    let mut experience = Experience::new(
        config,
        Box::new(SystemClock::new()),
        Box::new(storage.open_store()),
        Box::new(StdRng::from_entropy()),
    );
    experience.set_reduced_motion(options.reduced_motion);
    let outcome = experience.start();
    if !experience.is_persistent() {
        writeln!(out, "(storage unavailable; this session will not survive a restart)")?;
    }
    debug!(?outcome, "Interactive session loaded");

    let frame = Duration::from_millis(options.frame_ms.max(1));
    let mut redraw = Redraw::default();
    redraw.draw(&mut out, &experience.view())?;

    loop {
        match input.recv_timeout(frame) {
            Ok(line) => match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => apply(&mut experience, command, &mut out)?,
                Err(message) => writeln!(out, "{message}\n{HELP}")?,
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let report = experience.pump();
        if report.expired_committed {
            info!("Ruins committed");
        }
        redraw.draw(&mut out, &experience.view())?;
    }

    experience.teardown();
    Ok(())
}

pub fn apply(
    experience: &mut Experience,
    command: Command,
    out: &mut impl Write,
) -> Result<(), PlayError> {
    match command {
        Command::Tap(point) => {
            if experience.tap(point).is_some() {
                writeln!(out, "{}", experience.view().note_announcement)?;
            }
        }
        Command::SecondChance => {
            experience.request_second_chance();
        }
        Command::Reset => experience.reset(),
        Command::Motion { reduced } => experience.set_reduced_motion(reduced),
        Command::MediaError(scene) => experience.report_media_error(scene),
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit => {}
    }
    Ok(())
}

fn spawn_input() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use borrowed_time_core::{ExperienceConfig, ManualClock, MemoryStore, SessionStatus};

    #[test]
    fn test_parse_tap_variants() {
        assert_eq!(Command::parse(""), Ok(Command::Tap(Point::default())));
        assert_eq!(Command::parse("tap"), Ok(Command::Tap(Point::default())));
        assert_eq!(
            Command::parse("tap 12 -4.5"),
            Ok(Command::Tap(Point::new(12.0, -4.5)))
        );
        assert!(Command::parse("tap 12").is_err());
        assert!(Command::parse("tap x 1").is_err());
    }

    #[test]
    fn test_parse_controls() {
        assert_eq!(Command::parse("RESET"), Ok(Command::Reset));
        assert_eq!(Command::parse("second-chance"), Ok(Command::SecondChance));
        assert_eq!(
            Command::parse("motion off"),
            Ok(Command::Motion { reduced: true })
        );
        assert_eq!(
            Command::parse("media-error ruins"),
            Ok(Command::MediaError(Scene::Ruins))
        );
        assert_eq!(Command::parse(" q "), Ok(Command::Quit));
        assert!(Command::parse("motion sideways").is_err());
    }

    #[test]
    fn test_apply_tap_prints_announcement() {
        let clock = ManualClock::new(1_700_000_000_000);
        let mut experience = Experience::new(
            ExperienceConfig::default(),
            Box::new(clock),
            Box::new(MemoryStore::new()),
            Box::new(StdRng::seed_from_u64(1)),
        );
        experience.start();

        let mut out = Vec::new();
        apply(&mut experience, Command::Tap(Point::new(3.0, 4.0)), &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.starts_with("New line: "));
        assert_eq!(experience.note_count(), 1);

        apply(&mut experience, Command::Reset, &mut Vec::new()).unwrap();
        assert_eq!(experience.note_count(), 0);
        assert!(matches!(
            experience.status(),
            SessionStatus::Active { .. }
        ));
    }
}
