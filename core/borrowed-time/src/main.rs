//! borrowed-time: terminal host for the Borrowed Time experience.
//!
//! You get sixty seconds with a serene scene. Tap to reveal lines. When the
//! minute is up the scene turns to ruins, and stays that way across restarts.
//!
//! ## Subcommands
//!
//! - `run`: Interactive session, reads commands from stdin
//! - `status`: Print the persisted session
//! - `reset`: Clear the persisted session
//! - `simulate`: Scripted dry run on a manual clock (touches nothing on disk)

mod logging;
mod play;
mod render;
mod simulate;
mod status;

use std::io;
use std::path::PathBuf;

use borrowed_time_core::{load_config, StorageConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "borrowed-time")]
#[command(about = "Sixty seconds with a place before it changes")]
#[command(version)]
struct Cli {
    /// Storage root (defaults to ~/.borrowed-time)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enter the scene (reads commands from stdin)
    Run {
        /// Skip the fade and shorten note lifetimes
        #[arg(long)]
        reduced_motion: bool,

        /// Go straight in without the landing text
        #[arg(long)]
        skip_landing: bool,

        /// Frame interval in milliseconds
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
    },

    /// Print the persisted session
    Status,

    /// Clear the persisted session so the next run starts fresh
    Reset,

    /// Scripted run on a manual clock with in-memory storage
    Simulate {
        /// Simulated seconds to run
        #[arg(long, default_value_t = 62)]
        seconds: u64,

        /// Tap every N milliseconds (0 disables)
        #[arg(long, default_value_t = 0)]
        tap_every_ms: u64,

        /// Request a second chance at this many seconds in
        #[arg(long)]
        second_chance_at: Option<u64>,

        #[arg(long)]
        reduced_motion: bool,

        /// Seed for note colours
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    let storage = match cli.root {
        Some(root) => StorageConfig::with_root(root),
        None => StorageConfig::default(),
    };
    let _logging_guard = logging::init(&storage);

    let stdout = io::stdout();
    let result = match cli.command {
        Commands::Run {
            reduced_motion,
            skip_landing,
            frame_ms,
        } => play::run(
            &storage,
            play::RunOptions {
                reduced_motion,
                skip_landing,
                frame_ms,
            },
        )
        .map_err(|e| e.to_string()),
        Commands::Status => status::show(&storage, &mut stdout.lock()).map_err(|e| e.to_string()),
        Commands::Reset => status::reset(&storage, &mut stdout.lock()).map_err(|e| e.to_string()),
        Commands::Simulate {
            seconds,
            tap_every_ms,
            second_chance_at,
            reduced_motion,
            seed,
        } => {
            let script = simulate::Script {
                run_ms: seconds.saturating_mul(1_000),
                tap_every_ms,
                second_chance_at_ms: second_chance_at.map(|s| s.saturating_mul(1_000)),
                reduced_motion,
                seed,
            };
            simulate::run(load_config(&storage), &script, &mut stdout.lock())
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "borrowed-time failed");
        eprintln!("borrowed-time: {e}");
        std::process::exit(1);
    }
}
