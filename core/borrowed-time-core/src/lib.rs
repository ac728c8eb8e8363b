//! # borrowed-time-core
//!
//! Core library for Borrowed Time: a visitor gets sixty seconds with a serene
//! scene, then the scene turns to ruins for good. The expiry survives reloads
//! because it is persisted; a hidden control grants one more pass.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime, no threads. The host pumps frames.
//! - **Not thread-safe**: One [`Experience`] per view; hosts synchronize if needed.
//! - **Graceful degradation**: Storage failures fall back to an in-memory
//!   session. Media failures fall back to a static backdrop. Nothing is fatal.
//! - **Injected time and storage**: [`Clock`] and [`KeyValueStore`] are traits so
//!   tests run against [`ManualClock`] and [`MemoryStore`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use borrowed_time_core::{Experience, ExperienceConfig, StorageConfig, SystemClock, Point};
//!
//! let storage = StorageConfig::default();
//! let mut experience = Experience::new(
//!     ExperienceConfig::default(),
//!     Box::new(SystemClock::new()),
//!     Box::new(storage.open_store()),
//!     Box::new(rand::rngs::StdRng::from_entropy()),
//! );
//! experience.start();
//! loop {
//!     experience.pump();
//!     let view = experience.view();
//!     // draw `view`, feed taps to `experience.tap(Point::new(x, y))`
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod experience;
pub mod notes;
pub mod persist;
pub mod scene;
pub mod session;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, save_config, ExperienceConfig};
pub use error::{BorrowedTimeError, Result};
pub use experience::{Experience, PumpReport};
pub use notes::{Note, NoteBoard, NoteId, Point, Spawned, NOTE_PALETTE, POETIC_LINES};
pub use persist::{PersistedSession, PersistentClock};
pub use scene::{
    format_seconds, Backdrop, Epitaph, MediaKind, MediaView, Scene, SceneController, SceneView,
};
pub use session::{LoadOutcome, SessionMachine, SessionPhase, SessionStatus, TickOutcome};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageConfig, StorageKeys};
pub use timer::{Ticker, TimerId, TimerQueue};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
