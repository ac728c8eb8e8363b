//! Time sources for the session lifecycle.
//!
//! Two readings are needed and they must not be confused:
//!
//! - **Wall time** (epoch milliseconds) is what gets persisted. It survives
//!   reloads and is shared with anything else reading the same storage.
//! - **Monotonic time** drives the countdown ticker and timer deadlines. It
//!   never goes backwards, so a wall-clock adjustment mid-session cannot make
//!   the countdown jump.
//!
//! Production uses [`SystemClock`]. Tests and the scripted `simulate` command
//! use [`ManualClock`], which only moves when told to.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

pub trait Clock: Send {
    /// Milliseconds since the Unix epoch.
    fn wall_ms(&self) -> i64;

    /// Milliseconds since an arbitrary fixed origin. Never decreases.
    fn monotonic_ms(&self) -> u64;
}

/// Real time: `chrono` for the wall reading, `Instant` for the monotonic one.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn wall_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn monotonic_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

#[derive(Debug)]
struct ManualClockState {
    wall_ms: AtomicI64,
    monotonic_ms: AtomicU64,
}

/// Simulated time. Clones share the same underlying readings, so a test can
/// hand one clone to an [`Experience`](crate::Experience) and keep another to
/// drive it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<ManualClockState>,
}

impl ManualClock {
    pub fn new(wall_ms: i64) -> Self {
        Self {
            state: Arc::new(ManualClockState {
                wall_ms: AtomicI64::new(wall_ms),
                monotonic_ms: AtomicU64::new(0),
            }),
        }
    }

    /// Moves both wall and monotonic time forward together.
    pub fn advance(&self, ms: u64) {
        self.state
            .wall_ms
            .fetch_add(ms as i64, Ordering::SeqCst);
        self.state.monotonic_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jumps the wall reading only, as a user changing their system clock would.
    pub fn set_wall_ms(&self, wall_ms: i64) {
        self.state.wall_ms.store(wall_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn wall_ms(&self) -> i64 {
        self.state.wall_ms.load(Ordering::SeqCst)
    }

    fn monotonic_ms(&self) -> u64 {
        self.state.monotonic_ms.load(Ordering::SeqCst)
    }
}
