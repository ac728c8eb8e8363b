//! Session lifecycle: the one-way Active → Expired transition.
//!
//! # States
//!
//! ```text
//! Uninitialized ──start──▶ Active(remaining) ──tick reaches 0──▶ Fading ──fade commit──▶ Expired
//!       │                        ▲                                                      │
//!       └──start (expired)───────┼──────────────────────────────────────────────────────▶│
//!                                └────────────────────────── reset ◀───────────────────┘
//! ```
//!
//! `start` reads [`PersistentClock`] once:
//!
//! - persisted `expired` → `Expired` (cold, no fade)
//! - no start time → write `startedAt = now`, `Active(duration)`
//! - elapsed ≥ duration → persist expiry, `Expired` (cold, no fade)
//! - otherwise → `Active(duration - elapsed)`
//!
//! # End transition
//!
//! When the ticker reaches zero the expiry is persisted first, then the
//! machine sits in `Fading` until the caller commits it. Durability never waits
//! on presentation: navigating away mid-fade still leaves the session expired.
//! `tick` outside `Active` is a no-op, so the End transition cannot run twice.

use tracing::info;

use crate::persist::PersistentClock;
use crate::timer::Ticker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Active,
    /// Expiry is persisted; presentation has not switched yet.
    Fading,
    Expired,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Uninitialized => write!(f, "uninitialized"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Fading => write!(f, "fading"),
            SessionPhase::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Active { remaining_ms: u64 },
    Fading,
    Expired,
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Active { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, SessionStatus::Expired)
    }
}

/// What `start` found in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No session on record; one was started now.
    Fresh,
    /// A session was already running and still has time left.
    Resumed { remaining_ms: u64 },
    /// A session was running but its deadline passed while nobody watched.
    ColdExpired,
    /// The expiry flag was already persisted.
    AlreadyExpired,
}

impl LoadOutcome {
    pub fn is_expired(&self) -> bool {
        matches!(self, LoadOutcome::ColdExpired | LoadOutcome::AlreadyExpired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not counting down.
    Idle,
    Counting { remaining_ms: u64 },
    /// The End transition just began; expiry is already persisted.
    Ended,
}

#[derive(Debug)]
pub struct SessionMachine {
    duration_ms: u64,
    phase: SessionPhase,
    ticker: Option<Ticker>,
    remaining_ms: u64,
}

impl SessionMachine {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            phase: SessionPhase::Uninitialized,
            ticker: None,
            remaining_ms: duration_ms,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn status(&self) -> SessionStatus {
        match self.phase {
            SessionPhase::Uninitialized => SessionStatus::Uninitialized,
            SessionPhase::Active => SessionStatus::Active {
                remaining_ms: self.remaining_ms,
            },
            SessionPhase::Fading => SessionStatus::Fading,
            SessionPhase::Expired => SessionStatus::Expired,
        }
    }

    pub fn remaining_ms(&self) -> u64 {
        match self.phase {
            SessionPhase::Active => self.remaining_ms,
            SessionPhase::Uninitialized => self.duration_ms,
            SessionPhase::Fading | SessionPhase::Expired => 0,
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn start(
        &mut self,
        persist: &mut PersistentClock,
        wall_now_ms: i64,
        monotonic_now_ms: u64,
    ) -> LoadOutcome {
        let persisted = persist.load();

        if persisted.expired {
            self.enter_expired();
            info!(ended_at = ?persisted.ended_at, "Session already expired");
            return LoadOutcome::AlreadyExpired;
        }

        let Some(started_at) = persisted.started_at else {
            persist.write_start(wall_now_ms);
            self.enter_active(self.duration_ms, monotonic_now_ms);
            info!(started_at = wall_now_ms, "Session started");
            return LoadOutcome::Fresh;
        };

        // A start time in the future (clock moved backwards) counts as zero elapsed.
        let elapsed_ms = wall_now_ms.saturating_sub(started_at).max(0) as u64;
        if elapsed_ms >= self.duration_ms {
            persist.mark_expired(wall_now_ms);
            self.enter_expired();
            info!(started_at, elapsed_ms, "Session deadline passed before load");
            return LoadOutcome::ColdExpired;
        }

        let remaining_ms = self.duration_ms - elapsed_ms;
        self.enter_active(remaining_ms, monotonic_now_ms);
        info!(started_at, remaining_ms, "Session resumed");
        LoadOutcome::Resumed { remaining_ms }
    }

    /// Recomputes the countdown. Performs the persisted half of the End
    /// transition when it reaches zero.
    pub fn tick(
        &mut self,
        persist: &mut PersistentClock,
        wall_now_ms: i64,
        monotonic_now_ms: u64,
    ) -> TickOutcome {
        let Some(ticker) = self.ticker else {
            return TickOutcome::Idle;
        };
        if self.phase != SessionPhase::Active {
            self.ticker = None;
            return TickOutcome::Idle;
        }

        self.remaining_ms = ticker.remaining_at(monotonic_now_ms);
        if self.remaining_ms > 0 {
            return TickOutcome::Counting {
                remaining_ms: self.remaining_ms,
            };
        }

        self.ticker = None;
        persist.mark_expired(wall_now_ms);
        self.phase = SessionPhase::Fading;
        info!(ended_at = wall_now_ms, "Session time ran out");
        TickOutcome::Ended
    }

    /// Completes a live End transition. Returns false (and does nothing) unless
    /// the machine is `Fading`.
    pub fn commit_expired(&mut self) -> bool {
        if self.phase != SessionPhase::Fading {
            return false;
        }
        self.enter_expired();
        true
    }

    /// Discards the current session and begins a new full-length one.
    pub fn reset(
        &mut self,
        persist: &mut PersistentClock,
        wall_now_ms: i64,
        monotonic_now_ms: u64,
    ) {
        let previous = self.phase;
        persist.clear();
        persist.write_start(wall_now_ms);
        self.enter_active(self.duration_ms, monotonic_now_ms);
        info!(previous = %previous, started_at = wall_now_ms, "Session reset");
    }

    /// Stops the countdown without touching storage. Used on teardown.
    pub fn cancel(&mut self) {
        self.ticker = None;
    }

    fn enter_active(&mut self, remaining_ms: u64, monotonic_now_ms: u64) {
        self.phase = SessionPhase::Active;
        self.remaining_ms = remaining_ms;
        self.ticker = Some(Ticker::arm(monotonic_now_ms, remaining_ms));
    }

    fn enter_expired(&mut self) {
        self.phase = SessionPhase::Expired;
        self.remaining_ms = 0;
        self.ticker = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};

    const NOW: i64 = 1_700_000_000_000;
    const DURATION: u64 = 60_000;

    fn clock_with(store: &MemoryStore) -> PersistentClock {
        PersistentClock::new(Box::new(store.clone()))
    }

    #[test]
    fn test_fresh_start_writes_start_time() {
        let store = MemoryStore::new();
        let mut persist = clock_with(&store);
        let mut session = SessionMachine::new(DURATION);

        let outcome = session.start(&mut persist, NOW, 0);

        assert_eq!(outcome, LoadOutcome::Fresh);
        assert_eq!(
            session.status(),
            SessionStatus::Active {
                remaining_ms: DURATION
            }
        );
        assert_eq!(
            store.get("borrowed-time:startedAt").unwrap(),
            Some(NOW.to_string())
        );
    }

    #[test]
    fn test_resume_computes_remaining_from_elapsed() {
        for elapsed in [0_i64, 1, 15_000, 59_999] {
            let mut store = MemoryStore::new();
            store
                .set("borrowed-time:startedAt", &(NOW - elapsed).to_string())
                .unwrap();
            let mut persist = clock_with(&store);
            let mut session = SessionMachine::new(DURATION);

            let outcome = session.start(&mut persist, NOW, 0);
            let expected = DURATION - elapsed as u64;

            assert_eq!(outcome, LoadOutcome::Resumed { remaining_ms: expected });
            assert_eq!(session.remaining_ms(), expected);
        }
    }

    #[test]
    fn test_past_deadline_expires_on_load() {
        for elapsed in [60_000_i64, 61_000, 86_400_000] {
            let mut store = MemoryStore::new();
            store
                .set("borrowed-time:startedAt", &(NOW - elapsed).to_string())
                .unwrap();
            let mut persist = clock_with(&store);
            let mut session = SessionMachine::new(DURATION);

            assert_eq!(session.start(&mut persist, NOW, 0), LoadOutcome::ColdExpired);
            assert_eq!(session.status(), SessionStatus::Expired);
            assert!(!session.is_ticking());
            assert_eq!(
                store.get("borrowed-time:expired").unwrap().as_deref(),
                Some("true")
            );
            assert_eq!(
                store.get("borrowed-time:endedAt").unwrap(),
                Some(NOW.to_string())
            );
        }
    }

    #[test]
    fn test_persisted_expiry_wins_over_start_time() {
        let mut store = MemoryStore::new();
        store.set("borrowed-time:startedAt", &NOW.to_string()).unwrap();
        store.set("borrowed-time:expired", "true").unwrap();
        let mut persist = clock_with(&store);
        let mut session = SessionMachine::new(DURATION);

        assert_eq!(
            session.start(&mut persist, NOW, 0),
            LoadOutcome::AlreadyExpired
        );
        assert_eq!(session.status(), SessionStatus::Expired);
    }

    #[test]
    fn test_future_start_time_counts_as_no_elapsed_time() {
        let mut store = MemoryStore::new();
        store
            .set("borrowed-time:startedAt", &(NOW + 5_000).to_string())
            .unwrap();
        let mut persist = clock_with(&store);
        let mut session = SessionMachine::new(DURATION);

        session.start(&mut persist, NOW, 0);
        assert_eq!(session.remaining_ms(), DURATION);
    }

    #[test]
    fn test_tick_counts_down_with_monotonic_time() {
        let store = MemoryStore::new();
        let mut persist = clock_with(&store);
        let mut session = SessionMachine::new(DURATION);
        session.start(&mut persist, NOW, 500);

        assert_eq!(
            session.tick(&mut persist, NOW + 16, 516),
            TickOutcome::Counting {
                remaining_ms: 59_984
            }
        );
        assert_eq!(
            session.tick(&mut persist, NOW + 30_000, 30_500),
            TickOutcome::Counting {
                remaining_ms: 30_000
            }
        );
    }

    #[test]
    fn test_tick_at_zero_persists_then_fades() {
        let store = MemoryStore::new();
        let mut persist = clock_with(&store);
        let mut session = SessionMachine::new(DURATION);
        session.start(&mut persist, NOW, 0);

        let ended_at = NOW + 60_000;
        assert_eq!(
            session.tick(&mut persist, ended_at, 60_000),
            TickOutcome::Ended
        );
        assert_eq!(session.status(), SessionStatus::Fading);
        assert_eq!(
            store.get("borrowed-time:expired").unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(
            store.get("borrowed-time:endedAt").unwrap(),
            Some(ended_at.to_string())
        );

        assert!(session.commit_expired());
        assert_eq!(session.status(), SessionStatus::Expired);
    }

    #[test]
    fn test_end_transition_is_not_reentrant() {
        let mut store = MemoryStore::new();
        let mut persist = clock_with(&store);
        let mut session = SessionMachine::new(DURATION);
        session.start(&mut persist, NOW, 0);
        session.tick(&mut persist, NOW + 60_000, 60_000);

        // Overwrite endedAt so a duplicate write would be visible.
        store.set("borrowed-time:endedAt", "1").unwrap();
        assert_eq!(
            session.tick(&mut persist, NOW + 60_016, 60_016),
            TickOutcome::Idle
        );
        assert_eq!(
            store.get("borrowed-time:endedAt").unwrap().as_deref(),
            Some("1")
        );

        assert!(session.commit_expired());
        assert!(!session.commit_expired());
        assert_eq!(
            session.tick(&mut persist, NOW + 70_000, 70_000),
            TickOutcome::Idle
        );
    }

    #[test]
    fn test_reset_from_expired_starts_full_session() {
        let mut store = MemoryStore::new();
        store.set("borrowed-time:expired", "true").unwrap();
        store.set("borrowed-time:endedAt", "123").unwrap();
        let mut persist = clock_with(&store);
        let mut session = SessionMachine::new(DURATION);
        session.start(&mut persist, NOW, 0);

        session.reset(&mut persist, NOW + 1_000, 1_000);

        assert_eq!(
            session.status(),
            SessionStatus::Active {
                remaining_ms: DURATION
            }
        );
        assert!(session.is_ticking());
        assert_eq!(store.get("borrowed-time:expired").unwrap(), None);
        assert_eq!(store.get("borrowed-time:endedAt").unwrap(), None);
        assert_eq!(
            store.get("borrowed-time:startedAt").unwrap(),
            Some((NOW + 1_000).to_string())
        );
    }

    #[test]
    fn test_reset_during_fade_blocks_stale_commit() {
        let store = MemoryStore::new();
        let mut persist = clock_with(&store);
        let mut session = SessionMachine::new(DURATION);
        session.start(&mut persist, NOW, 0);
        session.tick(&mut persist, NOW + 60_000, 60_000);

        session.reset(&mut persist, NOW + 60_500, 60_500);
        assert!(!session.commit_expired());
        assert!(session.status().is_active());
    }

    #[test]
    fn test_reset_twice_supersedes_first() {
        let store = MemoryStore::new();
        let mut persist = clock_with(&store);
        let mut session = SessionMachine::new(DURATION);
        session.start(&mut persist, NOW, 0);

        session.reset(&mut persist, NOW + 10, 10);
        session.reset(&mut persist, NOW + 20, 20);

        assert_eq!(
            store.get("borrowed-time:startedAt").unwrap(),
            Some((NOW + 20).to_string())
        );
        assert_eq!(
            session.tick(&mut persist, NOW + 20, 20),
            TickOutcome::Counting {
                remaining_ms: DURATION
            }
        );
    }

    #[test]
    fn test_cancel_stops_updates() {
        let store = MemoryStore::new();
        let mut persist = clock_with(&store);
        let mut session = SessionMachine::new(DURATION);
        session.start(&mut persist, NOW, 0);
        session.cancel();

        assert_eq!(
            session.tick(&mut persist, NOW + 90_000, 90_000),
            TickOutcome::Idle
        );
        assert_eq!(store.get("borrowed-time:expired").unwrap(), None);
    }
}
