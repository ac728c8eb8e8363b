//! Deferred events and the countdown ticker.
//!
//! Nothing in this crate sleeps or spawns threads. The host calls
//! [`Experience::pump`](crate::Experience::pump) once per frame and everything
//! time-based is derived from the monotonic reading it takes at that moment:
//!
//! - [`TimerQueue`] holds one-shot events keyed by deadline. Each schedule call
//!   returns a [`TimerId`] that cancels exactly that event.
//! - [`Ticker`] is the continuous countdown. It remembers where the countdown
//!   stood when it was armed, so the remaining value follows elapsed time
//!   exactly no matter how often or how irregularly it is sampled.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// One-shot timers over a monotonic millisecond clock.
///
/// Due events pop in deadline order; events sharing a deadline pop in the
/// order they were scheduled.
#[derive(Debug)]
pub struct TimerQueue<E> {
    next_id: u64,
    pending: BTreeMap<(u64, TimerId), E>,
    deadlines: HashMap<TimerId, u64>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline = now_ms.saturating_add(delay_ms);
        self.pending.insert((deadline, id), event);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Returns true if the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.pending.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Cancels every pending timer whose event matches. Returns how many.
    pub fn cancel_where(&mut self, mut matches: impl FnMut(&E) -> bool) -> usize {
        let doomed: Vec<(u64, TimerId)> = self
            .pending
            .iter()
            .filter(|(_, event)| matches(event))
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            self.pending.remove(key);
            self.deadlines.remove(&key.1);
        }
        doomed.len()
    }

    /// Removes and returns the earliest event whose deadline is at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerId, E)> {
        let (&(deadline, id), _) = self.pending.iter().next()?;
        if deadline > now_ms {
            return None;
        }
        self.deadlines.remove(&id);
        self.pending.remove(&(deadline, id)).map(|event| (id, event))
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.deadlines.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// An armed countdown.
///
/// Cancel by dropping it (the session machine holds it in an `Option`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    armed_at_ms: u64,
    remaining_at_arm_ms: u64,
}

impl Ticker {
    pub fn arm(now_ms: u64, remaining_ms: u64) -> Self {
        Self {
            armed_at_ms: now_ms,
            remaining_at_arm_ms: remaining_ms,
        }
    }

    /// Remaining milliseconds at `now_ms`, floored at zero.
    pub fn remaining_at(&self, now_ms: u64) -> u64 {
        let elapsed = now_ms.saturating_sub(self.armed_at_ms);
        self.remaining_at_arm_ms.saturating_sub(elapsed)
    }

    pub fn deadline_ms(&self) -> u64 {
        self.armed_at_ms.saturating_add(self.remaining_at_arm_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_due_respects_deadline() {
        let mut timers = TimerQueue::new();
        timers.schedule(0, 100, "a");
        assert_eq!(timers.pop_due(99), None);
        assert_eq!(timers.pop_due(100).map(|(_, e)| e), Some("a"));
        assert!(timers.is_empty());
    }

    #[test]
    fn test_pop_due_orders_by_deadline_then_schedule_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(0, 50, "late");
        timers.schedule(0, 10, "first");
        timers.schedule(0, 10, "second");

        let fired: Vec<_> = std::iter::from_fn(|| timers.pop_due(1_000))
            .map(|(_, e)| e)
            .collect();
        assert_eq!(fired, vec!["first", "second", "late"]);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule(0, 10, "x");
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(!timers.is_pending(id));
        assert_eq!(timers.pop_due(1_000), None);
    }

    #[test]
    fn test_cancel_where_only_removes_matches() {
        let mut timers = TimerQueue::new();
        timers.schedule(0, 10, 1);
        timers.schedule(0, 20, 2);
        timers.schedule(0, 30, 3);

        assert_eq!(timers.cancel_where(|n| n % 2 == 1), 2);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_deadline(), Some(20));
    }

    #[test]
    fn test_schedule_saturates_deadline() {
        let mut timers = TimerQueue::new();
        timers.schedule(u64::MAX - 1, 10, ());
        assert_eq!(timers.next_deadline(), Some(u64::MAX));
    }

    #[test]
    fn test_ticker_tracks_elapsed_time() {
        let ticker = Ticker::arm(1_000, 60_000);
        assert_eq!(ticker.remaining_at(1_000), 60_000);
        assert_eq!(ticker.remaining_at(1_016), 59_984);
        assert_eq!(ticker.remaining_at(31_000), 30_000);
        assert_eq!(ticker.deadline_ms(), 61_000);
    }

    #[test]
    fn test_ticker_is_independent_of_sampling() {
        let ticker = Ticker::arm(0, 5_000);
        let mut sampled = 0;
        for now in (0..=3_000).step_by(7) {
            sampled = ticker.remaining_at(now);
        }
        assert_eq!(sampled, ticker.remaining_at(2_996));
        assert_eq!(ticker.remaining_at(9_999), 0);
    }
}
