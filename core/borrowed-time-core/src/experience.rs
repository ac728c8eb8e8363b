//! The composite controller: one instance per page view.
//!
//! `Experience` wires the session machine, the note board, the scene
//! controller, and a single timer queue together. The host drives it:
//!
//! ```text
//! host frame loop ──pump()──▶ session.tick ──Ended──▶ schedule fade commit
//!                        └──▶ fire due timers (intro, fade, notes, second chance)
//! host pointer    ──tap()───▶ note board (only while Active) ──▶ schedule removal
//! hidden control  ──request_second_chance()──▶ 1200ms ──▶ reset ──▶ 900ms ──▶ hide overlay
//! ```
//!
//! Every deferred effect is a [`TimerQueue`] entry, so `teardown` can cancel
//! all of them at once and nothing mutates a defunct instance.

use rand::RngCore;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::ExperienceConfig;
use crate::notes::{Note, NoteBoard, NoteId, Point};
use crate::persist::PersistentClock;
use crate::scene::{Scene, SceneController, SceneInputs, SceneView};
use crate::session::{LoadOutcome, SessionMachine, SessionStatus, TickOutcome};
use crate::storage::{KeyValueStore, StorageKeys};
use crate::timer::{TimerId, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    HideIntro,
    CommitExpired,
    RemoveNote(NoteId),
    SecondChanceReset,
    SecondChanceDismiss,
}

/// Observable changes from one `pump`, mostly for hosts that log or redraw
/// selectively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub remaining_ms: Option<u64>,
    /// The live End transition began this frame.
    pub ended: bool,
    /// The fade finished and the ruins are now showing.
    pub expired_committed: bool,
    pub removed_notes: Vec<NoteId>,
    pub intro_hidden: bool,
    pub reset: bool,
    pub second_chance_dismissed: bool,
}

pub struct Experience {
    config: ExperienceConfig,
    clock: Box<dyn Clock>,
    persist: PersistentClock,
    session: SessionMachine,
    notes: NoteBoard,
    scene: SceneController,
    timers: TimerQueue<TimerEvent>,
    reduced_motion: bool,
    intro_visible: bool,
    intro_timer: Option<TimerId>,
    fade_timer: Option<TimerId>,
    second_chance_timer: Option<TimerId>,
    second_chance: bool,
    torn_down: bool,
}

impl Experience {
    pub fn new(
        config: ExperienceConfig,
        clock: Box<dyn Clock>,
        store: Box<dyn KeyValueStore>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let keys = StorageKeys::with_namespace(&config.storage_namespace);
        Self {
            persist: PersistentClock::with_keys(store, keys),
            session: SessionMachine::new(config.duration_ms),
            notes: NoteBoard::new(config.max_live_notes, config.note_removal_grace_ms, rng),
            scene: SceneController::new(config.serene_src.clone(), config.ruins_src.clone()),
            timers: TimerQueue::new(),
            clock,
            config,
            reduced_motion: false,
            intro_visible: true,
            intro_timer: None,
            fade_timer: None,
            second_chance_timer: None,
            second_chance: false,
            torn_down: false,
        }
    }

    pub fn config(&self) -> &ExperienceConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn is_persistent(&self) -> bool {
        self.persist.is_persistent()
    }

    pub fn intro_visible(&self) -> bool {
        self.intro_visible && self.session.status().is_active()
    }

    pub fn second_chance_pending(&self) -> bool {
        self.second_chance
    }

    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.notes()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Loads the persisted session and begins counting down if time remains.
    ///
    /// A cold expired load goes straight to the ruins with no fade and no intro.
    pub fn start(&mut self) -> LoadOutcome {
        let (wall, mono) = self.now();
        let outcome = self.session.start(&mut self.persist, wall, mono);

        if outcome.is_expired() {
            self.intro_visible = false;
        } else {
            self.show_intro(mono);
        }
        info!(?outcome, persistent = self.persist.is_persistent(), "Experience started");
        outcome
    }

    /// One frame. Advances the countdown, then fires every timer that is due.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();
        if self.torn_down {
            return report;
        }

        let (wall, mono) = self.now();
        match self.session.tick(&mut self.persist, wall, mono) {
            TickOutcome::Idle => {}
            TickOutcome::Counting { remaining_ms } => report.remaining_ms = Some(remaining_ms),
            TickOutcome::Ended => {
                report.remaining_ms = Some(0);
                report.ended = true;
                let delay = self.config.fade_delay(self.reduced_motion);
                self.fade_timer = Some(self.timers.schedule(mono, delay, TimerEvent::CommitExpired));
            }
        }

        while let Some((id, event)) = self.timers.pop_due(mono) {
            self.fire(id, event, &mut report);
        }
        report
    }

    /// A pointer or tap on the scene. Spawns a note only while Active.
    pub fn tap(&mut self, position: Point) -> Option<NoteId> {
        if self.torn_down || !self.session.status().is_active() {
            return None;
        }

        let (_, mono) = self.now();
        let lifetime_ms = self.config.note_lifetime(self.reduced_motion);
        let spawned = self.notes.spawn(position, mono, lifetime_ms);
        if let Some(evicted) = spawned.evicted {
            self.timers
                .cancel_where(|event| *event == TimerEvent::RemoveNote(evicted));
        }
        self.timers.schedule(
            mono,
            spawned.remove_after_ms,
            TimerEvent::RemoveNote(spawned.id),
        );
        Some(spawned.id)
    }

    /// The hidden reset control. Shows the loading overlay, resets after a
    /// pause, then hides the overlay. Ignored while a staged reset is pending.
    pub fn request_second_chance(&mut self) -> bool {
        if self.torn_down || self.second_chance {
            return false;
        }
        let (_, mono) = self.now();
        self.second_chance = true;
        self.second_chance_timer = Some(self.timers.schedule(
            mono,
            self.config.second_chance_delay_ms,
            TimerEvent::SecondChanceReset,
        ));
        info!("Second chance requested");
        true
    }

    /// Immediately starts a fresh full-length session, whatever the current state.
    pub fn reset(&mut self) {
        if self.torn_down {
            return;
        }
        let (wall, mono) = self.now();

        if let Some(id) = self.fade_timer.take() {
            self.timers.cancel(id);
        }
        self.timers
            .cancel_where(|event| matches!(event, TimerEvent::RemoveNote(_)));
        self.notes.clear();
        self.notes.rewind();

        self.session.reset(&mut self.persist, wall, mono);
        self.show_intro(mono);
    }

    /// Live update of the host's reduced-motion preference. Applies to notes
    /// spawned and End transitions begun after the change.
    pub fn set_reduced_motion(&mut self, reduced_motion: bool) {
        if self.reduced_motion != reduced_motion {
            debug!(reduced_motion, "Reduced-motion preference changed");
        }
        self.reduced_motion = reduced_motion;
    }

    pub fn report_media_error(&mut self, scene: Scene) {
        self.scene.report_media_error(scene);
    }

    pub fn view(&self) -> SceneView {
        let notes: Vec<Note> = self.notes.notes().cloned().collect();
        let announcement = self.notes.announcement();
        self.scene.render(SceneInputs {
            status: self.session.status(),
            reduced_motion: self.reduced_motion,
            intro_visible: self.intro_visible(),
            second_chance: self.second_chance,
            notes: &notes,
            note_announcement: &announcement,
        })
    }

    /// Cancels the countdown and every pending timer. All later calls are no-ops.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.session.cancel();
        self.timers.clear();
        self.intro_timer = None;
        self.fade_timer = None;
        self.second_chance_timer = None;
        self.torn_down = true;
        debug!("Experience torn down");
    }

    fn fire(&mut self, id: TimerId, event: TimerEvent, report: &mut PumpReport) {
        match event {
            TimerEvent::HideIntro => {
                if self.intro_timer == Some(id) {
                    self.intro_timer = None;
                    self.intro_visible = false;
                    report.intro_hidden = true;
                }
            }
            TimerEvent::CommitExpired => {
                if self.fade_timer == Some(id) {
                    self.fade_timer = None;
                    report.expired_committed = self.session.commit_expired();
                }
            }
            TimerEvent::RemoveNote(note) => {
                if self.notes.remove(note) {
                    report.removed_notes.push(note);
                }
            }
            TimerEvent::SecondChanceReset => {
                self.reset();
                report.reset = true;
                let (_, mono) = self.now();
                self.second_chance_timer = Some(self.timers.schedule(
                    mono,
                    self.config.second_chance_dismiss_ms,
                    TimerEvent::SecondChanceDismiss,
                ));
            }
            TimerEvent::SecondChanceDismiss => {
                self.second_chance = false;
                self.second_chance_timer = None;
                report.second_chance_dismissed = true;
            }
        }
    }

    /// Re-arms the one-shot intro flag, superseding any earlier hide timer.
    fn show_intro(&mut self, mono: u64) {
        if let Some(id) = self.intro_timer.take() {
            self.timers.cancel(id);
        }
        self.intro_visible = true;
        self.intro_timer = Some(self.timers.schedule(
            mono,
            self.config.intro_visible_ms,
            TimerEvent::HideIntro,
        ));
    }

    fn now(&self) -> (i64, u64) {
        (self.clock.wall_ms(), self.clock.monotonic_ms())
    }
}

impl Drop for Experience {
    fn drop(&mut self) {
        self.teardown();
    }
}
