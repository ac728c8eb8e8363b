//! Floating notes spawned by taps on the serene scene.
//!
//! The board keeps live notes in insertion order and never holds more than
//! `max_live` of them: adding one past the limit evicts the oldest right away,
//! however much lifetime it has left. Eviction is by insertion order only.
//!
//! Text is not random. A cursor walks [`POETIC_LINES`] in order and wraps, so
//! repeated taps read the lines as a sequence. Colour and drift are random.
//!
//! The board does not own timers. [`NoteBoard::spawn`] reports when the note
//! should be removed and the caller schedules it; [`NoteBoard::remove`] is
//! idempotent because eviction may already have taken the note.

use std::collections::VecDeque;

use rand::{Rng, RngCore};
use tracing::debug;
use ulid::Ulid;

pub const POETIC_LINES: [&str; 30] = [
    "A hush gathers on the edge of light.",
    "Leaves carry secrets in their veins.",
    "Waves write letters no shore can keep.",
    "The wind braids memory into branches.",
    "Footsteps soften the ribs of the earth.",
    "Time dissolves like salt on the tongue.",
    "Clouds unspool thread from the horizon.",
    "Silence blooms where names fade.",
    "The sun rehearses its slow confession.",
    "Stones remember our weight kindly.",
    "Shadows drink the last of the dawn.",
    "A gull stitches sky to water.",
    "Distant hills wear the day’s first fire.",
    "Your breath is a tide, arriving, leaving.",
    "Moss keeps the minutes in green.",
    "Here, even endings learn to listen.",
    "Light loosens the knots of night.",
    "Every ripple is a word for 'almost'.",
    "We live between two open hands.",
    "What you touch touches you back.",
    "The path forgets where it started.",
    "A petal perfects its fall.",
    "Sky leans in to hear the ocean.",
    "Roots map the rumor of rain.",
    "Softly, the world turns toward you.",
    "Your quiet is a harbor.",
    "The moment is a cup, drink slowly.",
    "Ash remembers the shape of flame.",
    "The horizon practices return.",
    "Stay, and let the stillness move.",
];

pub const NOTE_PALETTE: [&str; 6] = [
    "#111111", "#262626", "#3f3f46", "#14532d", "#1f2937", "#374151",
];

/// Notes never animate for less than this, even with a shorter lifetime.
pub const MIN_ANIMATION_MS: u64 = 800;

const DRIFT_X_SPAN: f64 = 20.0;
const DRIFT_Y_SPAN: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(Ulid);

impl NoteId {
    fn generate() -> Self {
        NoteId(Ulid::new())
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point relative to the scene container's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub position: Point,
    pub text: &'static str,
    pub color: &'static str,
    /// Render offset so stacked notes don't sit exactly on the tap point.
    pub drift: Point,
    /// Monotonic milliseconds.
    pub created_at_ms: u64,
    pub lifetime_ms: u64,
}

impl Note {
    pub fn animation_ms(&self) -> u64 {
        self.lifetime_ms.max(MIN_ANIMATION_MS)
    }
}

/// Result of a spawn: the new note and whatever it pushed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Spawned {
    pub id: NoteId,
    pub evicted: Option<NoteId>,
    /// Delay after which the caller should call [`NoteBoard::remove`].
    pub remove_after_ms: u64,
}

pub struct NoteBoard {
    notes: VecDeque<Note>,
    cursor: usize,
    max_live: usize,
    removal_grace_ms: u64,
    rng: Box<dyn RngCore + Send>,
}

impl NoteBoard {
    pub fn new(max_live: usize, removal_grace_ms: u64, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            notes: VecDeque::with_capacity(max_live + 1),
            cursor: 0,
            max_live: max_live.max(1),
            removal_grace_ms,
            rng,
        }
    }

    pub fn spawn(&mut self, position: Point, now_ms: u64, lifetime_ms: u64) -> Spawned {
        let text = POETIC_LINES[self.cursor % POETIC_LINES.len()];
        self.cursor = self.cursor.wrapping_add(1);

        let color = NOTE_PALETTE[self.rng.gen_range(0..NOTE_PALETTE.len())];
        let drift = Point {
            x: (self.rng.gen::<f64>() - 0.5) * DRIFT_X_SPAN,
            y: (self.rng.gen::<f64>() - 0.5) * DRIFT_Y_SPAN,
        };

        let id = NoteId::generate();
        self.notes.push_back(Note {
            id,
            position,
            text,
            color,
            drift,
            created_at_ms: now_ms,
            lifetime_ms,
        });

        let evicted = if self.notes.len() > self.max_live {
            self.notes.pop_front().map(|note| note.id)
        } else {
            None
        };
        if let Some(evicted) = evicted {
            debug!(note = %evicted, "Evicted oldest note");
        }
        debug!(note = %id, text, live = self.notes.len(), "Spawned note");

        Spawned {
            id,
            evicted,
            remove_after_ms: lifetime_ms + self.removal_grace_ms,
        }
    }

    /// Returns true if the note was still live.
    pub fn remove(&mut self, id: NoteId) -> bool {
        match self.notes.iter().position(|note| note.id == id) {
            Some(index) => {
                self.notes.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    /// Starts the line sequence over from the first line.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Text of the most recently spawned live note, for screen readers.
    pub fn latest_text(&self) -> Option<&'static str> {
        self.notes.back().map(|note| note.text)
    }

    /// Live-region announcement for the latest note, or empty.
    pub fn announcement(&self) -> String {
        self.latest_text()
            .map(|text| format!("New line: {text}"))
            .unwrap_or_default()
    }
}
