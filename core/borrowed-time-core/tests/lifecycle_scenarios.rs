//! End-to-end session scenarios: fresh visits, reloads, expiry, and reset.

use borrowed_time_core::{
    Clock, Experience, ExperienceConfig, KeyValueStore, LoadOutcome, ManualClock, MemoryStore, Point,
    SessionStatus, StorageConfig, POETIC_LINES,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

const NOW: i64 = 1_700_000_000_000;
const DURATION: u64 = 60_000;
const FRAME_MS: u64 = 16;

fn open(store: Box<dyn KeyValueStore>, clock: &ManualClock, seed: u64) -> Experience {
    Experience::new(
        ExperienceConfig::default(),
        Box::new(clock.clone()),
        store,
        Box::new(StdRng::seed_from_u64(seed)),
    )
}

fn run_frames(experience: &mut Experience, clock: &ManualClock, ms: u64) {
    let mut left = ms;
    while left > 0 {
        let step = left.min(FRAME_MS);
        clock.advance(step);
        left -= step;
        experience.pump();
    }
}

fn seeded_store(started_at: i64) -> MemoryStore {
    let mut store = MemoryStore::new();
    store
        .set("borrowed-time:startedAt", &started_at.to_string())
        .unwrap();
    store
}

#[test]
fn test_fresh_visit_runs_to_expiry() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(NOW);
    let mut experience = open(Box::new(store.clone()), &clock, 1);

    assert_eq!(experience.start(), LoadOutcome::Fresh);
    assert_eq!(
        experience.status(),
        SessionStatus::Active {
            remaining_ms: DURATION
        }
    );

    let id = experience.tap(Point::new(10.0, 20.0)).unwrap();
    let note = experience.notes().find(|n| n.id == id).unwrap();
    assert_eq!(note.text, POETIC_LINES[0]);
    assert_eq!(note.position, Point::new(10.0, 20.0));

    run_frames(&mut experience, &clock, DURATION);
    run_frames(&mut experience, &clock, 1_800);

    assert_eq!(experience.status(), SessionStatus::Expired);
    assert_eq!(
        store.get("borrowed-time:expired").unwrap().as_deref(),
        Some("true")
    );
    assert!(store.get("borrowed-time:endedAt").unwrap().is_some());
}

#[test]
fn test_reload_with_time_left_resumes_countdown() {
    for elapsed in [1_i64, 12_345, 30_000, 59_999] {
        let store = seeded_store(NOW - elapsed);
        let clock = ManualClock::new(NOW);
        let mut experience = open(Box::new(store), &clock, 2);

        let expected = DURATION - elapsed as u64;
        assert_eq!(
            experience.start(),
            LoadOutcome::Resumed {
                remaining_ms: expected
            }
        );
        assert_eq!(
            experience.status(),
            SessionStatus::Active {
                remaining_ms: expected
            }
        );

        clock.advance(FRAME_MS);
        experience.pump();
        if expected > FRAME_MS {
            assert_eq!(
                experience.status(),
                SessionStatus::Active {
                    remaining_ms: expected - FRAME_MS
                }
            );
        } else {
            assert_eq!(experience.status(), SessionStatus::Fading);
        }
    }
}

#[test]
fn test_reload_past_deadline_is_cold_expired() {
    let store = seeded_store(NOW - 61_000);
    let clock = ManualClock::new(NOW);
    let mut experience = open(Box::new(store.clone()), &clock, 3);

    assert_eq!(experience.start(), LoadOutcome::ColdExpired);
    assert_eq!(experience.status(), SessionStatus::Expired);

    let view = experience.view();
    assert!(!view.fade_overlay);
    assert!(view.intro.is_none());
    assert!(view.epitaph.is_some());
    assert_eq!(
        store.get("borrowed-time:expired").unwrap().as_deref(),
        Some("true")
    );
    assert_eq!(
        store.get("borrowed-time:endedAt").unwrap(),
        Some(NOW.to_string())
    );
}

#[test]
fn test_expired_never_returns_active_without_reset() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(NOW);
    {
        let mut experience = open(Box::new(store.clone()), &clock, 4);
        experience.start();
        run_frames(&mut experience, &clock, DURATION);
    }

    // Even if the start time is rewritten to look fresh, the sticky flag wins.
    let mut tampered = store.clone();
    tampered
        .set("borrowed-time:startedAt", &clock.wall_ms().to_string())
        .unwrap();

    for _ in 0..3 {
        clock.advance(1_000);
        let mut experience = open(Box::new(store.clone()), &clock, 5);
        assert_eq!(experience.start(), LoadOutcome::AlreadyExpired);
        assert_eq!(experience.status(), SessionStatus::Expired);
    }
}

#[test]
fn test_reset_always_yields_full_session() {
    let starts = [None, Some(NOW - 10_000), Some(NOW - 120_000)];
    for started_at in starts {
        let store = match started_at {
            Some(at) => seeded_store(at),
            None => MemoryStore::new(),
        };
        let clock = ManualClock::new(NOW);
        let mut experience = open(Box::new(store.clone()), &clock, 6);
        experience.start();
        experience.tap(Point::default());

        experience.reset();

        assert_eq!(
            experience.status(),
            SessionStatus::Active {
                remaining_ms: DURATION
            }
        );
        assert_eq!(experience.note_count(), 0);
        assert_eq!(store.get("borrowed-time:expired").unwrap(), None);
        assert_eq!(store.get("borrowed-time:endedAt").unwrap(), None);
        assert_eq!(
            store.get("borrowed-time:startedAt").unwrap(),
            Some(NOW.to_string())
        );
    }
}

#[test]
fn test_reset_from_expired_scenario() {
    let mut store = MemoryStore::new();
    store.set("borrowed-time:expired", "true").unwrap();
    store.set("borrowed-time:endedAt", "1").unwrap();
    let clock = ManualClock::new(NOW);
    let mut experience = open(Box::new(store.clone()), &clock, 7);
    experience.start();

    experience.reset();

    assert_eq!(
        experience.status(),
        SessionStatus::Active {
            remaining_ms: DURATION
        }
    );
    assert_eq!(store.get("borrowed-time:expired").unwrap(), None);
    assert_eq!(experience.note_count(), 0);
    assert!(experience.view().intro.is_some());
}

#[test]
fn test_tap_while_expired_is_noop() {
    let store = seeded_store(NOW - DURATION as i64);
    let clock = ManualClock::new(NOW);
    let mut experience = open(Box::new(store), &clock, 8);
    experience.start();

    for i in 0..5 {
        assert_eq!(experience.tap(Point::new(i as f64, 0.0)), None);
    }
    assert_eq!(experience.note_count(), 0);
}

#[test]
fn test_note_cap_and_fifo_order() {
    let clock = ManualClock::new(NOW);
    let mut experience = open(Box::new(MemoryStore::new()), &clock, 9);
    experience.start();

    let ids: Vec<_> = (0..13)
        .map(|i| experience.tap(Point::new(i as f64, 0.0)).unwrap())
        .collect();

    let live: Vec<_> = experience.notes().map(|n| n.id).collect();
    assert_eq!(live.len(), 12);
    assert_eq!(live, ids[1..].to_vec());
}

#[test]
fn test_every_note_is_removed_within_lifetime_plus_grace() {
    let clock = ManualClock::new(NOW);
    let mut experience = open(Box::new(MemoryStore::new()), &clock, 10);
    experience.start();

    for i in 0..8 {
        experience.tap(Point::new(i as f64, i as f64));
        run_frames(&mut experience, &clock, 300);
    }
    run_frames(&mut experience, &clock, 5_100);
    assert_eq!(experience.note_count(), 0);
}

#[test]
fn test_line_cursor_is_deterministic_across_seeds() {
    let texts = |seed: u64| -> Vec<&'static str> {
        let clock = ManualClock::new(NOW);
        let mut experience = open(Box::new(MemoryStore::new()), &clock, seed);
        experience.start();
        (0..40)
            .map(|_| {
                let id = experience.tap(Point::default()).unwrap();
                let text = experience.notes().find(|n| n.id == id).unwrap().text;
                run_frames(&mut experience, &clock, 10);
                text
            })
            .collect()
    };

    let a = texts(11);
    let b = texts(12);
    assert_eq!(a, b);
    for (k, text) in a.iter().enumerate() {
        assert_eq!(*text, POETIC_LINES[k % POETIC_LINES.len()]);
    }
}

#[test]
fn test_two_tabs_share_session() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(NOW);
    let mut first = open(Box::new(store.clone()), &clock, 13);
    first.start();

    clock.advance(20_000);
    let mut second = open(Box::new(store.clone()), &clock, 14);
    assert_eq!(
        second.start(),
        LoadOutcome::Resumed {
            remaining_ms: 40_000
        }
    );
}

#[test]
fn test_file_backed_session_survives_reload() {
    let temp = tempdir().unwrap();
    let storage = StorageConfig::with_root(temp.path().to_path_buf());
    let clock = ManualClock::new(NOW);

    {
        let mut experience = open(Box::new(storage.open_store()), &clock, 15);
        assert_eq!(experience.start(), LoadOutcome::Fresh);
        run_frames(&mut experience, &clock, 25_000);
    }

    let mut reloaded = open(Box::new(storage.open_store()), &clock, 16);
    assert_eq!(
        reloaded.start(),
        LoadOutcome::Resumed {
            remaining_ms: 35_000
        }
    );
    assert!(reloaded.is_persistent());
}
