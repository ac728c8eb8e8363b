//! Presentation state derived from the session.
//!
//! The scene controller owns no lifecycle. It maps the session status, the
//! reduced-motion preference, and a couple of overlay flags onto a
//! [`SceneView`] that a renderer can draw as-is. The only state it keeps is a
//! per-scene media error flag: once a scene's media fails to load or play, that
//! scene falls back to a static gradient backdrop for the rest of the process.

use crate::notes::Note;
use crate::session::SessionStatus;

pub const INTRO_TEXT: &str = "You have 60 seconds with this world.";
pub const SERENE_HINT: &str = "Click or tap to reveal lines";
pub const EPITAPH_TITLE: &str = "Your time here has passed.";
pub const EPITAPH_SUBTITLE: &str = "The place remains, changed by absence.";
pub const SECOND_CHANCE_TEXT: &str = "I guess, some do get a  second chance. Use it wisely now.";
pub const SECOND_CHANCE_ANNOUNCEMENT: &str = "Second chance loading";
pub const TIME_EXPIRED_ANNOUNCEMENT: &str = "Time expired";
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

const VIDEO_EXTENSIONS: [&str; 2] = [".mp4", ".webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scene {
    Serene,
    Ruins,
}

impl Scene {
    pub fn id(&self) -> &'static str {
        match self {
            Scene::Serene => "serene",
            Scene::Ruins => "ruins",
        }
    }

    pub fn media_label(&self) -> &'static str {
        match self {
            Scene::Serene => "Serene scene background",
            Scene::Ruins => "Ruins scene background",
        }
    }

    pub fn backdrop(&self) -> Backdrop {
        match self {
            // emerald-900 → emerald-800 → slate-900
            Scene::Serene => Backdrop {
                top: "#064e3b",
                middle: "#065f46",
                bottom: "#0f172a",
            },
            // stone-900 → zinc-900 → black
            Scene::Ruins => Backdrop {
                top: "#1c1917",
                middle: "#18181b",
                bottom: "#000000",
            },
        }
    }
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Vertical three-stop gradient used when media is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backdrop {
    pub top: &'static str,
    pub middle: &'static str,
    pub bottom: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// `.mp4` and `.webm` (any case) are video; everything else is an image.
    pub fn classify(src: &str) -> Self {
        let lower = src.to_ascii_lowercase();
        if VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaView {
    /// Muted, looping, inline autoplay.
    Video { src: String, label: &'static str },
    Image { src: String, alt: &'static str },
    Fallback(Backdrop),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epitaph {
    pub title: &'static str,
    pub subtitle: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneView {
    /// None before the session has been loaded.
    pub scene: Option<Scene>,
    pub media: Option<MediaView>,
    /// `Time left: Ns` while Active.
    pub countdown: Option<String>,
    /// Polite live-region text for the timer.
    pub status_announcement: String,
    pub hint: Option<&'static str>,
    pub intro: Option<&'static str>,
    pub epitaph: Option<Epitaph>,
    pub fade_overlay: bool,
    pub second_chance: Option<&'static str>,
    pub notes: Vec<Note>,
    pub note_announcement: String,
    pub reduced_motion: bool,
}

/// Everything the controller needs to render one frame.
#[derive(Debug, Clone, Copy)]
pub struct SceneInputs<'a> {
    pub status: SessionStatus,
    pub reduced_motion: bool,
    pub intro_visible: bool,
    pub second_chance: bool,
    pub notes: &'a [Note],
    pub note_announcement: &'a str,
}

#[derive(Debug, Clone)]
pub struct SceneController {
    serene_src: String,
    ruins_src: String,
    serene_errored: bool,
    ruins_errored: bool,
}

impl SceneController {
    pub fn new(serene_src: impl Into<String>, ruins_src: impl Into<String>) -> Self {
        Self {
            serene_src: serene_src.into(),
            ruins_src: ruins_src.into(),
            serene_errored: false,
            ruins_errored: false,
        }
    }

    /// Records a load or playback failure for a scene's media.
    pub fn report_media_error(&mut self, scene: Scene) {
        match scene {
            Scene::Serene => self.serene_errored = true,
            Scene::Ruins => self.ruins_errored = true,
        }
        tracing::warn!(scene = %scene, "Scene media failed; using static backdrop");
    }

    pub fn media_errored(&self, scene: Scene) -> bool {
        match scene {
            Scene::Serene => self.serene_errored,
            Scene::Ruins => self.ruins_errored,
        }
    }

    /// Serene while Active or Fading (the fade plays over the serene scene),
    /// Ruins once Expired.
    pub fn scene_for(status: SessionStatus) -> Option<Scene> {
        match status {
            SessionStatus::Uninitialized => None,
            SessionStatus::Active { .. } | SessionStatus::Fading => Some(Scene::Serene),
            SessionStatus::Expired => Some(Scene::Ruins),
        }
    }

    pub fn media_for(&self, scene: Scene) -> MediaView {
        if self.media_errored(scene) {
            return MediaView::Fallback(scene.backdrop());
        }
        let src = match scene {
            Scene::Serene => &self.serene_src,
            Scene::Ruins => &self.ruins_src,
        };
        match MediaKind::classify(src) {
            MediaKind::Video => MediaView::Video {
                src: src.clone(),
                label: scene.media_label(),
            },
            MediaKind::Image => MediaView::Image {
                src: if src.is_empty() {
                    PLACEHOLDER_IMAGE.to_string()
                } else {
                    src.clone()
                },
                alt: scene.media_label(),
            },
        }
    }

    pub fn render(&self, inputs: SceneInputs<'_>) -> SceneView {
        let scene = Self::scene_for(inputs.status);
        let active_remaining = match inputs.status {
            SessionStatus::Active { remaining_ms } => Some(remaining_ms),
            _ => None,
        };

        let status_announcement = match (inputs.status, active_remaining) {
            (_, Some(remaining)) => format!("Time left {}", format_seconds(remaining)),
            (SessionStatus::Uninitialized, None) => String::new(),
            _ => TIME_EXPIRED_ANNOUNCEMENT.to_string(),
        };

        let hint = match inputs.status {
            SessionStatus::Active { .. } => Some(SERENE_HINT),
            SessionStatus::Expired => Some(EPITAPH_TITLE),
            SessionStatus::Uninitialized | SessionStatus::Fading => None,
        };

        SceneView {
            scene,
            media: scene.map(|s| self.media_for(s)),
            countdown: active_remaining.map(|ms| format!("Time left: {}", format_seconds(ms))),
            status_announcement,
            hint,
            intro: (active_remaining.is_some() && inputs.intro_visible).then_some(INTRO_TEXT),
            epitaph: inputs.status.is_expired().then_some(Epitaph {
                title: EPITAPH_TITLE,
                subtitle: EPITAPH_SUBTITLE,
            }),
            fade_overlay: matches!(inputs.status, SessionStatus::Fading),
            second_chance: inputs.second_chance.then_some(SECOND_CHANCE_TEXT),
            notes: inputs.notes.to_vec(),
            note_announcement: inputs.note_announcement.to_string(),
            reduced_motion: inputs.reduced_motion,
        }
    }
}

/// Whole seconds remaining, rounded up, never negative: `"60s"`, `"1s"`, `"0s"`.
pub fn format_seconds(ms: u64) -> String {
    format!("{}s", ms.div_ceil(1000))
}
