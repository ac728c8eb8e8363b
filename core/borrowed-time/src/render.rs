//! Plain-text rendering of a [`SceneView`].
//!
//! Each frame becomes a short block of lines. The interactive loop only
//! redraws when the block differs from the previous one, so a steady
//! countdown prints once per second.

use std::io::{self, Write};

use borrowed_time_core::{MediaView, SceneView};

pub const LANDING_TITLE: &str = "Borrowed Time";
pub const LANDING_BODY: &str = "After you enter, you will have 60 seconds to reminisce. \
     Click or tap anywhere to reveal drifting verses. When the minute ends, \
     the world remains, changed by absence.";
pub const LANDING_FOOTER: &str = "Minimal motion. Sound optional.";

pub fn landing() -> String {
    format!("{LANDING_TITLE}\n\n{LANDING_BODY}\n\n{LANDING_FOOTER}\n")
}

pub fn frame(view: &SceneView) -> String {
    let Some(scene) = view.scene else {
        return String::new();
    };

    let mut lines = Vec::new();
    lines.push(format!("[{scene}] {}", media_line(view.media.as_ref())));

    if let Some(countdown) = &view.countdown {
        lines.push(countdown.clone());
    }
    if let Some(intro) = view.intro {
        lines.push(intro.to_string());
    }
    if view.fade_overlay {
        lines.push("...".to_string());
    }
    if let Some(epitaph) = &view.epitaph {
        lines.push(epitaph.title.to_string());
        lines.push(epitaph.subtitle.to_string());
    } else if let Some(hint) = view.hint {
        lines.push(format!("({hint})"));
    }
    for note in &view.notes {
        lines.push(format!(
            "  {} @ ({:.0}, {:.0}) {}",
            note.text, note.position.x, note.position.y, note.color
        ));
    }
    if let Some(second_chance) = view.second_chance {
        lines.push(second_chance.to_string());
    }

    lines.join("\n")
}

/// Writes a frame only when it differs from the last one written.
#[derive(Debug, Default)]
pub struct Redraw {
    last: String,
}

impl Redraw {
    pub fn draw(&mut self, out: &mut impl Write, view: &SceneView) -> io::Result<bool> {
        let text = frame(view);
        if text == self.last {
            return Ok(false);
        }
        if !text.is_empty() {
            writeln!(out, "{text}\n")?;
            out.flush()?;
        }
        self.last = text;
        Ok(true)
    }
}

fn media_line(media: Option<&MediaView>) -> String {
    match media {
        Some(MediaView::Video { src, label }) => format!("{label}: video {src}"),
        Some(MediaView::Image { src, alt }) => format!("{alt}: image {src}"),
        Some(MediaView::Fallback(backdrop)) => format!(
            "backdrop {} / {} / {}",
            backdrop.top, backdrop.middle, backdrop.bottom
        ),
        None => String::new(),
    }
}
