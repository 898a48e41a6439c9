//! Notation renderers: an engraved one that places real noteheads, and a
//! plain one that only draws staff lines and a text summary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::sketch::{Anchor, Sketch};
use super::voicing::{voicing, Voicing};
use crate::audio::Pitch;
use crate::console;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("viewport {width}x{height} is too small for engraved staves")]
    Viewport { width: f64, height: f64 },
    #[error("cannot place {symbol}: {reason}")]
    Placement { symbol: String, reason: String },
    #[error("unknown notation mode '{0}' (expected auto, engraved or plain)")]
    Mode(String),
}

pub trait NotationRenderer: Send {
    fn name(&self) -> &'static str;

    /// Draw `progression` into a `width` x `height` area.
    fn render(&self, progression: &[String], width: f64, height: f64) -> Result<Sketch, RenderError>;
}

/// Which renderer the overlay uses. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotationMode {
    #[default]
    Auto,
    Engraved,
    Plain,
}

impl FromStr for NotationMode {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(NotationMode::Auto),
            "engraved" => Ok(NotationMode::Engraved),
            "plain" => Ok(NotationMode::Plain),
            other => Err(RenderError::Mode(other.to_string())),
        }
    }
}

impl fmt::Display for NotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotationMode::Auto => "auto",
            NotationMode::Engraved => "engraved",
            NotationMode::Plain => "plain",
        })
    }
}

pub fn renderer_for(mode: NotationMode) -> Box<dyn NotationRenderer> {
    match mode {
        NotationMode::Auto | NotationMode::Engraved => Box::new(EngravedRenderer),
        NotationMode::Plain => Box::new(PlainRenderer),
    }
}

const STAFF_X: f64 = 20.0;
const LINE_GAP: f64 = 10.0;
const TREBLE_TOP: f64 = 30.0;
const BASS_FROM_BOTTOM: f64 = 80.0;
/// Half a line gap: one diatonic step.
const STEP: f64 = LINE_GAP / 2.0;
const MAX_LEDGER_STEPS: i32 = 12;

const MIN_WIDTH: f64 = 120.0;
const MIN_HEIGHT: f64 = 160.0;

#[derive(Debug, Clone, Copy)]
struct Staff {
    top: f64,
    /// Pitch on the top line.
    top_pitch: Pitch,
}

impl Staff {
    fn bottom(&self) -> f64 {
        self.top + 4.0 * LINE_GAP
    }

    /// Vertical position of `pitch`, or `None` if it would need too many
    /// ledger lines.
    fn place(&self, pitch: &Pitch) -> Option<f64> {
        let steps = self.top_pitch.diatonic_index() - pitch.diatonic_index();
        if !(-MAX_LEDGER_STEPS..=8 + MAX_LEDGER_STEPS).contains(&steps) {
            return None;
        }
        Some(self.top + steps as f64 * STEP)
    }

    fn draw(&self, sketch: &mut Sketch, width: f64) {
        for k in 0..5 {
            let y = self.top + k as f64 * LINE_GAP;
            sketch.line(STAFF_X, y, STAFF_X + width, y);
        }
    }

    fn ledgers(&self, sketch: &mut Sketch, x: f64, y: f64) {
        let mut ly = self.top - LINE_GAP;
        while ly >= y - 0.01 {
            sketch.line(x - 7.0, ly, x + 7.0, ly);
            ly -= LINE_GAP;
        }
        let mut ly = self.bottom() + LINE_GAP;
        while ly <= y + 0.01 {
            sketch.line(x - 7.0, ly, x + 7.0, ly);
            ly += LINE_GAP;
        }
    }
}

/// Places the voicing of every chord on a grand staff.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngravedRenderer;

impl EngravedRenderer {
    fn staves(height: f64) -> (Staff, Staff) {
        (
            Staff { top: TREBLE_TOP, top_pitch: Pitch::natural('F', 5) },
            Staff { top: height - BASS_FROM_BOTTOM, top_pitch: Pitch::natural('A', 3) },
        )
    }

    /// Noteheads for one chord. Either every note is placed or none is.
    fn draw_chord(
        sketch: &mut Sketch,
        v: &Voicing,
        x: f64,
        treble: &Staff,
        bass: &Staff,
    ) -> Result<(), RenderError> {
        let fail = |reason: String| RenderError::Placement { symbol: v.symbol.to_string(), reason };

        let mut heads = Vec::with_capacity(v.treble.len() + 1);
        let len = v.treble.len() as f64;
        for (k, name) in v.treble.iter().enumerate() {
            let pitch: Pitch = name.parse().map_err(|e| fail(format!("{}", e)))?;
            let y = treble
                .place(&pitch)
                .ok_or_else(|| fail(format!("{} is out of treble range", pitch)))?;
            heads.push((treble, x + k as f64 * 12.0 - len * 6.0, y, pitch));
        }
        let pitch: Pitch = v.bass.parse().map_err(|e| fail(format!("{}", e)))?;
        let y = bass
            .place(&pitch)
            .ok_or_else(|| fail(format!("{} is out of bass range", pitch)))?;
        heads.push((bass, x, y, pitch));

        for (staff, hx, hy, pitch) in heads {
            staff.ledgers(sketch, hx, hy);
            sketch.notehead(hx, hy, pitch.accidental());
        }
        Ok(())
    }
}

impl NotationRenderer for EngravedRenderer {
    fn name(&self) -> &'static str {
        "engraved"
    }

    fn render(&self, progression: &[String], width: f64, height: f64) -> Result<Sketch, RenderError> {
        if width < MIN_WIDTH || height < MIN_HEIGHT {
            return Err(RenderError::Viewport { width, height });
        }
        let mut sketch = Sketch::new(width, height);
        let (treble, bass) = Self::staves(height);
        let staff_width = width - 2.0 * STAFF_X;

        treble.draw(&mut sketch, staff_width);
        bass.draw(&mut sketch, staff_width);
        sketch.text(STAFF_X + 2.0, treble.top + 2.0 * LINE_GAP, "𝄞", Anchor::Start);
        sketch.text(STAFF_X + 2.0, bass.top + 2.0 * LINE_GAP, "𝄢", Anchor::Start);
        sketch.text(STAFF_X + 16.0, treble.top + 2.0 * LINE_GAP, "4/4", Anchor::Start);
        sketch.text(STAFF_X + 16.0, bass.top + 2.0 * LINE_GAP, "4/4", Anchor::Start);

        if progression.is_empty() {
            sketch.text(width / 2.0, height / 2.0, "Playing Progression...", Anchor::Middle);
            return Ok(sketch);
        }

        let voicings: Vec<&Voicing> = progression.iter().map(|s| voicing(s)).collect();
        Self::draw_progression(&mut sketch, progression, &voicings, width, &treble, &bass);
        Ok(sketch)
    }
}

impl EngravedRenderer {
    /// Chords and their labels. A chord that cannot be placed gets fixed
    /// noteheads on staff lines instead; the rest are unaffected.
    fn draw_progression(
        sketch: &mut Sketch,
        labels: &[String],
        voicings: &[&Voicing],
        width: f64,
        treble: &Staff,
        bass: &Staff,
    ) {
        let spacing = f64::min(100.0, (width - 100.0) / labels.len().max(1) as f64);
        for (i, (label, v)) in labels.iter().zip(voicings).enumerate() {
            let x = 60.0 + i as f64 * spacing;
            if let Err(e) = Self::draw_chord(sketch, v, x, treble, bass) {
                console::warn(format!("[STAVES] error drawing chord {} ({}): {}", i, label, e));
                Self::draw_simplified(sketch, x, treble, bass);
            }
            sketch.text(x, treble.top - 30.0, label.as_str(), Anchor::Middle);
        }
    }

    fn draw_simplified(sketch: &mut Sketch, x: f64, treble: &Staff, bass: &Staff) {
        sketch.notehead(x - 8.0, treble.top + 2.0 * LINE_GAP, 0);
        sketch.notehead(x + 8.0, treble.top + LINE_GAP, 0);
        sketch.notehead(x, bass.top + 3.0 * LINE_GAP, 0);
    }
}

/// Staff lines and a one-line summary. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

pub const PLAIN_HEADER: &str = "Musical Staves (notation engine not available)";

impl NotationRenderer for PlainRenderer {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn render(&self, progression: &[String], width: f64, height: f64) -> Result<Sketch, RenderError> {
        let mut sketch = Sketch::new(width, height);
        for k in 0..5 {
            let y = 40.0 + k as f64 * 8.0;
            sketch.line(20.0, y, width - 20.0, y);
        }
        for k in 0..5 {
            let y = height - 80.0 + k as f64 * 8.0;
            sketch.line(20.0, y, width - 20.0, y);
        }
        sketch.text(30.0, 20.0, PLAIN_HEADER, Anchor::Start);
        let summary = if progression.is_empty() {
            "Waiting for progression...".to_string()
        } else {
            format!("Playing: {}", progression.join(" - "))
        };
        sketch.text(width / 2.0, height / 2.0, summary, Anchor::Middle);
        Ok(sketch)
    }
}
