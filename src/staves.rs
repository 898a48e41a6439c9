//! Staff-notation overlay shown while a progression plays.
//!
//! The overlay is visible only when the user has it switched on *and*
//! playback is active. Every input change while visible redraws the frame.

pub mod render;
pub mod sketch;
pub mod voicing;

pub use render::{renderer_for, EngravedRenderer, NotationMode, NotationRenderer, PlainRenderer, RenderError};
pub use sketch::{Anchor, Shape, Sketch};
pub use voicing::{voicing, Voicing};

use crate::console;

/// Share of the viewport height used by the overlay.
const HEIGHT_FRACTION: f64 = 0.25;

pub struct StavesOverlay {
    renderer: Box<dyn NotationRenderer>,
    fallback: PlainRenderer,
    user_enabled: bool,
    playback_active: bool,
    progression: Vec<String>,
    viewport: (f64, f64),
    frame: Option<Sketch>,
    redraws: u64,
}

impl StavesOverlay {
    pub fn new(renderer: Box<dyn NotationRenderer>) -> Self {
        console::info(format!("[STAVES] using {} notation", renderer.name()));
        Self {
            renderer,
            fallback: PlainRenderer,
            user_enabled: false,
            playback_active: false,
            progression: Vec::new(),
            viewport: (0.0, 0.0),
            frame: None,
            redraws: 0,
        }
    }

    pub fn with_mode(mode: NotationMode) -> Self {
        Self::new(renderer_for(mode))
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    pub fn is_visible(&self) -> bool {
        self.user_enabled && self.playback_active
    }

    pub fn is_user_enabled(&self) -> bool {
        self.user_enabled
    }

    pub fn progression(&self) -> &[String] {
        &self.progression
    }

    /// The current drawing, if visible.
    pub fn frame(&self) -> Option<&Sketch> {
        self.frame.as_ref()
    }

    /// How many frames have been drawn so far.
    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    /// Size of the drawing area: full width, top quarter of the height.
    pub fn area(&self) -> (f64, f64) {
        (self.viewport.0, self.viewport.1 * HEIGHT_FRACTION)
    }

    pub fn user_enable(&mut self) {
        let was = self.is_visible();
        self.user_enabled = true;
        self.visibility_changed(was);
    }

    pub fn user_disable(&mut self) {
        let was = self.is_visible();
        self.user_enabled = false;
        self.visibility_changed(was);
    }

    pub fn set_visible(&mut self, visible: bool) {
        if visible {
            self.user_enable();
        } else {
            self.user_disable();
        }
    }

    pub fn set_playback_active(&mut self, active: bool) {
        let was = self.is_visible();
        self.playback_active = active;
        self.visibility_changed(was);
    }

    fn visibility_changed(&mut self, was: bool) {
        let now = self.is_visible();
        if now == was {
            return;
        }
        console::debug(format!(
            "[STAVES] {} staves (user: {}, playback: {})",
            if now { "showing" } else { "hiding" },
            self.user_enabled,
            self.playback_active
        ));
        self.refresh();
    }

    pub fn display_progression(&mut self, progression: Vec<String>) {
        self.progression = progression;
        self.refresh();
    }

    pub fn clear(&mut self) {
        self.progression.clear();
        self.refresh();
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = (width.max(0.0), height.max(0.0));
        self.refresh();
    }

    fn refresh(&mut self) {
        if self.is_visible() {
            self.redraw();
        } else {
            self.frame = None;
        }
    }

    fn redraw(&mut self) {
        let (w, h) = self.area();
        let sketch = match self.renderer.render(&self.progression, w, h) {
            Ok(s) => s,
            Err(e) => {
                console::debug(format!("[STAVES] {} renderer failed: {}; drawing plain staves", self.renderer.name(), e));
                match self.fallback.render(&self.progression, w, h) {
                    Ok(s) => s,
                    Err(e) => {
                        console::error(format!("[STAVES] cannot draw staves: {}", e));
                        Sketch::new(w, h)
                    }
                }
            }
        };
        self.frame = Some(sketch);
        self.redraws += 1;
    }
}
