//! Resolution-independent drawing produced by the notation renderers.
//!
//! Coordinates start at the top-left corner with `y` growing downwards, in
//! the same units as the overlay's viewport.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
    /// A filled note with its accidental (negative for flats).
    Notehead { x: f64, y: f64, accidental: i8 },
    Text { x: f64, y: f64, text: String, anchor: Anchor },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sketch {
    pub width: f64,
    pub height: f64,
    pub shapes: Vec<Shape>,
}

impl Sketch {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, shapes: Vec::new() }
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.shapes.push(Shape::Line { x1, y1, x2, y2 });
    }

    pub fn notehead(&mut self, x: f64, y: f64, accidental: i8) {
        self.shapes.push(Shape::Notehead { x, y, accidental });
    }

    pub fn text(&mut self, x: f64, y: f64, text: impl Into<String>, anchor: Anchor) {
        self.shapes.push(Shape::Text { x, y, text: text.into(), anchor });
    }

    pub fn lines(&self) -> impl Iterator<Item = (f64, f64, f64, f64)> + '_ {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Line { x1, y1, x2, y2 } => Some((*x1, *y1, *x2, *y2)),
            _ => None,
        })
    }

    pub fn noteheads(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Notehead { x, y, .. } => Some((*x, *y)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Position of the first text shape equal to `text`.
    pub fn find_text(&self, text: &str) -> Option<(f64, f64)> {
        self.shapes.iter().find_map(|s| match s {
            Shape::Text { x, y, text: t, .. } if t == text => Some((*x, *y)),
            _ => None,
        })
    }
}
