//! Custom TUI widgets: the drum grid and the staves canvas.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Line,
    widgets::{
        canvas::{Canvas, Circle, Line as CanvasLine},
        Block, Widget,
    },
};

use crate::audio::timing::STEPS_PER_BAR;
use crate::patterns::Style as DrumStyle;
use crate::staves::{Anchor, Shape, Sketch};

/// The active style's 16-step grid with the playhead column.
pub struct PatternGrid<'a> {
    style: DrumStyle,
    enabled: bool,
    playhead: Option<usize>,
    block: Option<Block<'a>>,
}

impl<'a> PatternGrid<'a> {
    pub fn new(style: DrumStyle) -> Self {
        Self { style, enabled: true, playhead: None, block: None }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Dim the grid when drums are off.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn playhead(mut self, step: Option<usize>) -> Self {
        self.playhead = step;
        self
    }
}

impl Widget for PatternGrid<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let PatternGrid { style, enabled, playhead, block } = self;
        let mut area = area;
        if let Some(block) = block {
            let inner = block.inner(area);
            block.render(area, buf);
            area = inner;
        }
        if area.height < 1 {
            return;
        }

        let col_name = 10u16;
        // one cell per step plus a gap per beat
        let grid_width = (STEPS_PER_BAR + STEPS_PER_BAR / 4) as u16;
        let dim = Style::default().fg(Color::DarkGray);
        if area.width < col_name + grid_width {
            buf.set_string(area.x, area.y, "terminal too narrow for the drum grid", dim);
            return;
        }
        let step_x = |step: usize| area.x + col_name + (step + step / 4) as u16;

        // header: beat numbers
        buf.set_string(area.x, area.y, format!("{:<10}", style.name()), Style::default().fg(Color::Magenta));
        for beat in 0..STEPS_PER_BAR / 4 {
            buf.set_string(step_x(beat * 4), area.y, format!("{}", beat + 1), dim);
        }

        for (row, (drum, steps)) in style.pattern().iter().enumerate() {
            let y = area.y + 1 + row as u16;
            if y >= area.y + area.height {
                break;
            }
            let name_style = if enabled { Style::default().fg(Color::White) } else { dim };
            buf.set_string(area.x, y, format!("{:<10}", drum.name()), name_style);

            for (step, hit) in steps.iter().enumerate() {
                let is_playhead = playhead == Some(step);
                let (ch, base) = if *hit == 1 {
                    ('●', if enabled { Style::default().fg(Color::Cyan) } else { dim })
                } else {
                    ('·', dim)
                };
                let style = if is_playhead {
                    base.bg(Color::Rgb(50, 50, 50)).add_modifier(Modifier::BOLD)
                } else {
                    base
                };
                buf[(step_x(step), y)].set_char(ch).set_style(style);
            }
        }
    }
}

/// Paints a notation [`Sketch`] onto a braille canvas.
pub struct StavesCanvas<'a> {
    sketch: &'a Sketch,
    block: Option<Block<'a>>,
}

impl<'a> StavesCanvas<'a> {
    pub fn new(sketch: &'a Sketch) -> Self {
        Self { sketch, block: None }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for StavesCanvas<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let sketch = self.sketch;
        let (w, h) = (sketch.width.max(1.0), sketch.height.max(1.0));
        let inner = self.block.as_ref().map(|b| b.inner(area)).unwrap_or(area);
        // sketch units per terminal column, for centring text
        let unit = w / f64::from(inner.width.max(1));

        let mut canvas = Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([0.0, w])
            .y_bounds([0.0, h])
            .paint(move |ctx| {
                for shape in &sketch.shapes {
                    match shape {
                        Shape::Line { x1, y1, x2, y2 } => ctx.draw(&CanvasLine {
                            x1: *x1,
                            y1: h - y1,
                            x2: *x2,
                            y2: h - y2,
                            color: Color::Gray,
                        }),
                        Shape::Notehead { x, y, .. } => ctx.draw(&Circle {
                            x: *x,
                            y: h - y,
                            radius: 3.0,
                            color: Color::White,
                        }),
                        Shape::Text { .. } => {}
                    }
                }
                ctx.layer();
                for shape in &sketch.shapes {
                    match shape {
                        Shape::Text { x, y, text, anchor } => {
                            let x = match anchor {
                                Anchor::Start => *x,
                                Anchor::Middle => x - text.chars().count() as f64 * unit / 2.0,
                            };
                            ctx.print(x.max(0.0), h - y, Line::styled(text.clone(), Style::default().fg(Color::Yellow)));
                        }
                        Shape::Notehead { x, y, accidental } if *accidental != 0 => {
                            let mark = if *accidental < 0 { "♭" } else { "♯" };
                            ctx.print((x - 2.0 * unit).max(0.0), h - y, mark);
                        }
                        _ => {}
                    }
                }
            });
        if let Some(block) = self.block {
            canvas = canvas.block(block);
        }
        canvas.render(area, buf);
    }
}
