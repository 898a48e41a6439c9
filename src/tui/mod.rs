//! TUI (Terminal User Interface) for chordcubes.
//!
//! Staves overlay in the top quarter, drum grid with live playhead below it,
//! then log output and the command line. The event loop is also the host loop
//! that pumps the transport clock.

mod input;
mod widgets;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::console::{self, Level};
use crate::session::{Output, Session};

pub use input::InputLine;
pub use widgets::{PatternGrid, StavesCanvas};

/// Sketch units per terminal cell, used to size the overlay viewport.
const CELL_WIDTH: f64 = 10.0;
const CELL_HEIGHT: f64 = 24.0;
const MAX_MESSAGES: usize = 50;

struct Message {
    text: String,
    level: Level,
}

pub struct TuiApp {
    session: Session,
    input: InputLine,
    messages: Vec<Message>,
    console: console::Subscription,
    viewport: (u16, u16),
    should_quit: bool,
}

impl TuiApp {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            input: InputLine::new(),
            messages: Vec::new(),
            console: console::subscribe(),
            viewport: (0, 0),
            should_quit: false,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        self.session.transport_mut().stop();
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let tick = Duration::from_millis(25);
        let mut last = Instant::now();

        loop {
            self.session.tick();

            for log in self.console.drain() {
                self.msg(log.text, log.level);
            }

            let size = terminal.size()?;
            if (size.width, size.height) != self.viewport {
                self.viewport = (size.width, size.height);
                self.session.overlay_mut().resize(
                    f64::from(size.width) * CELL_WIDTH,
                    f64::from(size.height) * CELL_HEIGHT,
                );
            }

            terminal.draw(|f| self.render(f))?;

            let timeout = tick.saturating_sub(last.elapsed());
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key.code, key.modifiers);
                }
            }
            if last.elapsed() >= tick {
                last = Instant::now();
            }

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, mods: KeyModifiers) {
        if mods.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('c') | KeyCode::Char('d') = code {
                self.should_quit = true;
            }
            return;
        }

        match code {
            KeyCode::Enter => {
                let line = self.input.submit();
                if !line.trim().is_empty() {
                    self.execute(&line);
                }
            }
            KeyCode::Char(c) => self.input.insert(c),
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Delete => self.input.delete(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Up => self.input.history_prev(),
            KeyCode::Down => self.input.history_next(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            KeyCode::Tab => {
                let options = self.input.complete();
                if !options.is_empty() {
                    self.msg(options.join("  "), Level::Info);
                }
            }
            KeyCode::Esc => self.input.clear(),
            _ => {}
        }
    }

    fn execute(&mut self, line: &str) {
        self.msg(format!("› {}", line), Level::Debug);
        match self.session.handle_line(line) {
            Ok(Output::Quit) => self.should_quit = true,
            Ok(Output::Text(t)) => {
                for l in t.lines() {
                    self.msg(l.to_string(), Level::Info);
                }
            }
            Ok(Output::None) => {}
            Err(e) => self.msg(format!("error: {}", e), Level::Error),
        }
    }

    fn msg(&mut self, text: String, level: Level) {
        self.messages.push(Message { text, level });
        if self.messages.len() > MAX_MESSAGES {
            self.messages.remove(0);
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(ratatui::widgets::Clear, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Ratio(1, 4), // Staves
                Constraint::Length(1),   // Header
                Constraint::Length(7),   // Drum grid
                Constraint::Min(3),      // Messages
                Constraint::Length(3),   // Input
            ])
            .split(area);

        self.render_staves(frame, chunks[0]);
        self.render_header(frame, chunks[1]);
        self.render_grid(frame, chunks[2]);
        self.render_messages(frame, chunks[3]);
        self.render_input(frame, chunks[4]);
    }

    fn render_staves(&self, frame: &mut Frame, area: Rect) {
        let overlay = self.session.overlay();
        let block = Block::default()
            .title(format!(" Staves ({}) ", overlay.renderer_name()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(60, 60, 60)));
        match overlay.frame() {
            Some(sketch) => frame.render_widget(StavesCanvas::new(sketch).block(block), area),
            None => {
                let hint = if overlay.is_user_enabled() {
                    "staves appear while playing"
                } else {
                    "staves off (type: staves on)"
                };
                frame.render_widget(
                    Paragraph::new(Line::styled(hint, Style::default().fg(Color::DarkGray))).block(block),
                    area,
                );
            }
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let transport = self.session.transport();
        let state = transport.state();
        let play = if state.playing {
            Span::styled(" ▶ ", Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            Span::styled(" ■ ", Style::default().fg(Color::DarkGray).bg(Color::Rgb(40, 40, 40)))
        };
        let flag = |name: &'static str, on: bool| {
            let style = if on { Style::default().fg(Color::Yellow) } else { Style::default().fg(Color::DarkGray) };
            Span::styled(name, style)
        };
        let step = transport
            .current_step()
            .map(|s| format!("step {:>2}/16", s + 1))
            .unwrap_or_else(|| "step  -/16".to_string());

        let line = Line::from(vec![
            Span::styled(" CHORDCUBES ", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            play,
            Span::raw("  "),
            Span::styled(format!("{} BPM", state.bpm), Style::default().fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled(step, Style::default().fg(Color::DarkGray)),
            Span::raw("  "),
            flag("DRUMS", state.drums),
            Span::raw(" "),
            flag("CLICK", state.metronome),
            Span::raw(" "),
            flag("BASS", state.lock_bass),
            Span::raw(" "),
            flag("MELODY", state.lock_melody),
            Span::styled(
                format!("  audio {}", transport.context_state()),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_grid(&self, frame: &mut Frame, area: Rect) {
        let transport = self.session.transport();
        let state = transport.state();
        let block = Block::default()
            .title(" Drums ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(60, 60, 60)));
        let grid = PatternGrid::new(state.style)
            .enabled(state.drums)
            .playhead(transport.current_step())
            .block(block);
        frame.render_widget(grid, area);
    }

    fn render_messages(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Output ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(60, 60, 60)));
        let max_lines = block.inner(area).height as usize;

        let mut lines: Vec<Line> = self
            .messages
            .iter()
            .rev()
            .take(max_lines)
            .map(|m| {
                let style = match m.level {
                    Level::Error => Style::default().fg(Color::Red),
                    Level::Warn => Style::default().fg(Color::Yellow),
                    Level::Info => Style::default().fg(Color::Gray),
                    Level::Debug => Style::default().fg(Color::DarkGray),
                };
                Line::styled(m.text.as_str(), style)
            })
            .collect();
        lines.reverse();

        frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Command ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(60, 60, 60)));
        let inner = block.inner(area);
        let prompt = "› ";
        let prompt_width = 2usize;

        // Scroll horizontally so the cursor stays visible. Counted in chars.
        let buf: Vec<char> = self.input.value().chars().collect();
        let cursor = self.input.cursor();
        let max_width = (inner.width as usize).saturating_sub(prompt_width);
        let start = cursor.saturating_sub(max_width);
        let end = (start + max_width).min(buf.len());
        let visible: String = buf[start..end].iter().collect();

        let line = Line::from(vec![
            Span::styled(prompt, Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
            Span::raw(visible),
        ]);
        frame.render_widget(Paragraph::new(line).block(block), area);

        if inner.width > 0 && inner.height > 0 {
            let x = inner.x + prompt_width as u16 + (cursor - start) as u16;
            frame.set_cursor_position((x.min(inner.x + inner.width - 1), inner.y));
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

pub fn run(session: Session) -> Result<()> {
    TuiApp::new(session).run()
}
