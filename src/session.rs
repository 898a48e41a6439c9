//! Application root: builds the gateway, voices, transport and overlay once,
//! and turns text commands into calls on them.
//!
//! Both front-ends (REPL and TUI) drive a `Session` from a single thread:
//! `handle_line` for user input, `tick` once per frame.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::audio::{AudioGateway, ContextState, RodioProvider, SynthFactory, VoiceFactory};
use crate::config::Config;
use crate::console;
use crate::patterns::{render_steps, Style};
use crate::staves::{voicing, StavesOverlay};
use crate::transport::Transport;

const DEFAULT_CHORD_SECS: f64 = 1.0;
const MAX_CHORD_SECS: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Stop,
    Bpm(f64),
    Style(Style),
    Styles,
    Drums,
    Metronome,
    LockBass,
    LockMelody,
    Chord { notes: Vec<String>, duration: Duration },
    Progression(Vec<String>),
    Staves(bool),
    Clear,
    Audio,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let words = shlex::split(line.trim()).ok_or_else(|| anyhow!("unbalanced quotes"))?;
        let Some((cmd, args)) = words.split_first() else {
            return Ok(None);
        };
        let cmd = match cmd.to_ascii_lowercase().as_str() {
            "play" | "start" => Command::Play,
            "stop" => Command::Stop,
            "bpm" | "tempo" => {
                let Some(v) = args.first() else {
                    bail!("usage: bpm <number>");
                };
                let bpm: f64 = v.parse().with_context(|| format!("not a number: {}", v))?;
                Command::Bpm(bpm)
            }
            "style" => {
                let Some(name) = args.first() else {
                    bail!("usage: style <name>  (see: styles)");
                };
                Command::Style(name.parse().map_err(|e| anyhow!("{}", e))?)
            }
            "styles" => Command::Styles,
            "drums" => Command::Drums,
            "metronome" | "click" => Command::Metronome,
            "lock" => match args.first().map(|s| s.as_str()) {
                Some("bass") => Command::LockBass,
                Some("melody") => Command::LockMelody,
                _ => bail!("usage: lock bass|melody"),
            },
            "chord" => parse_chord(args)?,
            "progression" | "prog" => {
                if args.is_empty() {
                    bail!("usage: progression <symbol>...  e.g. progression I V vi IV");
                }
                Command::Progression(args.to_vec())
            }
            "staves" => match args.first().map(|s| s.as_str()) {
                Some("on") => Command::Staves(true),
                Some("off") => Command::Staves(false),
                _ => bail!("usage: staves on|off"),
            },
            "clear" => Command::Clear,
            "audio" => Command::Audio,
            "status" => Command::Status,
            "help" | "?" | ":help" => Command::Help,
            "quit" | "exit" | ":q" | ":quit" => Command::Quit,
            other => bail!("unknown command '{}'. Try help", other),
        };
        Ok(Some(cmd))
    }
}

fn parse_chord(args: &[String]) -> Result<Command> {
    let mut notes = Vec::new();
    let mut secs = DEFAULT_CHORD_SECS;
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == "--dur" {
            let v = it.next().ok_or_else(|| anyhow!("usage: chord <pitch>... [--dur <secs>]"))?;
            secs = v.parse().with_context(|| format!("not a duration: {}", v))?;
            if !(secs > 0.0) || !secs.is_finite() {
                bail!("duration must be positive");
            }
            if secs > MAX_CHORD_SECS {
                bail!("duration must be at most {} seconds", MAX_CHORD_SECS);
            }
        } else {
            notes.push(a.clone());
        }
    }
    if notes.is_empty() {
        bail!("usage: chord <pitch>... [--dur <secs>]");
    }
    Ok(Command::Chord { notes, duration: Duration::from_secs_f64(secs) })
}

/// First words of every command, for completion.
pub const COMMAND_WORDS: &[&str] = &[
    "play", "stop", "bpm", "style", "styles", "drums", "metronome", "lock", "chord",
    "progression", "staves", "clear", "audio", "status", "help", "quit",
];

/// Result of a command, for the front-end to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    None,
    Text(String),
    Quit,
}

pub const HELP: &str = "\
Commands:
  play / stop             Start or stop the transport
  bpm <n>                 Set tempo (clamped to 40..300)
  style <name>            Drum style (see: styles)
  styles                  List drum styles with their grids
  drums                   Toggle drum pattern
  metronome               Toggle metronome click
  lock bass|melody        Toggle bass / melody lock
  chord <pitch>... [--dur <secs>]
                          Play pitches now, e.g. chord C4 E4 G4
  progression <sym>...    Show a progression, e.g. progression I V vi IV
  staves on|off           Show or hide the notation overlay
  clear                   Clear the progression
  audio                   Try to unlock audio and show its state
  status                  Show playback state
  help                    Show this help
  quit                    Exit";

pub struct Session {
    transport: Transport,
    overlay: StavesOverlay,
}

impl Session {
    /// A session on the default output device.
    pub fn new(config: &Config) -> Result<Self> {
        let gateway = Arc::new(
            AudioGateway::new(RodioProvider::default())
                .with_retry(config.retry_policy())
                .with_unlock_delay(config.unlock_delay()),
        );
        let voices: Arc<dyn VoiceFactory> = Arc::new(SynthFactory::new(gateway.clone()));
        Self::with_parts(gateway, voices, config)
    }

    /// A session on caller-supplied audio parts.
    pub fn with_parts(
        gateway: Arc<AudioGateway>,
        voices: Arc<dyn VoiceFactory>,
        config: &Config,
    ) -> Result<Self> {
        let mut transport = Transport::new(gateway, voices).with_lookahead(config.lookahead());
        transport.set_bpm(config.initial_bpm());
        transport.set_style(config.initial_style()?);
        if config.drums {
            transport.toggle_drums();
        }
        if config.metronome {
            transport.toggle_metronome();
        }
        let overlay = StavesOverlay::with_mode(config.notation);
        Ok(Self { transport, overlay })
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    pub fn overlay(&self) -> &StavesOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut StavesOverlay {
        &mut self.overlay
    }

    pub fn tick(&mut self) -> usize {
        self.transport.tick()
    }

    pub fn handle_line(&mut self, line: &str) -> Result<Output> {
        match Command::parse(line)? {
            Some(cmd) => self.apply(cmd),
            None => Ok(Output::None),
        }
    }

    pub fn apply(&mut self, cmd: Command) -> Result<Output> {
        let text = match cmd {
            Command::Play => {
                self.transport.start();
                self.overlay.set_playback_active(true);
                let audio = self.transport.context_state();
                if audio == ContextState::Running {
                    "playing".to_string()
                } else {
                    format!("playing (silent: audio {})", audio)
                }
            }
            Command::Stop => {
                self.transport.stop();
                self.overlay.set_playback_active(false);
                "stopped".to_string()
            }
            Command::Bpm(v) => format!("bpm set to {}", self.transport.set_bpm(v)),
            Command::Style(style) => {
                self.transport.set_style(style);
                format!("style set to {}", style)
            }
            Command::Styles => styles_listing(self.transport.style()),
            Command::Drums => on_off("drums", self.transport.toggle_drums()),
            Command::Metronome => on_off("metronome", self.transport.toggle_metronome()),
            Command::LockBass => on_off("bass lock", self.transport.toggle_lock_bass()),
            Command::LockMelody => on_off("melody lock", self.transport.toggle_lock_melody()),
            Command::Chord { notes, duration } => {
                self.transport.play_chord(&notes, duration)?;
                format!("chord {}", notes.join(" "))
            }
            Command::Progression(symbols) => {
                let unknown: Vec<&str> = symbols
                    .iter()
                    .map(|s| s.as_str())
                    .filter(|s| !crate::staves::voicing::is_known(s))
                    .collect();
                if !unknown.is_empty() {
                    console::warn(format!("[STAVES] unknown chord symbols drawn as I: {}", unknown.join(", ")));
                }
                let text = format!("progression: {}", symbols.join(" - "));
                self.overlay.display_progression(symbols);
                text
            }
            Command::Staves(on) => {
                self.overlay.set_visible(on);
                match (on, self.overlay.is_visible()) {
                    (true, false) => "staves on (shown while playing)".to_string(),
                    (true, true) => "staves on".to_string(),
                    (false, _) => "staves off".to_string(),
                }
            }
            Command::Clear => {
                self.overlay.clear();
                "progression cleared".to_string()
            }
            Command::Audio => {
                let ok = self.transport.ensure_audio();
                let state = self.transport.context_state();
                if ok {
                    format!("audio: {}", state)
                } else {
                    format!("audio: {} (could not start output)", state)
                }
            }
            Command::Status => self.status(),
            Command::Help => HELP.to_string(),
            Command::Quit => {
                self.transport.stop();
                return Ok(Output::Quit);
            }
        };
        Ok(Output::Text(text))
    }

    pub fn status(&self) -> String {
        let s = self.transport.state();
        let staves = match (self.overlay.is_user_enabled(), self.overlay.is_visible()) {
            (false, _) => "off",
            (true, false) => "on (hidden)",
            (true, true) => "on",
        };
        format!(
            "{} | bpm {} | style {} | drums {} | metronome {} | lock bass {} | lock melody {} | audio {} | staves {}",
            if s.playing { "playing" } else { "stopped" },
            s.bpm,
            s.style,
            flag(s.drums),
            flag(s.metronome),
            flag(s.lock_bass),
            flag(s.lock_melody),
            self.transport.context_state(),
            staves,
        )
    }
}

fn flag(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn on_off(what: &str, on: bool) -> String {
    format!("{} {}", what, flag(on))
}

/// Every style's grid, the current one marked.
pub fn styles_listing(current: Style) -> String {
    let mut out = Vec::new();
    for style in Style::ALL {
        let mark = if style == current { "*" } else { " " };
        out.push(format!("{} {}", mark, style));
        for (drum, steps) in style.pattern() {
            out.push(format!("    {:<10} {}", drum.name(), render_steps(steps)));
        }
    }
    out.join("\n")
}

/// Voicing of each symbol, one per line.
pub fn voicing_listing<S: AsRef<str>>(symbols: &[S]) -> String {
    symbols
        .iter()
        .map(|s| {
            let v = voicing(s.as_ref());
            let note = if v.symbol == s.as_ref() { "" } else { "  (unknown, using I)" };
            format!("{:<5} treble {:<16} bass {}{}", s.as_ref(), v.treble.join(" "), v.bass, note)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
