//! Playback state and drum/metronome scheduling.
//!
//! The transport owns the clock and the session's voices. It is driven by the
//! host loop: state changes come in through the public methods, and
//! [`Transport::tick`] pumps the clock once per frame.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::pitch::parse_pitches;
use crate::audio::timing::{clamp_bpm, DEFAULT_BPM, STEPS_PER_BAR};
use crate::audio::{AudioError, AudioGateway, ContextState, Pitch, Voice, VoiceFactory};
use crate::clock::{BeatTime, ClockEvent, TransportClock};
use crate::console;
use crate::patterns::{hits, Drum, Style};

/// How far ahead of the audio clock events are handed to voices.
pub const DEFAULT_LOOKAHEAD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub bpm: f64,
    pub playing: bool,
    pub drums: bool,
    pub metronome: bool,
    pub style: Style,
    pub lock_bass: bool,
    pub lock_melody: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            playing: false,
            drums: false,
            metronome: false,
            style: Style::Rock,
            lock_bass: false,
            lock_melody: false,
        }
    }
}

/// Note and length each drum is struck with.
fn drum_hit(drum: Drum) -> (Option<Pitch>, BeatTime) {
    match drum {
        Drum::Kick => (Some(Pitch::natural('C', 1)), BeatTime::note(8)),
        Drum::Snare | Drum::Hihat | Drum::OpenHihat => (None, BeatTime::note(16)),
        Drum::Crash | Drum::Ride => (None, BeatTime::note(4)),
    }
}

const CLICK_PITCH: Pitch = Pitch::natural('C', 5);

fn report_hit(what: &str, result: Result<(), AudioError>) {
    match result {
        Ok(()) => {}
        // No running context: silence, not an error worth shouting about.
        Err(AudioError::NotRunning) => console::debug(format!("[TRANSPORT] {} muted: audio not running", what)),
        Err(e) => console::error(format!("[TRANSPORT] error playing {}: {}", what, e)),
    }
}

pub struct Transport {
    gateway: Arc<AudioGateway>,
    factory: Arc<dyn VoiceFactory>,
    clock: TransportClock,
    state: PlaybackState,
    kit: HashMap<Drum, Arc<dyn Voice>>,
    click: Option<Arc<dyn Voice>>,
    poly: Option<Arc<dyn Voice>>,
    initialized: bool,
    lookahead: Duration,
}

impl Transport {
    pub fn new(gateway: Arc<AudioGateway>, factory: Arc<dyn VoiceFactory>) -> Self {
        Self {
            gateway,
            factory,
            clock: TransportClock::new(DEFAULT_BPM),
            state: PlaybackState::default(),
            kit: HashMap::new(),
            click: None,
            poly: None,
            initialized: false,
            lookahead: DEFAULT_LOOKAHEAD,
        }
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    pub fn bpm(&self) -> f64 {
        self.state.bpm
    }

    pub fn style(&self) -> Style {
        self.state.style
    }

    pub fn gateway(&self) -> &Arc<AudioGateway> {
        &self.gateway
    }

    /// Number of events currently registered on the clock.
    pub fn scheduled_events(&self) -> usize {
        self.clock.pending()
    }

    /// Instruments that got a voice during initialization.
    pub fn kit_instruments(&self) -> Vec<Drum> {
        Drum::ALL.into_iter().filter(|d| self.kit.contains_key(d)).collect()
    }

    /// Step (0..16) under the playhead, while playing.
    pub fn current_step(&self) -> Option<usize> {
        if !self.state.playing {
            return None;
        }
        let beat = self.clock.position(self.gateway.current_time());
        let step = (beat * 4.0).floor().max(0.0) as usize;
        Some(step % STEPS_PER_BAR)
    }

    /// Create voices once. Failures for single instruments are logged and
    /// skipped; the rest of the kit still works.
    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        console::info("[TRANSPORT] initializing voices");
        for drum in Drum::ALL {
            match self.factory.drum(drum) {
                Ok(voice) => {
                    self.kit.insert(drum, voice);
                }
                Err(e) => console::error(format!("[TRANSPORT] no voice for {}: {}", drum, e)),
            }
        }
        match self.factory.click() {
            Ok(v) => self.click = Some(v),
            Err(e) => console::error(format!("[TRANSPORT] no metronome voice: {}", e)),
        }
        match self.factory.poly() {
            Ok(v) => self.poly = Some(v),
            Err(e) => console::error(format!("[TRANSPORT] no chord voice: {}", e)),
        }
        self.clock.set_bpm(self.state.bpm, self.gateway.current_time());
        self.initialized = true;
    }

    /// Make sure audio can sound. `false` means playback will be silent.
    ///
    /// The first acquired context brings its own clock; a transport that was
    /// already running on the fallback clock is carried over to it.
    pub fn ensure_audio(&mut self) -> bool {
        let acquired_before = self.gateway.state() != ContextState::Uninitialized;
        let before = self.gateway.current_time();
        let ok = self.gateway.ensure_started();
        if !acquired_before && self.gateway.state() != ContextState::Uninitialized {
            let shift = self.gateway.current_time() - before;
            self.clock.rebase(shift);
            console::debug(format!("[TRANSPORT] moved to audio clock ({:+.3}s)", shift));
        }
        if !ok {
            console::warn("[TRANSPORT] audio context not running; playback will be silent");
        }
        ok
    }

    pub fn context_state(&self) -> ContextState {
        self.gateway.state()
    }

    pub fn start(&mut self) {
        console::info("[TRANSPORT] starting playback");
        self.ensure_audio();
        self.initialize();

        self.clock.cancel_all();
        if self.state.drums {
            self.schedule_drums();
        }
        if self.state.metronome {
            self.schedule_metronome();
        }
        self.clock.start(self.gateway.current_time());
        self.state.playing = true;
        console::debug(format!("[TRANSPORT] {} events scheduled", self.clock.pending()));
    }

    pub fn stop(&mut self) {
        console::info("[TRANSPORT] stopping playback");
        self.clock.stop();
        self.clock.cancel_all();
        self.state.playing = false;
    }

    fn restart_if_playing(&mut self) {
        if self.state.playing {
            self.stop();
            self.start();
        }
    }

    fn schedule_drums(&mut self) {
        let style = self.state.style;
        for (drum, steps) in style.pattern() {
            let Some(voice) = self.kit.get(drum) else {
                console::warn(format!("[TRANSPORT] skipping {}: no voice", drum));
                continue;
            };
            let (note, length) = drum_hit(*drum);
            for step in hits(steps) {
                let voice = voice.clone();
                let drum = *drum;
                let notes: Vec<Pitch> = note.into_iter().collect();
                let callback = Box::new(move |ev: ClockEvent| {
                    report_hit(drum.name(), voice.trigger(&notes, length.to_secs(ev.bpm), ev.time));
                });
                if let Err(e) = self.clock.schedule_repeat(
                    callback,
                    BeatTime::bars(1.0),
                    BeatTime::sixteenths(step as f64),
                ) {
                    console::error(format!("[TRANSPORT] could not schedule {} step {}: {}", drum, step, e));
                }
            }
        }
    }

    fn schedule_metronome(&mut self) {
        let Some(click) = self.click.clone() else {
            console::warn("[TRANSPORT] metronome enabled but no click voice");
            return;
        };
        let length = BeatTime::note(32);
        let callback = Box::new(move |ev: ClockEvent| {
            report_hit("metronome", click.trigger(&[CLICK_PITCH], length.to_secs(ev.bpm), ev.time));
        });
        if let Err(e) = self.clock.schedule_repeat(callback, BeatTime::note(4), BeatTime(0.0)) {
            console::error(format!("[TRANSPORT] could not schedule metronome: {}", e));
        }
    }

    /// Hand every event due within the lookahead window to its voice.
    pub fn tick(&mut self) -> usize {
        if !self.state.playing {
            return 0;
        }
        let until = self.gateway.current_time() + self.lookahead.as_secs_f64();
        self.clock.advance(until)
    }

    pub fn set_bpm(&mut self, bpm: f64) -> f64 {
        self.state.bpm = clamp_bpm(bpm);
        self.clock.set_bpm(self.state.bpm, self.gateway.current_time());
        console::info(format!("[TRANSPORT] bpm set to {}", self.state.bpm));
        self.state.bpm
    }

    pub fn set_style(&mut self, style: Style) {
        self.state.style = style;
        console::info(format!("[TRANSPORT] style changed to {}", style));
        self.restart_if_playing();
    }

    pub fn toggle_drums(&mut self) -> bool {
        self.state.drums = !self.state.drums;
        console::info(format!("[TRANSPORT] drums {}", if self.state.drums { "on" } else { "off" }));
        self.restart_if_playing();
        self.state.drums
    }

    pub fn toggle_metronome(&mut self) -> bool {
        self.state.metronome = !self.state.metronome;
        console::info(format!(
            "[TRANSPORT] metronome {}",
            if self.state.metronome { "on" } else { "off" }
        ));
        self.restart_if_playing();
        self.state.metronome
    }

    pub fn toggle_lock_bass(&mut self) -> bool {
        self.state.lock_bass = !self.state.lock_bass;
        self.state.lock_bass
    }

    pub fn toggle_lock_melody(&mut self) -> bool {
        self.state.lock_melody = !self.state.lock_melody;
        self.state.lock_melody
    }

    pub fn is_lock_bass_enabled(&self) -> bool {
        self.state.lock_bass
    }

    pub fn is_lock_melody_enabled(&self) -> bool {
        self.state.lock_melody
    }

    /// Play pitches right now on the chord voice. Bad pitch names are an
    /// error; a silent audio context is not.
    pub fn play_chord<S: AsRef<str>>(&mut self, notes: &[S], duration: Duration) -> Result<(), AudioError> {
        let pitches = parse_pitches(notes)?;
        self.ensure_audio();
        self.initialize();
        let Some(poly) = self.poly.clone() else {
            return Err(AudioError::Voice("no chord voice available".into()));
        };
        let at = self.gateway.current_time();
        match poly.trigger(&pitches, duration.as_secs_f64(), at) {
            Err(AudioError::NotRunning) => {
                console::warn("[TRANSPORT] chord not played: audio not running");
                Ok(())
            }
            other => other,
        }
    }
}
