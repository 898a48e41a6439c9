mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chordcubes::audio::{
    AudioContext, AudioError, AudioGateway, ContextProvider, ContextState, RetryPolicy,
};
use chordcubes::patterns::{hits, Drum, Style};
use chordcubes::transport::Transport;

use common::{gateway, ManualContext, Recorder, RecordingFactory};

struct Rig {
    ctx: Arc<ManualContext>,
    log: Arc<Recorder>,
    transport: Transport,
}

fn rig_with(factory: RecordingFactory) -> Rig {
    let ctx = Arc::new(ManualContext::default());
    let (gw, _) = gateway(ctx.clone());
    let log = factory.log.clone();
    let transport = Transport::new(gw, Arc::new(factory)).with_lookahead(Duration::ZERO);
    Rig { ctx, log, transport }
}

fn rig() -> Rig {
    rig_with(RecordingFactory::default())
}

fn events_in(style: Style) -> usize {
    style.pattern().iter().map(|(_, steps)| hits(steps).count()).sum()
}

#[test]
fn rock_bar_fires_every_hit_at_its_step_time() {
    let mut r = rig();
    r.transport.toggle_drums();
    r.transport.start();
    assert!(r.transport.is_playing());
    assert_eq!(r.transport.scheduled_events(), events_in(Style::Rock));

    // 120 bpm: one bar is 2s, a sixteenth 0.125s
    r.ctx.set_time(2.0);
    r.transport.tick();

    let kicks: Vec<f64> = r.log.hits().iter().filter(|h| h.voice == "kick").map(|h| h.at).collect();
    assert_eq!(kicks, vec![0.0, 0.5, 1.0, 1.5]);
    assert_eq!(r.log.count("snare"), 4);
    assert_eq!(r.log.count("hihat"), 12);
    assert_eq!(r.log.count("crash"), 1);

    let kick = r.log.hits().into_iter().find(|h| h.voice == "kick").unwrap();
    assert_eq!(kick.notes, vec!["C1"]);
    assert!((kick.duration - 0.25).abs() < 1e-9);
    let snare = r.log.hits().into_iter().find(|h| h.voice == "snare").unwrap();
    assert!(snare.notes.is_empty());
    assert!((snare.duration - 0.125).abs() < 1e-9);
}

#[test]
fn hits_arrive_in_time_order() {
    let mut r = rig();
    r.transport.toggle_drums();
    r.transport.start();
    r.ctx.set_time(4.0);
    r.transport.tick();
    let times: Vec<f64> = r.log.hits().iter().map(|h| h.at).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]), "{:?}", times);
}

#[test]
fn lookahead_queues_hits_before_they_are_due() {
    let ctx = Arc::new(ManualContext::default());
    let (gw, _) = gateway(ctx.clone());
    let factory = RecordingFactory::default();
    let log = factory.log.clone();
    let mut transport = Transport::new(gw, Arc::new(factory));
    transport.toggle_drums();
    transport.start();
    log.clear();

    ctx.set_time(0.45);
    transport.tick();
    // the 0.5s kick is handed over 50ms early, with its own time
    assert!(log.hits().iter().any(|h| h.voice == "kick" && h.at == 0.5));
}

#[test]
fn stop_cancels_everything() {
    let mut r = rig();
    r.transport.toggle_drums();
    r.transport.toggle_metronome();
    r.transport.start();
    r.transport.stop();
    assert!(!r.transport.is_playing());
    assert_eq!(r.transport.scheduled_events(), 0);

    r.ctx.set_time(10.0);
    assert_eq!(r.transport.tick(), 0);
    assert!(r.log.hits().is_empty());
}

#[test]
fn style_change_while_playing_reschedules() {
    let mut r = rig();
    r.transport.toggle_drums();
    r.transport.start();
    r.transport.set_style(Style::Jazz);
    assert!(r.transport.is_playing());
    assert_eq!(r.transport.style(), Style::Jazz);
    assert_eq!(r.transport.scheduled_events(), events_in(Style::Jazz));

    r.ctx.set_time(2.0);
    r.transport.tick();
    assert!(r.log.count("ride") > 0);
    assert_eq!(r.log.count("crash"), 0);
}

#[test]
fn toggles_while_stopped_only_change_flags() {
    let mut r = rig();
    assert!(r.transport.toggle_drums());
    assert!(r.transport.toggle_metronome());
    r.transport.set_style(Style::Funk);
    assert!(!r.transport.is_playing());
    assert_eq!(r.transport.scheduled_events(), 0);
    assert!(!r.transport.toggle_drums());
}

#[test]
fn toggling_drums_while_playing_restarts() {
    let mut r = rig();
    r.transport.start();
    assert_eq!(r.transport.scheduled_events(), 0);
    r.transport.toggle_drums();
    assert!(r.transport.is_playing());
    assert_eq!(r.transport.scheduled_events(), events_in(Style::Rock));
    r.transport.toggle_metronome();
    assert_eq!(r.transport.scheduled_events(), events_in(Style::Rock) + 1);
}

#[test]
fn metronome_clicks_each_quarter() {
    let mut r = rig();
    r.transport.toggle_metronome();
    r.transport.start();
    r.ctx.set_time(2.0);
    r.transport.tick();
    let clicks: Vec<_> = r.log.hits().into_iter().filter(|h| h.voice == "click").collect();
    assert_eq!(clicks.iter().map(|h| h.at).collect::<Vec<_>>(), vec![0.0, 0.5, 1.0, 1.5]);
    assert_eq!(clicks[0].notes, vec!["C5"]);
    assert!((clicks[0].duration - 0.0625).abs() < 1e-9);
}

#[test]
fn bpm_is_clamped() {
    let mut r = rig();
    for (v, want) in [
        (-5.0, 40.0),
        (0.0, 40.0),
        (39.9, 40.0),
        (40.0, 40.0),
        (97.5, 97.5),
        (300.0, 300.0),
        (301.0, 300.0),
        (1e9, 300.0),
    ] {
        assert_eq!(r.transport.set_bpm(v), want);
        assert_eq!(r.transport.bpm(), want);
    }
}

#[test]
fn tempo_change_keeps_the_beat_continuous() {
    let mut r = rig();
    r.transport.toggle_metronome();
    r.transport.start();
    r.ctx.set_time(1.0);
    r.transport.tick();
    r.transport.set_bpm(60.0);
    assert!(r.transport.is_playing());
    r.ctx.set_time(3.0);
    r.transport.tick();
    let clicks: Vec<f64> = r.log.hits().iter().filter(|h| h.voice == "click").map(|h| h.at).collect();
    assert_eq!(clicks, vec![0.0, 0.5, 1.0, 2.0]);
}

#[test]
fn missing_voice_skips_only_that_instrument() {
    let mut r = rig_with(RecordingFactory { missing: vec![Drum::Snare], ..Default::default() });
    r.transport.toggle_drums();
    r.transport.start();
    assert!(!r.transport.kit_instruments().contains(&Drum::Snare));
    assert_eq!(r.transport.scheduled_events(), events_in(Style::Rock) - 4);
    r.ctx.set_time(2.0);
    r.transport.tick();
    assert_eq!(r.log.count("snare"), 0);
    assert_eq!(r.log.count("kick"), 4);
}

#[test]
fn failing_voice_stays_scheduled() {
    let mut r = rig_with(RecordingFactory { failing: vec![Drum::Kick], ..Default::default() });
    r.transport.toggle_drums();
    r.transport.start();
    r.ctx.set_time(4.0);
    r.transport.tick();
    assert_eq!(r.log.count("kick"), 8);
    assert_eq!(r.transport.scheduled_events(), events_in(Style::Rock));
}

#[test]
fn locked_audio_still_plays_silently() {
    let mut r = rig();
    r.ctx.lock();
    r.transport.toggle_drums();
    r.transport.start();
    assert!(r.transport.is_playing());
    assert_eq!(r.transport.context_state(), ContextState::Pending);
    assert!(!r.transport.ensure_audio());
}

#[test]
fn locks_are_plain_flags() {
    let mut r = rig();
    assert!(!r.transport.is_lock_bass_enabled());
    assert!(r.transport.toggle_lock_bass());
    assert!(r.transport.is_lock_bass_enabled());
    assert!(r.transport.toggle_lock_melody());
    assert!(!r.transport.toggle_lock_melody());
    assert_eq!(r.transport.scheduled_events(), 0);
}

#[test]
fn chord_plays_now_on_poly_voice() {
    let mut r = rig();
    r.ctx.set_time(1.25);
    r.transport
        .play_chord(&["C4", "E4", "G4"], Duration::from_millis(500))
        .expect("chord");
    let hits = r.log.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].voice, "poly");
    assert_eq!(hits[0].notes, vec!["C4", "E4", "G4"]);
    assert_eq!(hits[0].at, 1.25);
    assert!((hits[0].duration - 0.5).abs() < 1e-9);
}

#[test]
fn chord_with_bad_pitch_is_an_error() {
    let mut r = rig();
    let err = r.transport.play_chord(&["C4", "H2"], Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, AudioError::Pitch(_)));
    assert!(r.log.hits().is_empty());
}

/// Backend that is still loading on the first acquire.
struct LateBackend {
    ctx: Arc<ManualContext>,
    failed_once: AtomicBool,
}

impl ContextProvider for LateBackend {
    fn acquire(&self) -> Result<Arc<dyn AudioContext>, AudioError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(AudioError::Unavailable("backend loading".into()));
        }
        Ok(self.ctx.clone())
    }
}

#[test]
fn late_audio_context_keeps_the_beat() {
    let ctx = Arc::new(ManualContext::default());
    let backend = LateBackend { ctx: ctx.clone(), failed_once: AtomicBool::new(false) };
    let gw = AudioGateway::new(backend)
        .with_retry(RetryPolicy { attempts: 1, delay: Duration::from_millis(1) })
        .with_unlock_delay(Duration::from_millis(1));
    let factory = RecordingFactory::default();
    let log = factory.log.clone();
    let mut transport = Transport::new(Arc::new(gw), Arc::new(factory)).with_lookahead(Duration::ZERO);
    transport.toggle_metronome();

    // started on the fallback clock, well past its zero
    std::thread::sleep(Duration::from_millis(300));
    transport.start();
    assert!(transport.is_playing());
    assert_eq!(transport.context_state(), ContextState::Uninitialized);

    assert!(transport.ensure_audio());
    assert_eq!(transport.context_state(), ContextState::Running);

    ctx.set_time(0.9);
    transport.tick();
    let clicks: Vec<f64> = log.hits().iter().filter(|h| h.voice == "click").map(|h| h.at).collect();
    assert_eq!(clicks.len(), 2, "{:?}", clicks);
    assert!(clicks[0] <= 0.0 && clicks[0] > -0.1, "{:?}", clicks);
    assert!((clicks[1] - clicks[0] - 0.5).abs() < 1e-9);
}
