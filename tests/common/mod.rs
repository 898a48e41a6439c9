//! Test doubles shared by the integration tests: an audio context whose
//! clock the test moves by hand, and a voice factory that records hits.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chordcubes::audio::{
    AudioContext, AudioError, AudioGateway, BoxedSource, ContextProvider, ContextState, Pitch,
    RetryPolicy, Voice, VoiceFactory,
};
use chordcubes::patterns::Drum;

#[derive(Default)]
pub struct ManualContext {
    time: Mutex<f64>,
    running: AtomicBool,
    /// When set, `start` and `resume` fail.
    locked: AtomicBool,
    pub played: Mutex<Vec<f64>>,
}

impl ManualContext {
    pub fn set_time(&self, t: f64) {
        *self.time.lock().unwrap() = t;
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }
}

impl AudioContext for ManualContext {
    fn state(&self) -> ContextState {
        if self.running.load(Ordering::SeqCst) {
            ContextState::Running
        } else {
            ContextState::Pending
        }
    }

    fn start(&self) -> Result<(), AudioError> {
        if self.locked.load(Ordering::SeqCst) {
            return Err(AudioError::NotAllowed("locked".into()));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&self) -> Result<(), AudioError> {
        self.start()
    }

    fn play_silent_tone(&self) -> Result<(), AudioError> {
        Ok(())
    }

    fn current_time(&self) -> f64 {
        *self.time.lock().unwrap()
    }

    fn play(&self, _source: BoxedSource, at: f64) -> Result<(), AudioError> {
        self.played.lock().unwrap().push(at);
        Ok(())
    }
}

/// Hands out one shared context and counts how often it was asked.
pub struct CountingProvider {
    pub ctx: Arc<ManualContext>,
    pub acquired: Arc<AtomicUsize>,
    pub delay: Duration,
}

impl ContextProvider for CountingProvider {
    fn acquire(&self) -> Result<Arc<dyn AudioContext>, AudioError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(self.ctx.clone())
    }
}

pub fn gateway(ctx: Arc<ManualContext>) -> (Arc<AudioGateway>, Arc<AtomicUsize>) {
    let acquired = Arc::new(AtomicUsize::new(0));
    let provider = CountingProvider { ctx, acquired: acquired.clone(), delay: Duration::ZERO };
    let gw = AudioGateway::new(provider)
        .with_retry(RetryPolicy { attempts: 2, delay: Duration::from_millis(1) })
        .with_unlock_delay(Duration::from_millis(1));
    (Arc::new(gw), acquired)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub voice: String,
    pub notes: Vec<String>,
    pub duration: f64,
    pub at: f64,
}

#[derive(Default)]
pub struct Recorder {
    pub hits: Mutex<Vec<Hit>>,
}

impl Recorder {
    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn count(&self, voice: &str) -> usize {
        self.hits().iter().filter(|h| h.voice == voice).count()
    }

    pub fn clear(&self) {
        self.hits.lock().unwrap().clear();
    }
}

struct RecordingVoice {
    name: String,
    log: Arc<Recorder>,
    fail: bool,
}

impl Voice for RecordingVoice {
    fn trigger(&self, notes: &[Pitch], duration: f64, at: f64) -> Result<(), AudioError> {
        self.log.hits.lock().unwrap().push(Hit {
            voice: self.name.clone(),
            notes: notes.iter().map(|p| p.to_string()).collect(),
            duration,
            at,
        });
        if self.fail {
            return Err(AudioError::Voice(format!("{} broke", self.name)));
        }
        Ok(())
    }
}

/// Voice factory that records every trigger. Instruments in `missing` fail
/// to build; instruments in `failing` build but error on every hit.
#[derive(Default)]
pub struct RecordingFactory {
    pub log: Arc<Recorder>,
    pub missing: Vec<Drum>,
    pub failing: Vec<Drum>,
}

impl VoiceFactory for RecordingFactory {
    fn drum(&self, drum: Drum) -> Result<Arc<dyn Voice>, AudioError> {
        if self.missing.contains(&drum) {
            return Err(AudioError::Voice(format!("no {}", drum)));
        }
        Ok(Arc::new(RecordingVoice {
            name: drum.name().to_string(),
            log: self.log.clone(),
            fail: self.failing.contains(&drum),
        }))
    }

    fn click(&self) -> Result<Arc<dyn Voice>, AudioError> {
        Ok(Arc::new(RecordingVoice { name: "click".into(), log: self.log.clone(), fail: false }))
    }

    fn poly(&self) -> Result<Arc<dyn Voice>, AudioError> {
        Ok(Arc::new(RecordingVoice { name: "poly".into(), log: self.log.clone(), fail: false }))
    }
}
