//! The session's voices: a synthesized drum kit, a metronome click and a
//! small polyphonic synth for chords. All of them play through the gateway.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::pitch::Pitch;
use super::sources::{Envelope, Metal, Noise, Osc, Shaped, Wave};
use super::timing::db_to_amplitude;
use super::{AudioError, AudioGateway, BoxedSource, Voice, VoiceFactory};
use crate::patterns::Drum;

/// Kick pitch when the caller does not name one.
const KICK_FREQ: f32 = 32.70; // C1

#[derive(Debug, Clone, Copy, PartialEq)]
enum Body {
    Membrane { octaves: f32, pitch_decay: f32 },
    Noise,
    Metal { freq: f32, harmonicity: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DrumTone {
    body: Body,
    envelope: Envelope,
    volume_db: f32,
}

fn drum_tone(drum: Drum) -> DrumTone {
    match drum {
        Drum::Kick => DrumTone {
            body: Body::Membrane { octaves: 10.0, pitch_decay: 0.05 },
            envelope: Envelope::new(0.001, 0.4, 0.01, 1.4),
            volume_db: -10.0,
        },
        Drum::Snare => DrumTone {
            body: Body::Noise,
            envelope: Envelope::new(0.001, 0.2, 0.0, 0.1),
            volume_db: -12.0,
        },
        Drum::Hihat => DrumTone {
            body: Body::Noise,
            envelope: Envelope::new(0.001, 0.1, 0.0, 0.05),
            volume_db: -20.0,
        },
        Drum::OpenHihat => DrumTone {
            body: Body::Noise,
            envelope: Envelope::new(0.001, 0.3, 0.0, 0.1),
            volume_db: -18.0,
        },
        Drum::Crash => DrumTone {
            body: Body::Metal { freq: 800.0, harmonicity: 5.1 },
            envelope: Envelope::new(0.001, 1.4, 0.0, 0.2),
            volume_db: -16.0,
        },
        Drum::Ride => DrumTone {
            body: Body::Metal { freq: 500.0, harmonicity: 3.5 },
            envelope: Envelope::new(0.001, 0.8, 0.0, 0.4),
            volume_db: -18.0,
        },
    }
}

static NOISE_SEED: AtomicU64 = AtomicU64::new(0x9e37_79b9);

fn hold(duration: f64) -> Duration {
    Duration::from_secs_f64(duration.max(0.0))
}

struct DrumVoice {
    gateway: Arc<AudioGateway>,
    tone: DrumTone,
}

impl DrumVoice {
    fn source(&self, notes: &[Pitch], duration: f64) -> BoxedSource {
        let gain = db_to_amplitude(self.tone.volume_db);
        let env = self.tone.envelope;
        match self.tone.body {
            Body::Membrane { octaves, pitch_decay } => {
                let freq = notes.first().map(|p| p.freq_hz()).unwrap_or(KICK_FREQ);
                Box::new(Shaped::new(Osc::membrane(freq, octaves, pitch_decay), env, hold(duration), gain))
            }
            Body::Noise => {
                let seed = NOISE_SEED.fetch_add(0x2545_f491, Ordering::Relaxed);
                Box::new(Shaped::new(Noise::new(seed), env, hold(duration), gain))
            }
            Body::Metal { freq, harmonicity } => {
                Box::new(Shaped::new(Metal::new(freq, harmonicity), env, hold(duration), gain))
            }
        }
    }
}

impl Voice for DrumVoice {
    fn trigger(&self, notes: &[Pitch], duration: f64, at: f64) -> Result<(), AudioError> {
        self.gateway.play(self.source(notes, duration), at)
    }
}

struct ToneVoice {
    gateway: Arc<AudioGateway>,
    wave: Wave,
    envelope: Envelope,
    gain: f32,
}

impl Voice for ToneVoice {
    fn trigger(&self, notes: &[Pitch], duration: f64, at: f64) -> Result<(), AudioError> {
        if notes.is_empty() {
            return Err(AudioError::Voice("tonal voice needs at least one note".into()));
        }
        // Keep stacked chords out of clipping.
        let per_note = self.gain / notes.len() as f32;
        for pitch in notes {
            let src = Shaped::new(Osc::new(self.wave, pitch.freq_hz()), self.envelope, hold(duration), per_note);
            self.gateway.play(Box::new(src), at)?;
        }
        Ok(())
    }
}

/// Voice factory backed by the in-crate synthesized sources.
pub struct SynthFactory {
    gateway: Arc<AudioGateway>,
}

impl SynthFactory {
    pub fn new(gateway: Arc<AudioGateway>) -> Self {
        Self { gateway }
    }
}

impl VoiceFactory for SynthFactory {
    fn drum(&self, drum: Drum) -> Result<Arc<dyn Voice>, AudioError> {
        Ok(Arc::new(DrumVoice { gateway: self.gateway.clone(), tone: drum_tone(drum) }))
    }

    fn click(&self) -> Result<Arc<dyn Voice>, AudioError> {
        Ok(Arc::new(ToneVoice {
            gateway: self.gateway.clone(),
            wave: Wave::Sine,
            envelope: Envelope::new(0.001, 0.1, 0.0, 0.1),
            gain: db_to_amplitude(-20.0),
        }))
    }

    fn poly(&self) -> Result<Arc<dyn Voice>, AudioError> {
        Ok(Arc::new(ToneVoice {
            gateway: self.gateway.clone(),
            wave: Wave::Triangle,
            envelope: Envelope::new(0.005, 0.1, 0.3, 1.0),
            gain: 0.7,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioContext, ContextProvider, ContextState};
    use rodio::Source;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        played: Mutex<Vec<(f64, Option<Duration>)>>,
    }

    impl AudioContext for Recorder {
        fn state(&self) -> ContextState {
            ContextState::Running
        }
        fn start(&self) -> Result<(), AudioError> {
            Ok(())
        }
        fn resume(&self) -> Result<(), AudioError> {
            Ok(())
        }
        fn play_silent_tone(&self) -> Result<(), AudioError> {
            Ok(())
        }
        fn current_time(&self) -> f64 {
            0.0
        }
        fn play(&self, source: BoxedSource, at: f64) -> Result<(), AudioError> {
            self.played.lock().unwrap().push((at, source.total_duration()));
            Ok(())
        }
    }

    struct Shared(Arc<Recorder>);

    impl ContextProvider for Shared {
        fn acquire(&self) -> Result<Arc<dyn AudioContext>, AudioError> {
            Ok(self.0.clone())
        }
    }

    fn factory() -> (SynthFactory, Arc<Recorder>) {
        let rec = Arc::new(Recorder::default());
        let gw = Arc::new(AudioGateway::new(Shared(rec.clone())));
        assert!(gw.ensure_started());
        (SynthFactory::new(gw), rec)
    }

    #[test]
    fn drum_hits_play_at_the_requested_time() {
        let (f, rec) = factory();
        let snare = f.drum(Drum::Snare).unwrap();
        snare.trigger(&[], 0.125, 3.5).unwrap();
        let played = rec.played.lock().unwrap();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].0, 3.5);
    }

    #[test]
    fn chord_plays_one_source_per_note() {
        let (f, rec) = factory();
        let poly = f.poly().unwrap();
        let notes: Vec<Pitch> = ["C4", "E4", "G4"].iter().map(|n| n.parse().unwrap()).collect();
        poly.trigger(&notes, 2.0, 0.0).unwrap();
        let played = rec.played.lock().unwrap();
        assert_eq!(played.len(), 3);
        // 2s hold + 1s release
        let d = played[0].1.unwrap().as_secs_f64();
        assert!((d - 3.0).abs() < 0.01, "duration was {}", d);
    }

    #[test]
    fn tonal_voice_rejects_empty_chord() {
        let (f, _) = factory();
        assert!(matches!(f.click().unwrap().trigger(&[], 0.1, 0.0), Err(AudioError::Voice(_))));
    }

    #[test]
    fn kick_is_the_loudest_drum() {
        let kick = drum_tone(Drum::Kick).volume_db;
        assert!(Drum::ALL.iter().all(|d| drum_tone(*d).volume_db <= kick));
    }
}
