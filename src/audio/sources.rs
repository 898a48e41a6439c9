//! Synthesized sources for the drum kit, the metronome click and chords.
//!
//! Each sound is a [`Generator`] (raw waveform) wrapped in [`Shaped`], which
//! applies an amplitude envelope and gain and ends once the release is over.

use std::f32::consts::TAU;
use std::time::Duration;

use rodio::Source;

pub const SAMPLE_RATE: u32 = 44_100;

/// ADSR amplitude envelope, times in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Envelope {
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self { attack, decay, sustain, release }
    }

    fn held_level(&self, t: f32) -> f32 {
        if t < self.attack {
            return t / self.attack.max(f32::EPSILON);
        }
        let t = t - self.attack;
        if t < self.decay {
            return 1.0 - (1.0 - self.sustain) * (t / self.decay.max(f32::EPSILON));
        }
        self.sustain
    }

    /// Level at `t` seconds for a note held `hold` seconds.
    pub fn level(&self, t: f32, hold: f32) -> f32 {
        if t < hold {
            return self.held_level(t);
        }
        let from = self.held_level(hold);
        let r = (t - hold) / self.release.max(f32::EPSILON);
        (from * (1.0 - r)).max(0.0)
    }

    pub fn length(&self, hold: f32) -> f32 {
        hold + self.release
    }
}

/// A raw, unbounded waveform.
pub trait Generator {
    fn next_sample(&mut self, t: f32) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wave {
    Sine,
    Triangle,
    Square,
}

fn wave_at(wave: Wave, phase: f32) -> f32 {
    match wave {
        Wave::Sine => (phase * TAU).sin(),
        Wave::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Wave::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
    }
}

/// Oscillator with an optional exponential pitch drop (membrane kick).
pub struct Osc {
    wave: Wave,
    freq: f32,
    sweep: Option<(f32, f32)>,
    phase: f32,
}

impl Osc {
    pub fn new(wave: Wave, freq: f32) -> Self {
        Self { wave, freq, sweep: None, phase: 0.0 }
    }

    /// Start at `freq * octaves` and fall to `freq` over `pitch_decay` seconds.
    pub fn membrane(freq: f32, octaves: f32, pitch_decay: f32) -> Self {
        Self {
            wave: Wave::Triangle,
            freq,
            sweep: Some((freq * octaves.max(1.0), pitch_decay)),
            phase: 0.0,
        }
    }

    fn freq_at(&self, t: f32) -> f32 {
        match self.sweep {
            Some((start, decay)) if t < decay && decay > 0.0 => {
                start * (self.freq / start).powf(t / decay)
            }
            _ => self.freq,
        }
    }
}

impl Generator for Osc {
    fn next_sample(&mut self, t: f32) -> f32 {
        let s = wave_at(self.wave, self.phase);
        self.phase = (self.phase + self.freq_at(t) / SAMPLE_RATE as f32).fract();
        s
    }
}

// Simple xorshift RNG, enough for white noise.
pub struct Noise {
    state: u64,
}

impl Noise {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }
}

impl Generator for Noise {
    fn next_sample(&mut self, _t: f32) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x as f32 / u64::MAX as f32) * 2.0 - 1.0
    }
}

/// Inharmonic square-wave cluster, a rough stand-in for cymbals.
pub struct Metal {
    freq: f32,
    harmonicity: f32,
    phases: [f32; 6],
}

const METAL_RATIOS: [f32; 6] = [1.0, 1.483, 1.932, 2.546, 2.63, 3.897];

impl Metal {
    pub fn new(freq: f32, harmonicity: f32) -> Self {
        Self { freq, harmonicity, phases: [0.0; 6] }
    }
}

impl Generator for Metal {
    fn next_sample(&mut self, _t: f32) -> f32 {
        let mut out = 0.0;
        for (i, phase) in self.phases.iter_mut().enumerate() {
            out += wave_at(Wave::Square, *phase);
            let ratio = METAL_RATIOS[i] * (self.harmonicity / 5.1).max(0.1);
            *phase = (*phase + self.freq * ratio / SAMPLE_RATE as f32).fract();
        }
        out / METAL_RATIOS.len() as f32
    }
}

/// A generator with an envelope and gain applied; finite.
pub struct Shaped<G: Generator> {
    generator: G,
    envelope: Envelope,
    hold: f32,
    gain: f32,
    index: u64,
    total: u64,
}

impl<G: Generator> Shaped<G> {
    pub fn new(generator: G, envelope: Envelope, hold: Duration, gain: f32) -> Self {
        let hold = hold.as_secs_f32();
        let total = (envelope.length(hold) * SAMPLE_RATE as f32).ceil() as u64;
        Self { generator, envelope, hold, gain, index: 0, total }
    }
}

impl<G: Generator> Iterator for Shaped<G> {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total {
            return None;
        }
        let t = self.index as f32 / SAMPLE_RATE as f32;
        self.index += 1;
        let raw = self.generator.next_sample(t);
        Some(raw * self.envelope.level(t, self.hold) * self.gain)
    }
}

impl<G: Generator> Source for Shaped<G> {
    fn current_frame_len(&self) -> Option<usize> {
        Some((self.total - self.index) as usize)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(self.total as f64 / SAMPLE_RATE as f64))
    }
}
