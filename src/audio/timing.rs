// --- Tempo helpers (pure, testable) ---

pub const MIN_BPM: f64 = 40.0;
pub const MAX_BPM: f64 = 300.0;
pub const DEFAULT_BPM: f64 = 120.0;

/// Beats per bar; every groove here is 4/4.
pub const BEATS_PER_BAR: f64 = 4.0;

/// Steps per bar in a drum pattern (sixteenth notes).
pub const STEPS_PER_BAR: usize = 16;

pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        return DEFAULT_BPM;
    }
    bpm.clamp(MIN_BPM, MAX_BPM)
}

pub fn seconds_per_beat(bpm: f64) -> f64 {
    60.0 / bpm
}

pub fn beats_to_secs(beats: f64, bpm: f64) -> f64 {
    beats * seconds_per_beat(bpm)
}

pub fn db_to_amplitude(db: f32) -> f32 {
    (10.0_f32).powf(db / 20.0)
}
