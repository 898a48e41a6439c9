//! Musical time notation, in beats (4/4).
//!
//! - `"2m"`: bars
//! - `"4n"`, `"8n."`, `"8t"`: note values, optionally dotted or triplet
//! - `"1:2:3"`: bars:beats:sixteenths transport position (sixteenths may be
//!   fractional)

use std::str::FromStr;

use thiserror::Error;

use crate::audio::timing::BEATS_PER_BAR;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("empty time value")]
    Empty,
    #[error("invalid time value '{0}'")]
    Invalid(String),
    #[error("note value must be a power of two: '{0}'")]
    NoteValue(String),
}

/// A span or position measured in beats.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct BeatTime(pub f64);

impl BeatTime {
    pub fn beats(self) -> f64 {
        self.0
    }

    pub fn bars(n: f64) -> Self {
        BeatTime(n * BEATS_PER_BAR)
    }

    /// A note value: `note(4)` is a quarter note.
    pub fn note(division: u32) -> Self {
        BeatTime(BEATS_PER_BAR / division.max(1) as f64)
    }

    pub fn sixteenths(n: f64) -> Self {
        BeatTime(n / 4.0)
    }

    pub fn to_secs(self, bpm: f64) -> f64 {
        crate::audio::timing::beats_to_secs(self.0, bpm)
    }
}

fn parse_number(s: &str, whole: &str) -> Result<f64, TimeParseError> {
    let v: f64 = s.trim().parse().map_err(|_| TimeParseError::Invalid(whole.to_string()))?;
    if !v.is_finite() || v < 0.0 {
        return Err(TimeParseError::Invalid(whole.to_string()));
    }
    Ok(v)
}

impl FromStr for BeatTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TimeParseError::Empty);
        }

        if s.contains(':') {
            let parts: Vec<&str> = s.split(':').collect();
            if parts.len() > 3 {
                return Err(TimeParseError::Invalid(s.to_string()));
            }
            let bars = parse_number(parts[0], s)?;
            let beats = parts.get(1).map(|p| parse_number(p, s)).transpose()?.unwrap_or(0.0);
            let sixteenths = parts.get(2).map(|p| parse_number(p, s)).transpose()?.unwrap_or(0.0);
            return Ok(BeatTime(bars * BEATS_PER_BAR + beats + sixteenths / 4.0));
        }

        if let Some(n) = s.strip_suffix('m') {
            return Ok(BeatTime::bars(parse_number(n, s)?));
        }

        let (body, factor) = if let Some(b) = s.strip_suffix('.') {
            (b, 1.5)
        } else if let Some(b) = s.strip_suffix('t') {
            (b, 2.0 / 3.0)
        } else {
            (s, 1.0)
        };
        let division = body
            .strip_suffix('n')
            .ok_or_else(|| TimeParseError::Invalid(s.to_string()))?;
        let division: u32 = division
            .parse()
            .map_err(|_| TimeParseError::Invalid(s.to_string()))?;
        if division == 0 || !division.is_power_of_two() {
            return Err(TimeParseError::NoteValue(s.to_string()));
        }
        Ok(BeatTime(BEATS_PER_BAR / division as f64 * factor))
    }
}
