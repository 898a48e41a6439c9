//! Scientific pitch names (`C4`, `Bb5`, `F#3`) for voices and noteheads.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];
const LETTER_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PitchError {
    #[error("empty pitch name")]
    Empty,
    #[error("unknown note letter in '{0}'")]
    Letter(String),
    #[error("missing or invalid octave in '{0}'")]
    Octave(String),
}

/// A spelled pitch: letter, accidental and octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    /// 0 = C .. 6 = B
    letter: u8,
    /// semitones, negative for flats
    accidental: i8,
    octave: i32,
}

impl Pitch {
    /// A natural note; unknown letters fall back to C.
    pub const fn natural(letter: char, octave: i32) -> Self {
        let letter = match letter {
            'D' => 1,
            'E' => 2,
            'F' => 3,
            'G' => 4,
            'A' => 5,
            'B' => 6,
            _ => 0,
        };
        Pitch { letter, accidental: 0, octave }
    }

    pub fn midi(&self) -> i32 {
        12 * (self.octave + 1) + LETTER_SEMITONES[self.letter as usize] + self.accidental as i32
    }

    pub fn freq_hz(&self) -> f32 {
        midi_to_freq(self.midi())
    }

    /// Position on the diatonic ladder; one unit per staff line/space.
    pub fn diatonic_index(&self) -> i32 {
        self.octave * 7 + self.letter as i32
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    pub fn accidental(&self) -> i8 {
        self.accidental
    }
}

impl FromStr for Pitch {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let first = chars.next().ok_or(PitchError::Empty)?;
        let letter = LETTERS
            .iter()
            .position(|c| *c == first.to_ascii_uppercase())
            .ok_or_else(|| PitchError::Letter(s.to_string()))? as u8;

        let rest = chars.as_str();
        let digits_at = rest
            .find(|c: char| c.is_ascii_digit() || c == '-')
            .ok_or_else(|| PitchError::Octave(s.to_string()))?;
        let (acc, octave) = rest.split_at(digits_at);
        let mut accidental: i8 = 0;
        for c in acc.chars() {
            match c {
                '#' | '♯' => accidental += 1,
                'b' | '♭' => accidental -= 1,
                _ => return Err(PitchError::Letter(s.to_string())),
            }
        }
        let octave: i32 = octave
            .parse()
            .map_err(|_| PitchError::Octave(s.to_string()))?;
        Ok(Pitch { letter, accidental, octave })
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", LETTERS[self.letter as usize])?;
        let mark = if self.accidental < 0 { "b" } else { "#" };
        for _ in 0..self.accidental.unsigned_abs() {
            f.write_str(mark)?;
        }
        write!(f, "{}", self.octave)
    }
}

pub fn midi_to_freq(midi: i32) -> f32 {
    440.0 * 2f32.powf((midi - 69) as f32 / 12.0)
}

/// Parse a list of pitch names, failing on the first bad one.
pub fn parse_pitches<S: AsRef<str>>(names: &[S]) -> Result<Vec<Pitch>, PitchError> {
    names.iter().map(|n| n.as_ref().parse()).collect()
}
