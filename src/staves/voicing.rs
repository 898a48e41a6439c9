//! Roman-numeral chord symbols and the pitches drawn for them.

use crate::audio::Pitch;

/// Treble notes and bass note for one chord symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voicing {
    pub symbol: &'static str,
    pub treble: &'static [&'static str],
    pub bass: &'static str,
}

const VOICINGS: &[Voicing] = &[
    Voicing { symbol: "I", treble: &["C5", "E5", "G5"], bass: "C3" },
    Voicing { symbol: "ii", treble: &["D5", "F5", "A5"], bass: "D3" },
    Voicing { symbol: "iii", treble: &["E5", "G5", "B5"], bass: "E3" },
    Voicing { symbol: "IV", treble: &["F5", "A5", "C6"], bass: "F3" },
    Voicing { symbol: "V", treble: &["G5", "B5", "D6"], bass: "G3" },
    Voicing { symbol: "vi", treble: &["A5", "C6", "E6"], bass: "A3" },
    Voicing { symbol: "vii", treble: &["B5", "D6", "F6"], bass: "B3" },
    Voicing { symbol: "bVII", treble: &["Bb5", "D6", "F6"], bass: "Bb3" },
    Voicing { symbol: "bVI", treble: &["Ab5", "C6", "Eb6"], bass: "Ab3" },
    Voicing { symbol: "bIII", treble: &["Eb5", "G5", "Bb5"], bass: "Eb3" },
    Voicing { symbol: "V7", treble: &["G5", "B5", "D6", "F6"], bass: "G3" },
    Voicing { symbol: "I7", treble: &["C5", "E5", "G5", "Bb5"], bass: "C3" },
];

/// Symbols with a voicing of their own, in table order.
pub fn known_symbols() -> impl Iterator<Item = &'static str> {
    VOICINGS.iter().map(|v| v.symbol)
}

/// Look up `symbol` exactly (case matters: `ii` is not `II`). Unknown symbols
/// get the tonic.
pub fn voicing(symbol: &str) -> &'static Voicing {
    VOICINGS
        .iter()
        .find(|v| v.symbol == symbol)
        .unwrap_or(&VOICINGS[0])
}

pub fn is_known(symbol: &str) -> bool {
    VOICINGS.iter().any(|v| v.symbol == symbol)
}

impl Voicing {
    /// All pitches, bass first.
    pub fn pitches(&self) -> Vec<Pitch> {
        std::iter::once(self.bass)
            .chain(self.treble.iter().copied())
            .filter_map(|n| n.parse().ok())
            .collect()
    }
}
