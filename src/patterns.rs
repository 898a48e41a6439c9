//! Fixed 16-step drum grooves, one per style.

use std::fmt;
use std::str::FromStr;

use crate::audio::timing::STEPS_PER_BAR;

pub type Steps = [u8; STEPS_PER_BAR];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Drum {
    Kick,
    Snare,
    Hihat,
    OpenHihat,
    Crash,
    Ride,
}

impl Drum {
    pub const ALL: [Drum; 6] = [
        Drum::Kick,
        Drum::Snare,
        Drum::Hihat,
        Drum::OpenHihat,
        Drum::Crash,
        Drum::Ride,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Drum::Kick => "kick",
            Drum::Snare => "snare",
            Drum::Hihat => "hihat",
            Drum::OpenHihat => "openHihat",
            Drum::Crash => "crash",
            Drum::Ride => "ride",
        }
    }
}

impl fmt::Display for Drum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Drum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Drum::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown instrument '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Style {
    #[default]
    Rock,
    Jazz,
    Electronic,
    Funk,
    Latin,
    HipHop,
}

impl Style {
    pub const ALL: [Style; 6] = [
        Style::Rock,
        Style::Jazz,
        Style::Electronic,
        Style::Funk,
        Style::Latin,
        Style::HipHop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Style::Rock => "rock",
            Style::Jazz => "jazz",
            Style::Electronic => "electronic",
            Style::Funk => "funk",
            Style::Latin => "latin",
            Style::HipHop => "hiphop",
        }
    }

    pub fn pattern(self) -> &'static [(Drum, Steps)] {
        match self {
            Style::Rock => ROCK,
            Style::Jazz => JAZZ,
            Style::Electronic => ELECTRONIC,
            Style::Funk => FUNK,
            Style::Latin => LATIN,
            Style::HipHop => HIPHOP,
        }
    }

    pub fn steps(self, drum: Drum) -> Option<&'static Steps> {
        self.pattern().iter().find(|(d, _)| *d == drum).map(|(_, s)| s)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let key = if key == "hip-hop" { "hiphop".to_string() } else { key };
        Style::ALL
            .into_iter()
            .find(|st| st.name() == key)
            .ok_or_else(|| {
                let names: Vec<&str> = Style::ALL.iter().map(|s| s.name()).collect();
                format!("unknown style '{}' (try: {})", s.trim(), names.join(", "))
            })
    }
}

/// Look up one instrument's steps by style and instrument name.
pub fn lookup(style: &str, drum: &str) -> Option<&'static Steps> {
    let style: Style = style.parse().ok()?;
    let drum: Drum = drum.parse().ok()?;
    style.steps(drum)
}

/// Step indices that carry a hit.
pub fn hits(steps: &Steps) -> impl Iterator<Item = usize> + '_ {
    steps.iter().enumerate().filter(|(_, h)| **h == 1).map(|(i, _)| i)
}

/// `x...x...` rendering, grouped per beat.
pub fn render_steps(steps: &Steps) -> String {
    let mut out = String::with_capacity(STEPS_PER_BAR + 3);
    for (i, hit) in steps.iter().enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(' ');
        }
        out.push(if *hit == 1 { 'x' } else { '.' });
    }
    out
}

const ROCK: &[(Drum, Steps)] = &[
    (Drum::Kick, [1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0]),
    (Drum::Snare, [0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0]),
    (Drum::Hihat, [1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1]),
    (Drum::Crash, [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
];

const JAZZ: &[(Drum, Steps)] = &[
    (Drum::Kick, [1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0]),
    (Drum::Snare, [0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0]),
    (Drum::Ride, [1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 0]),
    (Drum::Hihat, [0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0]),
];

const ELECTRONIC: &[(Drum, Steps)] = &[
    (Drum::Kick, [1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0]),
    (Drum::Snare, [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]),
    (Drum::Hihat, [0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0]),
    (Drum::OpenHihat, [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1]),
];

const FUNK: &[(Drum, Steps)] = &[
    (Drum::Kick, [1, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 1, 0]),
    (Drum::Snare, [0, 1, 0, 1, 1, 0, 0, 1, 0, 1, 1, 0, 1, 0, 0, 1]),
    (Drum::Hihat, [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1]),
    (Drum::OpenHihat, [0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0]),
];

const LATIN: &[(Drum, Steps)] = &[
    (Drum::Kick, [1, 0, 0, 1, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0, 0, 0]),
    (Drum::Snare, [0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0, 1, 0]),
    (Drum::Hihat, [1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0]),
    (Drum::Ride, [0, 0, 0, 1, 0, 1, 0, 0, 0, 1, 0, 1, 0, 0, 0, 1]),
];

const HIPHOP: &[(Drum, Steps)] = &[
    (Drum::Kick, [1, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0]),
    (Drum::Snare, [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]),
    (Drum::Hihat, [1, 1, 0, 1, 0, 0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 0]),
    (Drum::OpenHihat, [0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_style_has_four_instruments() {
        for style in Style::ALL {
            assert_eq!(style.pattern().len(), 4, "{}", style);
        }
    }

    #[test]
    fn hits_lists_step_indices() {
        let steps = Style::Rock.steps(Drum::Snare).unwrap();
        assert_eq!(hits(steps).collect::<Vec<_>>(), vec![2, 6, 10, 14]);
    }

    #[test]
    fn render_groups_by_beat() {
        let steps = Style::Rock.steps(Drum::Kick).unwrap();
        assert_eq!(render_steps(steps), "x... x... x... x...");
    }

    #[test]
    fn style_names_round_trip() {
        for style in Style::ALL {
            assert_eq!(style.name().parse::<Style>(), Ok(style));
        }
        assert_eq!("Hip-Hop".parse::<Style>(), Ok(Style::HipHop));
        assert!("polka".parse::<Style>().is_err());
    }

    #[test]
    fn drum_names_match_case_insensitively() {
        assert_eq!("openhihat".parse::<Drum>(), Ok(Drum::OpenHihat));
        assert_eq!(Drum::OpenHihat.to_string(), "openHihat");
    }
}
