//! Startup configuration: YAML file, then environment, then CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::audio::timing::{clamp_bpm, DEFAULT_BPM};
use crate::audio::RetryPolicy;
use crate::console::{Filter, Level};
use crate::patterns::Style;
use crate::staves::NotationMode;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_FILE: &str = "chordcubes.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bpm: f64,
    pub style: String,
    pub drums: bool,
    pub metronome: bool,
    pub notation: NotationMode,
    pub log_level: Level,
    /// Substrings; log lines containing any of them are dropped.
    pub mute: Vec<String>,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub unlock_delay_ms: u64,
    pub lookahead_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            style: Style::default().name().to_string(),
            drums: false,
            metronome: false,
            notation: NotationMode::Auto,
            log_level: Level::Info,
            mute: Vec::new(),
            retry_attempts: 10,
            retry_delay_ms: 300,
            unlock_delay_ms: 100,
            lookahead_ms: 100,
        }
    }
}

impl Config {
    /// Load `path`, or `chordcubes.yaml` if it exists, or defaults; then
    /// apply `CHORDCUBES_*` environment overrides (after reading `.env`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(p) => Self::open(p)?,
            None => {
                let default = PathBuf::from(DEFAULT_FILE);
                if default.is_file() {
                    Self::open(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        config.validate().with_context(|| format!("in {}", path.display()))?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (the environment, in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("CHORDCUBES_BPM") {
            self.bpm = v
                .trim()
                .parse()
                .with_context(|| format!("CHORDCUBES_BPM is not a number: {}", v))?;
        }
        if let Some(v) = lookup("CHORDCUBES_STYLE") {
            self.style = v.trim().to_string();
        }
        if let Some(v) = lookup("CHORDCUBES_LOG") {
            self.log_level = v.parse().map_err(|e| anyhow!("CHORDCUBES_LOG: {}", e))?;
        }
        if let Some(v) = lookup("CHORDCUBES_NOTATION") {
            self.notation = v.parse().map_err(|e| anyhow!("CHORDCUBES_NOTATION: {}", e))?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        self.initial_style()?;
        if self.retry_attempts == 0 {
            return Err(anyhow!("retry_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn initial_style(&self) -> Result<Style> {
        self.style.parse().map_err(|e| anyhow!("{}", e))
    }

    pub fn initial_bpm(&self) -> f64 {
        clamp_bpm(self.bpm)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts.max(1),
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn unlock_delay(&self) -> Duration {
        Duration::from_millis(self.unlock_delay_ms)
    }

    pub fn lookahead(&self) -> Duration {
        Duration::from_millis(self.lookahead_ms)
    }

    pub fn log_filter(&self) -> Filter {
        Filter { min_level: self.log_level, mute: self.mute.clone() }
    }
}
