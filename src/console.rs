//! Minimal, TUI-safe logging.
//!
//! Any stdout/stderr writes while the TUI is running will corrupt the screen.
//! This module provides a tiny publish/subscribe mechanism so the transport,
//! the audio gateway and the staves overlay can report what they are doing
//! without printing directly.
//!
//! Filtering (minimum level and muted substrings) is owned here and set once
//! at startup with [`configure`]. Components only publish.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        };
        f.write_str(s)
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: Level,
    pub text: String,
}

/// Which messages get published at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub min_level: Level,
    /// Messages containing any of these substrings are dropped.
    pub mute: Vec<String>,
}

impl Default for Filter {
    fn default() -> Self {
        Self { min_level: Level::Info, mute: Vec::new() }
    }
}

impl Filter {
    pub fn allows(&self, level: Level, text: &str) -> bool {
        if level < self.min_level {
            return false;
        }
        !self.mute.iter().any(|m| !m.is_empty() && text.contains(m.as_str()))
    }
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
static SUBSCRIBERS: Lazy<Mutex<Vec<(usize, Sender<LogMessage>)>>> =
    Lazy::new(|| Mutex::new(Vec::new()));
static FILTER: Lazy<RwLock<Filter>> = Lazy::new(|| RwLock::new(Filter::default()));

/// Install the process-wide filter. Called once by the application root.
pub fn configure(filter: Filter) {
    let mut guard = FILTER.write().unwrap_or_else(|e| e.into_inner());
    *guard = filter;
}

/// A subscription to console log messages.
///
/// Dropping this value unsubscribes it.
pub struct Subscription {
    id: usize,
    rx: Receiver<LogMessage>,
}

impl Subscription {
    pub fn drain(&self) -> Vec<LogMessage> {
        self.rx.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subs = SUBSCRIBERS.lock().unwrap_or_else(|e| e.into_inner());
        subs.retain(|(id, _)| *id != self.id);
    }
}

pub fn subscribe() -> Subscription {
    let (tx, rx) = mpsc::channel();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    SUBSCRIBERS.lock().unwrap_or_else(|e| e.into_inner()).push((id, tx));
    Subscription { id, rx }
}

pub fn debug(msg: impl Into<String>) {
    publish(Level::Debug, msg.into());
}

pub fn info(msg: impl Into<String>) {
    publish(Level::Info, msg.into());
}

pub fn warn(msg: impl Into<String>) {
    publish(Level::Warn, msg.into());
}

pub fn error(msg: impl Into<String>) {
    publish(Level::Error, msg.into());
}

fn publish(level: Level, text: String) {
    if !FILTER.read().unwrap_or_else(|e| e.into_inner()).allows(level, &text) {
        return;
    }
    let message = LogMessage { level, text };

    let mut subs = SUBSCRIBERS.lock().unwrap_or_else(|e| e.into_inner());
    if subs.is_empty() {
        // Outside the TUI, warnings/errors should still be visible.
        match message.level {
            Level::Warn | Level::Error => eprintln!("{}", message.text),
            Level::Debug | Level::Info => {}
        }
        return;
    }

    // Broadcast to all subscribers; drop any that have gone away.
    subs.retain(|(_, tx)| tx.send(message.clone()).is_ok());
}
