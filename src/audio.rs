//! Audio output: the shared context, its gateway, and the voices that play
//! through it.
//!
//! Nothing in here panics or raises to the transport on audio trouble. A
//! missing device or a context that refuses to start degrades to silence.

use std::fmt;
use std::sync::Arc;

use rodio::Source;
use thiserror::Error;

pub mod gateway;
pub mod output;
pub mod pitch;
pub mod sources;
pub mod synth;
pub mod timing;

pub use gateway::{AudioGateway, RetryPolicy};
pub use output::{RodioContext, RodioProvider};
pub use pitch::{Pitch, PitchError};
pub use synth::SynthFactory;

use crate::patterns::Drum;

/// A mono `f32` source ready to hand to the output mixer.
pub type BoxedSource = Box<dyn Source<Item = f32> + Send>;

#[derive(Debug, Error)]
pub enum AudioError {
    /// The audio backend itself is not available yet (retryable).
    #[error("audio backend unavailable: {0}")]
    Unavailable(String),
    /// The context exists but refuses to run (e.g. no output permission).
    #[error("audio start not allowed: {0}")]
    NotAllowed(String),
    #[error("audio device error: {0}")]
    Device(String),
    #[error("audio context is not running")]
    NotRunning,
    #[error("voice error: {0}")]
    Voice(String),
    #[error(transparent)]
    Pitch(#[from] PitchError),
}

/// Lifecycle of the shared audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No context has been acquired yet.
    Uninitialized,
    /// Acquired, but not (yet) allowed to produce sound.
    Pending,
    Running,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextState::Uninitialized => "uninitialized",
            ContextState::Pending => "pending",
            ContextState::Running => "running",
        };
        f.write_str(s)
    }
}

/// The one audio output resource of a session.
///
/// Times are seconds on the context's own clock (`current_time`). `play`
/// must start the source at `at`, not at the moment of the call.
pub trait AudioContext: Send + Sync {
    fn state(&self) -> ContextState;
    fn start(&self) -> Result<(), AudioError>;
    fn resume(&self) -> Result<(), AudioError>;
    /// Start and immediately stop a near-silent oscillator. Some backends only
    /// unlock once an actual graph has produced samples.
    fn play_silent_tone(&self) -> Result<(), AudioError>;
    fn current_time(&self) -> f64;
    fn play(&self, source: BoxedSource, at: f64) -> Result<(), AudioError>;
}

/// Hands out the audio context. May fail while the backend is still loading.
pub trait ContextProvider: Send + Sync {
    fn acquire(&self) -> Result<Arc<dyn AudioContext>, AudioError>;
}

/// Something that can sound notes at a scheduled time.
///
/// Percussion voices ignore `notes` (except the membrane kick, which is
/// pitched). `duration` and `at` are in seconds.
pub trait Voice: Send + Sync {
    fn trigger(&self, notes: &[Pitch], duration: f64, at: f64) -> Result<(), AudioError>;
}

/// Builds the session's voices.
pub trait VoiceFactory: Send + Sync {
    fn drum(&self, drum: Drum) -> Result<Arc<dyn Voice>, AudioError>;
    fn click(&self) -> Result<Arc<dyn Voice>, AudioError>;
    fn poly(&self) -> Result<Arc<dyn Voice>, AudioError>;
}
