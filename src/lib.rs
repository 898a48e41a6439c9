//! ChordCubes transport: drum/metronome playback on a shared audio context,
//! and a staff-notation overlay that follows playback.

pub mod audio;
pub mod clock;
pub mod config;
pub mod console;
pub mod patterns;
pub mod repl;
pub mod session;
pub mod staves;
pub mod transport;
pub mod tui;

pub use config::Config;
pub use session::{Command, Output, Session};
pub use transport::{PlaybackState, Transport};
