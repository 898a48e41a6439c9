//! `rodio`-backed audio context.
//!
//! The output stream has to stay on the thread that opened it, so `start`
//! spawns a small thread that owns the stream and parks until shutdown. The
//! rest of the crate only touches the `OutputStreamHandle`.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rodio::source::SineWave;
use rodio::{OutputStream, OutputStreamHandle, Source};

use super::{AudioContext, AudioError, BoxedSource, ContextProvider, ContextState};
use crate::console;

const OPEN_TIMEOUT: Duration = Duration::from_secs(2);
const UNLOCK_FREQS: [f32; 3] = [220.0, 440.0, 880.0];
const UNLOCK_GAIN: f32 = 0.001;

struct OutputThread {
    handle: OutputStreamHandle,
    shutdown: mpsc::Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl Drop for OutputThread {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn open_output() -> Result<OutputThread, AudioError> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<OutputStreamHandle, String>>();
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let join = thread::Builder::new()
        .name("chordcubes-audio".into())
        .spawn(move || {
            let (_stream, handle) = match OutputStream::try_default() {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            if ready_tx.send(Ok(handle)).is_err() {
                return;
            }
            // Keep the stream alive until the context goes away.
            let _ = shutdown_rx.recv();
        })
        .map_err(|e| AudioError::Device(format!("spawning audio thread: {}", e)))?;

    match ready_rx.recv_timeout(OPEN_TIMEOUT) {
        Ok(Ok(handle)) => Ok(OutputThread { handle, shutdown: shutdown_tx, join: Some(join) }),
        Ok(Err(e)) => Err(AudioError::Device(e)),
        Err(_) => Err(AudioError::Device("timed out opening output device".into())),
    }
}

pub struct RodioContext {
    epoch: Instant,
    output: Mutex<Option<OutputThread>>,
}

impl RodioContext {
    pub fn new() -> Self {
        Self { epoch: Instant::now(), output: Mutex::new(None) }
    }

    fn handle(&self) -> Option<OutputStreamHandle> {
        self.output
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|o| o.handle.clone())
    }
}

impl Default for RodioContext {
    fn default() -> Self {
        Self::new()
    }
}

fn silent_blip(freq: f32) -> impl Source<Item = f32> + Send {
    SineWave::new(freq)
        .amplify(UNLOCK_GAIN)
        .take_duration(Duration::from_millis(1))
}

impl AudioContext for RodioContext {
    fn state(&self) -> ContextState {
        if self.output.lock().unwrap_or_else(|e| e.into_inner()).is_some() {
            ContextState::Running
        } else {
            ContextState::Pending
        }
    }

    fn start(&self) -> Result<(), AudioError> {
        let mut guard = self.output.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            *guard = Some(open_output()?);
        }
        Ok(())
    }

    fn resume(&self) -> Result<(), AudioError> {
        // A stream that was opened keeps running; resuming means reopening
        // when the first open did not succeed.
        self.start()
    }

    fn play_silent_tone(&self) -> Result<(), AudioError> {
        if let Some(handle) = self.handle() {
            for freq in UNLOCK_FREQS {
                handle
                    .play_raw(silent_blip(freq))
                    .map_err(|e| AudioError::Device(e.to_string()))?;
            }
            return Ok(());
        }
        // No stream yet: poke the device with throwaway streams.
        for freq in UNLOCK_FREQS {
            let (_stream, handle) =
                OutputStream::try_default().map_err(|e| AudioError::Device(e.to_string()))?;
            handle
                .play_raw(silent_blip(freq))
                .map_err(|e| AudioError::Device(e.to_string()))?;
            thread::sleep(Duration::from_millis(2));
        }
        console::debug("[AUDIO] silent tone unlock completed");
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn play(&self, source: BoxedSource, at: f64) -> Result<(), AudioError> {
        let handle = self.handle().ok_or(AudioError::NotRunning)?;
        let wait = (at - self.current_time()).max(0.0);
        handle
            .play_raw(source.delay(Duration::from_secs_f64(wait)))
            .map_err(|e| AudioError::Device(e.to_string()))
    }
}

/// Hands out a single `RodioContext`; the gateway guarantees it is asked once.
#[derive(Default)]
pub struct RodioProvider;

impl ContextProvider for RodioProvider {
    fn acquire(&self) -> Result<Arc<dyn AudioContext>, AudioError> {
        Ok(Arc::new(RodioContext::new()))
    }
}
