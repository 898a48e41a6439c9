//! The single point of access to the shared audio context.
//!
//! `ensure_started` may be called from anywhere, any number of times, from
//! several threads at once. Only one context is ever acquired, and only one
//! start attempt runs at a time; callers that arrive while an attempt is in
//! flight wait for it and share its result.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;

use super::{AudioContext, AudioError, BoxedSource, ContextProvider, ContextState};
use crate::console;

/// Bounded retry for acquiring the context while the backend is not ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 10, delay: Duration::from_millis(300) }
    }
}

#[derive(Debug, Default)]
struct Attempt {
    in_flight: bool,
    /// Bumped every time an attempt settles.
    generation: u64,
    last_result: bool,
}

pub struct AudioGateway {
    provider: Box<dyn ContextProvider>,
    retry: RetryPolicy,
    unlock_delay: Duration,
    context: OnceCell<Arc<dyn AudioContext>>,
    attempt: Mutex<Attempt>,
    settled: Condvar,
    epoch: Instant,
}

impl AudioGateway {
    pub fn new(provider: impl ContextProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            retry: RetryPolicy::default(),
            unlock_delay: Duration::from_millis(100),
            context: OnceCell::new(),
            attempt: Mutex::new(Attempt::default()),
            settled: Condvar::new(),
            epoch: Instant::now(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pause between the silent-tone unlock and the final resume.
    pub fn with_unlock_delay(mut self, delay: Duration) -> Self {
        self.unlock_delay = delay;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn state(&self) -> ContextState {
        match self.context.get() {
            Some(ctx) => ctx.state(),
            None => ContextState::Uninitialized,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == ContextState::Running
    }

    /// Audio clock in seconds. Falls back to a monotonic clock until a
    /// context exists so the transport can keep time regardless.
    pub fn current_time(&self) -> f64 {
        match self.context.get() {
            Some(ctx) => ctx.current_time(),
            None => self.epoch.elapsed().as_secs_f64(),
        }
    }

    /// Route a source to the running context, starting at `at`.
    pub fn play(&self, source: BoxedSource, at: f64) -> Result<(), AudioError> {
        let ctx = self.context.get().ok_or(AudioError::NotRunning)?;
        if ctx.state() != ContextState::Running {
            return Err(AudioError::NotRunning);
        }
        ctx.play(source, at)
    }

    /// Make sure the shared context is running. Never fails loudly: the
    /// result says whether sound is possible right now.
    pub fn ensure_started(&self) -> bool {
        if self.is_running() {
            return true;
        }

        let mut guard = self.attempt.lock().unwrap_or_else(|e| e.into_inner());
        if guard.in_flight {
            let waiting_for = guard.generation;
            while guard.in_flight && guard.generation == waiting_for {
                guard = self.settled.wait(guard).unwrap_or_else(|e| e.into_inner());
            }
            return guard.last_result;
        }
        guard.in_flight = true;
        drop(guard);

        let result = self.run_attempt();

        let mut guard = self.attempt.lock().unwrap_or_else(|e| e.into_inner());
        guard.in_flight = false;
        guard.generation += 1;
        guard.last_result = result;
        drop(guard);
        self.settled.notify_all();
        result
    }

    fn context(&self) -> Result<&Arc<dyn AudioContext>, AudioError> {
        self.context.get_or_try_init(|| self.acquire_with_retry())
    }

    fn acquire_with_retry(&self) -> Result<Arc<dyn AudioContext>, AudioError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.provider.acquire() {
                Ok(ctx) => {
                    console::info("[AUDIO] acquired audio context");
                    return Ok(ctx);
                }
                Err(e) if attempt < attempts => {
                    console::warn(format!(
                        "[AUDIO] context not available ({}), retry {}/{} in {}ms",
                        e,
                        attempt,
                        attempts - 1,
                        self.retry.delay.as_millis()
                    ));
                    thread::sleep(self.retry.delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn run_attempt(&self) -> bool {
        let ctx = match self.context() {
            Ok(ctx) => ctx,
            Err(e) => {
                console::error(format!("[AUDIO] giving up on audio context: {}", e));
                return false;
            }
        };
        if ctx.state() == ContextState::Running {
            return true;
        }

        console::debug("[AUDIO] starting audio context");
        match ctx.start() {
            Ok(()) => console::debug("[AUDIO] direct start ok"),
            Err(e) => {
                console::warn(format!("[AUDIO] direct start failed, trying resume: {}", e));
                if let Err(e) = ctx.resume() {
                    console::warn(format!("[AUDIO] resume failed, trying silent tone: {}", e));
                    if let Err(e) = ctx.play_silent_tone() {
                        console::warn(format!("[AUDIO] silent tone unlock failed: {}", e));
                    }
                    thread::sleep(self.unlock_delay);
                    if let Err(e) = ctx.resume() {
                        console::warn(format!("[AUDIO] delayed resume failed: {}", e));
                    }
                }
            }
        }

        let state = ctx.state();
        console::info(format!("[AUDIO] audio context state: {}", state));
        state == ContextState::Running
    }
}
