mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use chordcubes::audio::{AudioContext, AudioError, AudioGateway, ContextProvider, ContextState, RetryPolicy};

use common::{CountingProvider, ManualContext};

#[test]
fn concurrent_callers_share_one_acquisition() {
    let ctx = Arc::new(ManualContext::default());
    let acquired = Arc::new(AtomicUsize::new(0));
    let provider = CountingProvider {
        ctx: ctx.clone(),
        acquired: acquired.clone(),
        delay: Duration::from_millis(50),
    };
    let gw = Arc::new(AudioGateway::new(provider));

    let n = 8;
    let barrier = Arc::new(Barrier::new(n));
    let handles: Vec<_> = (0..n)
        .map(|_| {
            let gw = gw.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                gw.ensure_started()
            })
        })
        .collect();
    let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(results.iter().all(|ok| *ok));
    assert_eq!(acquired.load(Ordering::SeqCst), 1);
    assert_eq!(gw.state(), ContextState::Running);
}

#[test]
fn running_context_is_not_acquired_again() {
    let ctx = Arc::new(ManualContext::default());
    let (gw, acquired) = common::gateway(ctx);
    assert_eq!(gw.state(), ContextState::Uninitialized);
    assert!(gw.ensure_started());
    assert!(gw.ensure_started());
    assert!(gw.ensure_started());
    assert_eq!(acquired.load(Ordering::SeqCst), 1);
}

#[test]
fn locked_context_reports_false_and_retries_later() {
    let ctx = Arc::new(ManualContext::default());
    ctx.lock();
    let (gw, acquired) = common::gateway(ctx.clone());
    assert!(!gw.ensure_started());
    assert_eq!(gw.state(), ContextState::Pending);
    // acquired once; the next call only retries the start
    assert!(!gw.ensure_started());
    assert_eq!(acquired.load(Ordering::SeqCst), 1);
}

/// Fails a fixed number of times before handing out the context.
struct SlowBackend {
    ctx: Arc<ManualContext>,
    failures_left: AtomicUsize,
    calls: Arc<AtomicUsize>,
}

impl ContextProvider for SlowBackend {
    fn acquire(&self) -> Result<Arc<dyn AudioContext>, AudioError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(AudioError::Unavailable("still loading".into()));
        }
        Ok(self.ctx.clone())
    }
}

#[test]
fn backend_that_loads_late_is_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = SlowBackend {
        ctx: Arc::new(ManualContext::default()),
        failures_left: AtomicUsize::new(3),
        calls: calls.clone(),
    };
    let gw = AudioGateway::new(backend)
        .with_retry(RetryPolicy { attempts: 5, delay: Duration::from_millis(1) });
    assert!(gw.ensure_started());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn backend_that_never_loads_gives_up_quietly() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = SlowBackend {
        ctx: Arc::new(ManualContext::default()),
        failures_left: AtomicUsize::new(100),
        calls: calls.clone(),
    };
    let gw = AudioGateway::new(backend)
        .with_retry(RetryPolicy { attempts: 3, delay: Duration::from_millis(1) });
    assert!(!gw.ensure_started());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(gw.state(), ContextState::Uninitialized);
    // the next user action starts a fresh attempt
    assert!(!gw.ensure_started());
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}
