//! Interrupt handling: maps Ctrl+C / termination signals onto the two
//! sticky flags the driver loop polls.
//!
//! While inputs are being opened the controller is disarmed and signals are
//! ignored. During a session, an interrupt means "skip the current input"
//! when the mode plays inputs one at a time, progress display is active,
//! and the previous interrupt was more than a second ago; anything else
//! means "abort the pipeline".

use crate::error::{EngineError, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

const NEVER: u64 = u64::MAX;
const SKIP_WINDOW_MS: u64 = 1000;

#[derive(Debug)]
struct InterruptState {
    abort: AtomicBool,
    skip: AtomicBool,
    armed: AtomicBool,
    skip_allowed: AtomicBool,
    /// Milliseconds since `epoch` of the previous interrupt; `NEVER` before
    /// the first one.
    last_ms: AtomicU64,
    epoch: Instant,
}

impl InterruptState {
    fn new() -> Self {
        InterruptState {
            abort: AtomicBool::new(false),
            skip: AtomicBool::new(false),
            armed: AtomicBool::new(false),
            skip_allowed: AtomicBool::new(false),
            last_ms: AtomicU64::new(NEVER),
            epoch: Instant::now(),
        }
    }

    fn on_signal(&self) {
        if !self.armed.load(Ordering::Relaxed) {
            return;
        }
        let now = self.epoch.elapsed().as_millis() as u64;
        let prev = self.last_ms.swap(now, Ordering::Relaxed);
        let spaced_out = prev == NEVER || now.saturating_sub(prev) > SKIP_WINDOW_MS;
        if self.skip_allowed.load(Ordering::Relaxed) && spaced_out {
            self.skip.store(true, Ordering::Relaxed);
        } else {
            self.abort.store(true, Ordering::Relaxed);
        }
    }
}

/// Handle to the shared interrupt flags.
#[derive(Clone, Debug)]
pub struct Interrupt {
    state: Arc<InterruptState>,
}

impl Interrupt {
    /// Create the controller and install the process-wide signal handler.
    /// Only one may be installed per process.
    pub fn install() -> Result<Self> {
        let interrupt = Interrupt::detached();
        let state = Arc::clone(&interrupt.state);
        ctrlc::set_handler(move || state.on_signal())
            .map_err(|e| EngineError::Signal(e.to_string()))?;
        Ok(interrupt)
    }

    /// Create a controller with no signal handler attached. Used by tests,
    /// and by callers that deliver signals some other way.
    pub fn detached() -> Self {
        Interrupt {
            state: Arc::new(InterruptState::new()),
        }
    }

    /// Start reacting to signals. `skip_allowed` enables the
    /// skip-current-input interpretation.
    pub fn arm(&self, skip_allowed: bool) {
        self.state.skip_allowed.store(skip_allowed, Ordering::Relaxed);
        self.state.armed.store(true, Ordering::Relaxed);
    }

    /// Stop reacting to signals (input-opening phase).
    pub fn disarm(&self) {
        self.state.armed.store(false, Ordering::Relaxed);
    }

    /// Whether the pipeline should abort. Sticky.
    pub fn aborted(&self) -> bool {
        self.state.abort.load(Ordering::Relaxed)
    }

    /// Whether the current input should be skipped. Sticky until
    /// [`Interrupt::clear_skip`].
    pub fn skip_requested(&self) -> bool {
        self.state.skip.load(Ordering::Relaxed)
    }

    /// Acknowledge a skip after acting on it.
    pub fn clear_skip(&self) {
        self.state.skip.store(false, Ordering::Relaxed);
    }

    /// Deliver a signal by hand; what the installed handler calls.
    pub fn trigger(&self) {
        self.state.on_signal();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disarmed_signals_are_ignored() {
        let int = Interrupt::detached();
        int.trigger();
        assert!(!int.aborted());
        assert!(!int.skip_requested());
    }

    #[test]
    fn first_signal_skips_when_allowed() {
        let int = Interrupt::detached();
        int.arm(true);
        int.trigger();
        assert!(int.skip_requested());
        assert!(!int.aborted());
    }

    #[test]
    fn rapid_second_signal_aborts() {
        let int = Interrupt::detached();
        int.arm(true);
        int.trigger();
        int.trigger(); // within the 1 s window
        assert!(int.skip_requested());
        assert!(int.aborted());
    }

    #[test]
    fn signal_aborts_when_skip_not_allowed() {
        let int = Interrupt::detached();
        int.arm(false);
        int.trigger();
        assert!(!int.skip_requested());
        assert!(int.aborted());
    }

    #[test]
    fn skip_clears_but_abort_sticks() {
        let int = Interrupt::detached();
        int.arm(true);
        int.trigger();
        int.clear_skip();
        assert!(!int.skip_requested());

        int.trigger();
        assert!(int.aborted());
        assert!(int.aborted()); // still set
    }
}
