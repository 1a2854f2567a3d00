//! Debounce coordinator
//!
//! Coalesces bursts of ingest activity into one delayed detection sweep.
//! `signal` records the latest signaled timestamp and arms at most one
//! pending sweep task; after the quiet interval the task atomically takes
//! the latest timestamp, disarms, and emits the sweep window to the runner.
//! A signal that races the read-and-clear is picked up by the next armed
//! sweep rather than the current one.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Quiet period with no action before a sweep fires
pub const QUIET_INTERVAL: Duration = Duration::from_secs(1);

/// How far behind the trigger timestamp a sweep looks, in microseconds.
/// A report timestamped more than this behind a later trigger is never
/// correlated into any sweep.
pub const LOOKBACK_US: i64 = 2_000_000;

/// Closed time window handed to the sweep runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepWindow {
    pub start_us: i64,
    pub end_us: i64,
}

#[derive(Default)]
struct State {
    latest_signaled: Option<i64>,
    sweep_armed: bool,
}

/// Coalescing scheduler for detection sweeps
#[derive(Clone)]
pub struct Debouncer {
    state: Arc<Mutex<State>>,
    quiet: Duration,
    lookback_us: i64,
    windows: mpsc::UnboundedSender<SweepWindow>,
}

impl Debouncer {
    /// Create a coordinator and the window stream its sweeps are emitted on.
    pub fn new(
        quiet: Duration,
        lookback_us: i64,
    ) -> (Self, mpsc::UnboundedReceiver<SweepWindow>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer {
            state: Arc::new(Mutex::new(State::default())),
            quiet,
            lookback_us,
            windows: tx,
        };
        (debouncer, rx)
    }

    /// Record a signal and arm a sweep if none is pending.
    ///
    /// Any number of signals between arming and the sweep's read-and-clear
    /// coalesce into one window anchored at the maximum signaled timestamp.
    pub fn signal(&self, timestamp_us: i64) {
        let mut state = self.state.lock().expect("debounce lock poisoned");
        state.latest_signaled = Some(match state.latest_signaled {
            Some(current) => current.max(timestamp_us),
            None => timestamp_us,
        });

        if !state.sweep_armed {
            state.sweep_armed = true;
            let this = self.clone();
            tokio::spawn(async move { this.fire_after_quiet().await });
        }
    }

    async fn fire_after_quiet(self) {
        tokio::time::sleep(self.quiet).await;

        let trigger = {
            let mut state = self.state.lock().expect("debounce lock poisoned");
            state.sweep_armed = false;
            state.latest_signaled.take()
        };

        if let Some(end_us) = trigger {
            // Receiver gone means the service is shutting down
            let _ = self.windows.send(SweepWindow {
                start_us: end_us - self.lookback_us,
                end_us,
            });
        }
    }
}
