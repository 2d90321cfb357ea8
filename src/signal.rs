//! Stop requests for graceful shutdown.
//!
//! The orchestrator only looks at the signal between stages, so a request
//! never interrupts a record batch half way.
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Shared stop flag; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Route Ctrl+C into this signal.
    pub fn install_ctrlc(&self) -> Result<()> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            tracing::info!(signal = "SIGINT", "stop requested, finishing current stage");
            signal.request();
        })
        .context("set Ctrl+C handler")
    }

    /// Sleep for `duration` unless a stop arrives first.
    ///
    /// Returns `false` when the sleep was cut short by a stop request.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
