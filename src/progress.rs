//! Scoped progress reporting for long-running push steps.

use std::time::Instant;
use tracing::{info, warn};

/// A user-visible step with exactly one outcome.
///
/// Call [`Step::finish`] on success. A step dropped without finishing
/// (early return, `?`, cancelled future) reports failure instead.
#[derive(Debug)]
#[must_use = "a step that is never finished reports failure when dropped"]
pub struct Step {
    message: String,
    started: Instant,
    finished: bool,
}

impl Step {
    /// Starts a step.
    pub fn start(message: impl Into<String>) -> Self {
        let message = message.into();
        info!("{}", message);
        Self {
            message,
            started: Instant::now(),
            finished: false,
        }
    }

    /// Marks the step successful.
    pub fn finish(mut self) {
        self.finished = true;
        info!(elapsed_ms = self.started.elapsed().as_millis() as u64, "✓ {}", self.message);
    }
}

impl Drop for Step {
    fn drop(&mut self) {
        if !self.finished {
            warn!(elapsed_ms = self.started.elapsed().as_millis() as u64, "✗ {}", self.message);
        }
    }
}
