use std::time::{Duration, Instant};

/// Emitted once per stage boundary (spec §4.5); tests assert the stage
/// sequence rather than the timing.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub stage: usize,
    pub elapsed: Duration,
    pub message: String,
}

/// Tracks elapsed time since the query started and formats one event per
/// stage as it completes.
pub(crate) struct ProgressClock {
    start: Instant,
}

impl ProgressClock {
    pub(crate) fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub(crate) fn event(&self, stage: usize, message: impl Into<String>) -> ProgressEvent {
        ProgressEvent {
            stage,
            elapsed: self.start.elapsed(),
            message: message.into(),
        }
    }
}
