//! Progress reporting for chunked operations.
//!
//! The engine does not render anything itself. It drives a [`ProgressSink`]
//! supplied by the caller (a progress bar, a log, a channel to a UI task)
//! through a [`ProgressReporter`], which exists only while a chunked operation
//! is running. Operations that fit into a single call never touch the sink.

use log::{debug, info};

/// Message shown when a chunked operation starts.
pub const START_MESSAGE: &str = "Licenses are being processed. Please have a little patience.";

/// Receiver of progress updates.
pub trait ProgressSink: Send + Sync {
    /// A chunked operation over `total` items is starting.
    fn begin(&self, total: usize, message: &str);

    /// `completed` of the total items are done.
    fn update(&self, completed: usize, message: &str);

    /// The operation has finished or was aborted; release any resources.
    fn teardown(&self);
}

/// Sink that discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn begin(&self, _total: usize, _message: &str) {}

    fn update(&self, _completed: usize, _message: &str) {}

    fn teardown(&self) {}
}

/// Sink that writes progress through the `log` facade.
#[derive(Debug, Clone, Default)]
pub struct LogProgressSink {
    label: String,
}

impl LogProgressSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressSink for LogProgressSink {
    fn begin(&self, total: usize, message: &str) {
        info!("[{}] {} ({} items)", self.label, message, total);
    }

    fn update(&self, completed: usize, message: &str) {
        info!("[{}] {} ({} done)", self.label, message, completed);
    }

    fn teardown(&self) {
        debug!("[{}] progress finished", self.label);
    }
}

/// Completed/total counters of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressState {
    pub completed: usize,
    pub total: usize,
}

/// Progress of one running chunked operation.
///
/// Tearing down is idempotent and also happens on drop, so the sink is
/// released on every exit path, including a dropped future.
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    state: ProgressState,
    label: String,
    torn_down: bool,
}

impl<'a> ProgressReporter<'a> {
    /// Start reporting on `sink` for `total` items.
    pub fn start(sink: &'a dyn ProgressSink, total: usize, label: impl Into<String>) -> Self {
        sink.begin(total, START_MESSAGE);
        Self {
            sink,
            state: ProgressState {
                completed: 0,
                total,
            },
            label: label.into(),
            torn_down: false,
        }
    }

    /// Record `completed` items and forward an "X of Y <label>" message.
    pub fn update(&mut self, completed: usize) {
        if self.torn_down {
            return;
        }
        self.state.completed = completed;
        let message = format!("{} of {} {}", completed, self.state.total, self.label);
        self.sink.update(completed, &message);
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn teardown(&mut self) {
        if !self.torn_down {
            self.torn_down = true;
            self.sink.teardown();
        }
    }
}

impl Drop for ProgressReporter<'_> {
    fn drop(&mut self) {
        self.teardown();
    }
}
