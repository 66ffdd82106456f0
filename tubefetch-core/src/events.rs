//! Progress events streamed from background workers to the UI.
//!
//! Provisioning and download jobs run on the tokio runtime and never touch
//! UI state directly. They report through an unbounded mpsc channel which the
//! UI thread drains on its own schedule; events for a given job arrive in
//! emission order.

use std::path::Path;

use tokio::sync::mpsc;

/// Which stage of the pipeline an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Tool bootstrap (fetching yt-dlp / ffmpeg).
    Provisioning,
    /// Media transfer in progress.
    Downloading,
    /// Post-processing (container merge or audio extraction).
    Processing,
    /// Terminal success; the message carries the output file path.
    Done,
    /// Terminal failure; the message carries the classified error.
    Error,
}

/// A single progress update.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,
    /// Percent complete (0-100), or `None` when indeterminate.
    pub percent: Option<f32>,
    /// Human-readable status line.
    pub message: String,
}

impl ProgressEvent {
    pub fn provisioning(percent: Option<f32>, message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Provisioning,
            percent,
            message: message.into(),
        }
    }

    pub fn downloading(percent: Option<f32>, message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Downloading,
            percent,
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Processing,
            percent: None,
            message: message.into(),
        }
    }

    pub fn done(output: &Path) -> Self {
        Self {
            phase: Phase::Done,
            percent: Some(100.0),
            message: output.display().to_string(),
        }
    }

    /// Terminal success without a captured output path.
    pub fn done_message(message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Done,
            percent: Some(100.0),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Error,
            percent: None,
            message: message.into(),
        }
    }

    /// True for events that end a job (`Done` or `Error`).
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Error)
    }
}

/// Sender for progress events.
pub type EventSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiver for progress events.
pub type EventReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Create an event channel connecting a worker to the UI thread.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
