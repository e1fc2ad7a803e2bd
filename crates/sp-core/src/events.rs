//! Progress events surfaced to optional observers.
//!
//! Events are transient: they are handed to the observer and never stored.
//! Every producer takes a [`ProgressSink`], which may be empty, so call sites
//! never have to check for a missing observer themselves.

use std::fmt;
use std::sync::Arc;

/// A single progress notification.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// Bytes received so far (0 when the producer does not count bytes).
    pub bytes_downloaded: u64,
    /// Total bytes expected, if known.
    pub total_bytes: Option<u64>,
    /// Completion percentage (0.0 to 100.0), if it can be computed.
    pub percentage: Option<f64>,
    /// Human-readable stage label.
    pub stage: String,
}

impl DownloadProgress {
    /// An event that only carries a stage label.
    pub fn stage(stage: impl Into<String>) -> Self {
        Self {
            bytes_downloaded: 0,
            total_bytes: None,
            percentage: None,
            stage: stage.into(),
        }
    }

    /// A byte-count event. The percentage is omitted when the total is
    /// unknown or zero.
    pub fn bytes(stage: impl Into<String>, bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percentage = total_bytes
            .filter(|total| *total > 0)
            .map(|total| (bytes_downloaded as f64 / total as f64 * 100.0).min(100.0));
        Self {
            bytes_downloaded,
            total_bytes,
            percentage,
            stage: stage.into(),
        }
    }

    /// Terminal event with a 100% percentage.
    pub fn completed() -> Self {
        Self {
            percentage: Some(100.0),
            ..Self::stage("Completed")
        }
    }
}

/// Observer callback type.
pub type ProgressFn = dyn Fn(DownloadProgress) + Send + Sync;

/// Optional, cheaply clonable progress observer.
#[derive(Clone, Default)]
pub struct ProgressSink {
    observer: Option<Arc<ProgressFn>>,
}

impl ProgressSink {
    /// A sink that drops every event.
    pub fn none() -> Self {
        Self { observer: None }
    }

    /// A sink forwarding events to `f`.
    pub fn new(f: impl Fn(DownloadProgress) + Send + Sync + 'static) -> Self {
        Self {
            observer: Some(Arc::new(f)),
        }
    }

    /// Whether an observer is attached.
    pub fn is_active(&self) -> bool {
        self.observer.is_some()
    }

    /// Deliver an event, if anyone is listening.
    pub fn emit(&self, event: DownloadProgress) {
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }

    /// Shorthand for a stage-only event.
    pub fn stage(&self, label: &str) {
        if self.observer.is_some() {
            self.emit(DownloadProgress::stage(label));
        }
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink")
            .field("active", &self.is_active())
            .finish()
    }
}

impl<F> From<F> for ProgressSink
where
    F: Fn(DownloadProgress) + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}
