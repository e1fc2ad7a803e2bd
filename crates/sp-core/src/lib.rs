//! sp-core: shared errors, configuration, and progress events.
//!
//! This crate is the foundational dependency for the other sp-* crates. It
//! carries the unified error type, the pipeline [`Stage`] labels, the
//! configuration sections, and the observer types used to surface progress
//! to callers.

pub mod config;
pub mod error;
pub mod events;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result, Stage, SubprocessError};
pub use events::{DownloadProgress, ProgressSink};
