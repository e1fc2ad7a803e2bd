//! # sp-av
//!
//! Subprocess execution and the media pipeline.
//!
//! This crate provides:
//!
//! - **Command execution** ([`ToolCommand`]) -- async builder with deadline,
//!   cancellation, and bounded streaming of stdout/stderr.
//! - **Jobs** ([`MediaJob`]) -- per-request parameters and their defaults.
//! - **Pipeline** ([`MediaPipeline`]) -- metadata lookup, fetch, output
//!   discovery, conditional transcode, and cleanup.
//! - **URL check** ([`url::is_supported_url`]) -- allow-list for front ends.

pub mod command;
pub mod job;
pub mod pipeline;
pub mod url;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use job::{JobPlan, MediaJob, MediaKind};
pub use pipeline::MediaPipeline;
