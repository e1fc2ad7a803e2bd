//! Supported source URL check.
//!
//! A plain substring allow-list. Anything the fetcher can handle beyond
//! these shapes is still accepted by the pipeline itself; only front ends
//! consult this.

const SUPPORTED_PATTERNS: &[&str] = &[
    "youtube.com/watch",
    "youtu.be/",
    "youtube.com/embed/",
    "youtube.com/v/",
    "youtube.com/shorts/",
];

/// Whether `url` looks like a supported video page.
pub fn is_supported_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && SUPPORTED_PATTERNS.iter().any(|p| url.contains(p))
}
