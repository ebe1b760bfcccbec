//! Metrics computed over a capture archive.
//!
//! Per-frame series are cached through [`crate::AnalysisCache`]; everything else is derived
//! from those series on demand.

/// Largest-colored-box detection.
pub mod square;

/// Checkerboard (unpainted area) coverage.
pub mod checkerboard;
/// Per-frame entropy with optional edge transform.
pub mod entropy;
/// Changed-pixel counts between consecutive frames.
pub mod framediff;
/// Aggregated per-capture metrics.
pub mod metrics;
/// Per-device analysis settings.
pub mod profile;
/// When on-screen content stops changing.
pub mod stableframe;
/// Welch's unequal-variance t-test.
pub mod stats;
