//! framecap captures a device's screen through an external capture card and measures how
//! smoothly content was rendered.
//!
//! - Record with a [`CaptureController`]: start, stop, and convert into a capture archive
//! - Open the archive as a [`FrameStore`] and memoize per-frame series in an [`AnalysisCache`]
//! - Compute metrics from [`analysis`] (unique frames, fps, checkerboarding, stable frame)
#![forbid(unsafe_code)]

mod foundation;

/// Metrics computed over capture archives.
pub mod analysis;
/// Capture archive format and analysis side-store.
pub mod archive;
/// Capture process control and raw-stream conversion.
pub mod capture;

pub use crate::foundation::core::{BoundingBox, FRAME_RATE, Rgb, frames_to_secs};
pub use crate::foundation::error::{FramecapError, FramecapResult, FrameRangeKind};

pub use crate::analysis::metrics::{Action, StandardMetrics, standard_metrics};
pub use crate::analysis::profile::{AnalysisProfile, CaptureDevice};
pub use crate::analysis::stableframe::StabilityMethod;
pub use crate::archive::cache::{AnalysisCache, CacheBackend, FileCacheBackend, MemoryCacheBackend};
pub use crate::archive::metadata::CaptureMetadata;
pub use crate::archive::store::FrameStore;
pub use crate::archive::writer::ArchiveWriter;
pub use crate::capture::config::{CaptureFormat, CaptureToolsConfig};
pub use crate::capture::controller::{CaptureController, CaptureState};
pub use crate::capture::convert::{ConversionReport, ConvertOpts};
pub use crate::capture::supervisor::{CaptureSupervisor, FrameCounter, SupervisorState};

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
pub(crate) mod test_support;
