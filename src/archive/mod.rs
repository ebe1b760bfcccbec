//! The capture archive container and its analysis side-store.

/// Metric side-store keyed by archive path.
pub mod cache;
/// `metadata.json` model.
pub mod metadata;
/// Read access to frames and metadata.
pub mod store;
/// Building new archives.
pub mod writer;
