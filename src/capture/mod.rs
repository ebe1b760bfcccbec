//! Capturing a device's screen and turning the raw stream into an archive.

/// External tools and capture formats.
pub mod config;
/// Capture session lifecycle.
pub mod controller;
/// Raw stream to archive conversion.
pub mod convert;
/// The capture child process.
pub mod supervisor;
