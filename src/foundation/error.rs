/// Convenience result type used across framecap.
pub type FramecapResult<T> = Result<T, FramecapError>;

/// Why a frame lookup failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameRangeKind {
    /// The index is past the last frame of the archive.
    OutOfRange,
    /// The index is in range but the archive has no image entry for it.
    MissingFrame,
}

impl std::fmt::Display for FrameRangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange => f.write_str("out of range"),
            Self::MissingFrame => f.write_str("missing"),
        }
    }
}

/// Top-level error taxonomy used by capture and analysis APIs.
#[derive(thiserror::Error, Debug)]
pub enum FramecapError {
    /// Malformed or missing capture archive.
    #[error("archive error: {0}")]
    Archive(String),

    /// Out-of-bounds or missing frame.
    #[error("frame {index} is {kind} (frame count {frame_count})")]
    FrameRange {
        /// Requested frame index.
        index: usize,
        /// Frame count of the archive that was asked.
        frame_count: usize,
        /// Failure kind.
        kind: FrameRangeKind,
    },

    /// Unrecognized capture format or device mode.
    #[error("unsupported capture format: {0}")]
    UnsupportedFormat(String),

    /// Lifecycle precondition violation on the capture process.
    #[error("process control error: {0}")]
    ProcessControl(String),

    /// Failure anywhere in the raw-capture to archive pipeline.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Invalid caller-provided arguments or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FramecapError {
    /// Build a [`FramecapError::Archive`] value.
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Build a [`FramecapError::FrameRange`] for an index past the end.
    pub fn out_of_range(index: usize, frame_count: usize) -> Self {
        Self::FrameRange {
            index,
            frame_count,
            kind: FrameRangeKind::OutOfRange,
        }
    }

    /// Build a [`FramecapError::FrameRange`] for an absent image entry.
    pub fn missing_frame(index: usize, frame_count: usize) -> Self {
        Self::FrameRange {
            index,
            frame_count,
            kind: FrameRangeKind::MissingFrame,
        }
    }

    /// Build a [`FramecapError::UnsupportedFormat`] value.
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Build a [`FramecapError::ProcessControl`] value.
    pub fn process_control(msg: impl Into<String>) -> Self {
        Self::ProcessControl(msg.into())
    }

    /// Build a [`FramecapError::Conversion`] value.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Build a [`FramecapError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FramecapError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Returns `true` for [`FramecapError::FrameRange`] errors.
    pub fn is_frame_range(&self) -> bool {
        matches!(self, Self::FrameRange { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
