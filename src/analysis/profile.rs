use crate::{
    analysis::{
        entropy::EdgeDetection,
        stableframe::{
            DEFAULT_DIFF_THRESHOLD, DEFAULT_ENTROPY_P_THRESHOLD, DEFAULT_ENTROPY_WINDOW,
            StabilityMethod,
        },
    },
    foundation::error::{FramecapError, FramecapResult},
};

/// Kind of hardware the frames were captured with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureDevice {
    /// HDMI capture card: clean digital frames.
    #[default]
    Decklink,
    /// Camera pointed at the screen: sensor noise on every frame.
    Pointgrey,
}

impl CaptureDevice {
    pub const ALL: [CaptureDevice; 2] = [CaptureDevice::Decklink, CaptureDevice::Pointgrey];

    pub fn name(self) -> &'static str {
        match self {
            Self::Decklink => "decklink",
            Self::Pointgrey => "pointgrey",
        }
    }

    /// The analysis settings recorded results for this device were produced with.
    pub fn profile(self) -> AnalysisProfile {
        match self {
            Self::Decklink => AnalysisProfile {
                device: self,
                unique_frame_threshold: 0,
                stability: StabilityMethod::FrameDiff {
                    threshold: DEFAULT_DIFF_THRESHOLD,
                },
            },
            Self::Pointgrey => AnalysisProfile {
                device: self,
                unique_frame_threshold: 2048,
                stability: StabilityMethod::Entropy {
                    edge: EdgeDetection::Sobel,
                    window: DEFAULT_ENTROPY_WINDOW,
                    p_threshold: DEFAULT_ENTROPY_P_THRESHOLD,
                },
            },
        }
    }
}

impl std::fmt::Display for CaptureDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for CaptureDevice {
    type Err = FramecapError;

    fn from_str(s: &str) -> FramecapResult<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                FramecapError::validation(format!(
                    "capture device must be one of: decklink, pointgrey (got '{s}')"
                ))
            })
    }
}

/// Thresholds and methods used to turn a capture into metrics.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisProfile {
    pub device: CaptureDevice,
    /// Diff-sums at or below this do not count as a new frame.
    pub unique_frame_threshold: u64,
    pub stability: StabilityMethod,
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/profile.rs"]
mod tests;
