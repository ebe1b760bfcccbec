use crate::{
    analysis::{
        entropy::{EdgeDetection, frame_entropies},
        framediff::framediff_sums,
        stats::welch_t_test,
    },
    archive::{cache::AnalysisCache, store::FrameStore},
    foundation::{core::frames_to_secs, error::FramecapResult},
};

/// Default window for the entropy method, in frames on each side of the candidate.
pub const DEFAULT_ENTROPY_WINDOW: usize = 10;

/// Default significance level for the entropy method.
pub const DEFAULT_ENTROPY_P_THRESHOLD: f64 = 3.1e-5;

/// Default changed-pixel threshold for the frame-diff method.
pub const DEFAULT_DIFF_THRESHOLD: u64 = 4096;

/// How to decide when on-screen content stopped changing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum StabilityMethod {
    /// Last frame whose diff-sum exceeds `threshold`, plus one.
    FrameDiff { threshold: u64 },
    /// Last change point in the entropy series detected by Welch's t-test.
    Entropy {
        edge: EdgeDetection,
        window: usize,
        p_threshold: f64,
    },
}

/// Scan backward for the last diff-sum above `threshold`; the frame after it is stable.
///
/// Index 0 is never considered. With no such frame the second-to-last index is returned.
pub fn stable_frame_from_diffsums(diffsums: &[u64], threshold: u64) -> usize {
    for i in (1..diffsums.len()).rev() {
        if diffsums[i] > threshold {
            return i + 1;
        }
    }
    diffsums.len().saturating_sub(1)
}

/// Slide a `window`-sized split point backward over `entropies`.
///
/// At split `i` the `window` values before `i` are compared with the `window` values from `i`
/// on. The first split (from the end) whose p-value is below `p_threshold` is the stable frame;
/// `0` if none qualifies or the series is shorter than two windows.
pub fn stable_frame_from_entropies(entropies: &[f64], window: usize, p_threshold: f64) -> usize {
    if window < 2 || entropies.len() < 2 * window {
        return 0;
    }
    for i in (window..=entropies.len() - window).rev() {
        let before = &entropies[i - window..i];
        let after = &entropies[i..i + window];
        match welch_t_test(before, after) {
            Ok(r) if r.p_value < p_threshold => return i,
            Ok(_) => {}
            Err(e) => tracing::debug!(split = i, error = %e, "skipping untestable split"),
        }
    }
    0
}

#[tracing::instrument(skip(store, cache), fields(archive = %store.path().display()))]
pub fn stable_frame(
    store: &FrameStore,
    cache: &AnalysisCache,
    method: StabilityMethod,
) -> FramecapResult<usize> {
    let frame = match method {
        StabilityMethod::FrameDiff { threshold } => {
            stable_frame_from_diffsums(&framediff_sums(store, cache)?, threshold)
        }
        StabilityMethod::Entropy {
            edge,
            window,
            p_threshold,
        } => stable_frame_from_entropies(&frame_entropies(store, cache, edge)?, window, p_threshold),
    };
    tracing::debug!(frame, "stable frame");
    Ok(frame)
}

/// [`stable_frame`] in seconds from capture start.
pub fn stable_frame_time(
    store: &FrameStore,
    cache: &AnalysisCache,
    method: StabilityMethod,
) -> FramecapResult<f64> {
    Ok(frames_to_secs(stable_frame(store, cache, method)?))
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/stableframe.rs"]
mod tests;
