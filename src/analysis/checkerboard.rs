use crate::{
    analysis::square::{CHECKERBOARD_COLOR, find_biggest_square},
    archive::{cache::AnalysisCache, store::FrameStore},
    foundation::error::FramecapResult,
};

pub const CHECKERBOARD_PERCENTS_KEY: &str = "checkerboard_percents";

/// Fraction of frame `index` covered by the largest checkerboard-colored box.
pub fn checkerboard_percent(store: &FrameStore, index: usize) -> FramecapResult<f64> {
    let frame = store.get_frame_rgb(index)?;
    let total = u64::from(frame.width()) * u64::from(frame.height());
    if total == 0 {
        return Ok(0.0);
    }
    Ok(match find_biggest_square(CHECKERBOARD_COLOR, &frame) {
        Some(sq) => sq.area() as f64 / total as f64,
        None => 0.0,
    })
}

/// Per-frame checkerboard coverage for frames `1..=frame_count`, cached.
#[tracing::instrument(skip(store, cache), fields(archive = %store.path().display()))]
pub fn checkerboard_percents(
    store: &FrameStore,
    cache: &AnalysisCache,
) -> FramecapResult<Vec<f64>> {
    cache.get_or_compute(CHECKERBOARD_PERCENTS_KEY, || {
        (1..=store.frame_count())
            .map(|i| checkerboard_percent(store, i))
            .collect()
    })
}

/// Sum of the per-frame checkerboard percentages.
///
/// This is an area-times-frames accumulator, not a duration in seconds.
pub fn checkerboard_area_duration(
    store: &FrameStore,
    cache: &AnalysisCache,
) -> FramecapResult<f64> {
    Ok(checkerboard_percents(store, cache)?.iter().sum())
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/checkerboard.rs"]
mod tests;
