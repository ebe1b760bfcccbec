use image::{GrayImage, RgbImage};

use crate::{
    archive::{cache::AnalysisCache, store::FrameStore},
    foundation::{
        core::BoundingBox,
        error::{FramecapError, FramecapResult},
    },
};

/// Per-pixel grayscale difference (0-255) a pixel must exceed to count as changed.
pub const PIXEL_DIFF_THRESHOLD: f64 = 5.0;

pub const DIFFSUMS_KEY: &str = "diffsums";

/// Number of pixels differing by more than `threshold` between two grayscale frames.
///
/// Pixels inside any of `ignore_areas` (half-open rectangles) never count.
pub fn count_changed_pixels(
    prev: &GrayImage,
    next: &GrayImage,
    ignore_areas: &[BoundingBox],
    threshold: f64,
) -> FramecapResult<u64> {
    if prev.dimensions() != next.dimensions() {
        return Err(FramecapError::validation(format!(
            "cannot diff frames of different sizes ({:?} vs {:?})",
            prev.dimensions(),
            next.dimensions()
        )));
    }

    let mut changed = 0u64;
    for ((x, y, a), b) in prev.enumerate_pixels().zip(next.pixels()) {
        let diff = f64::from(a.0[0].abs_diff(b.0[0]));
        if diff > threshold && !ignore_areas.iter().any(|r| r.contains(x, y)) {
            changed += 1;
        }
    }
    Ok(changed)
}

/// Changed-pixel counts between consecutive frames `1..=frame_count`, uncached.
///
/// Frame 0 is the pre-start padding frame and is not compared. The result has
/// `frame_count - 1` entries; entry `k` compares frame `k + 2` against frame `k + 1`.
#[tracing::instrument(skip(store), fields(archive = %store.path().display()))]
pub fn compute_framediff_sums(store: &FrameStore, threshold: f64) -> FramecapResult<Vec<u64>> {
    let ignore = &store.metadata().ignore_areas;
    let n = store.frame_count();
    let mut sums = Vec::with_capacity(n.saturating_sub(1));
    let mut prev: Option<GrayImage> = None;

    for i in 1..=n {
        let frame = store.get_frame_luma(i)?;
        if let Some(p) = &prev {
            sums.push(count_changed_pixels(p, &frame, ignore, threshold)?);
        }
        prev = Some(frame);
    }
    Ok(sums)
}

/// Cached frame-difference sums at [`PIXEL_DIFF_THRESHOLD`].
pub fn framediff_sums(store: &FrameStore, cache: &AnalysisCache) -> FramecapResult<Vec<u64>> {
    let series = cache.get_or_compute(DIFFSUMS_KEY, || {
        Ok(compute_framediff_sums(store, PIXEL_DIFF_THRESHOLD)?
            .into_iter()
            .map(|v| v as f64)
            .collect())
    })?;
    Ok(series.into_iter().map(|v| v.max(0.0) as u64).collect())
}

/// `1 + |{ d in diffsums : d > threshold }|`; the first frame always counts.
pub fn unique_frames_from_diffsums(diffsums: &[u64], threshold: u64) -> usize {
    1 + diffsums.iter().filter(|&&d| d > threshold).count()
}

pub fn unique_frame_count(
    store: &FrameStore,
    cache: &AnalysisCache,
    threshold: u64,
) -> FramecapResult<usize> {
    Ok(unique_frames_from_diffsums(
        &framediff_sums(store, cache)?,
        threshold,
    ))
}

/// Unique frames per second of capture. Zero for an empty capture.
pub fn fps(store: &FrameStore, cache: &AnalysisCache, threshold: u64) -> FramecapResult<f64> {
    let length = store.length();
    if length <= 0.0 {
        return Ok(0.0);
    }
    Ok(unique_frame_count(store, cache, threshold)? as f64 / length)
}

/// Visualize the difference between two frames.
///
/// Each output pixel is the per-channel absolute difference, except pixels where any channel
/// moved by at least [`PIXEL_DIFF_THRESHOLD`], which are painted solid red.
pub fn framediff_image(store: &FrameStore, a: usize, b: usize) -> FramecapResult<RgbImage> {
    let fa = store.get_frame_rgb(a)?;
    let fb = store.get_frame_rgb(b)?;
    let (w, h) = fa.dimensions();
    let mut out = RgbImage::new(w, h);
    for ((pa, pb), po) in fa.pixels().zip(fb.pixels()).zip(out.pixels_mut()) {
        let d = [
            pa.0[0].abs_diff(pb.0[0]),
            pa.0[1].abs_diff(pb.0[1]),
            pa.0[2].abs_diff(pb.0[2]),
        ];
        po.0 = if d.iter().any(|&c| f64::from(c) >= PIXEL_DIFF_THRESHOLD) {
            [255, 0, 0]
        } else {
            d
        };
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/framediff.rs"]
mod tests;
