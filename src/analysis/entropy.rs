//! Per-frame Shannon entropy, optionally over an edge-magnitude image.
//!
//! Camera captures are too noisy for raw pixel differencing; the entropy of each frame (or of
//! its Sobel gradient) moves with the amount of rendered content instead of with sensor noise.

use image::GrayImage;

use crate::{
    archive::{cache::AnalysisCache, store::FrameStore},
    foundation::{
        core::{build_thread_pool, run_batch},
        error::FramecapResult,
    },
};

const HISTOGRAM_BINS: usize = 256;

/// Preprocessing applied before the histogram is taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDetection {
    /// Raw grayscale intensities.
    #[default]
    None,
    /// 3x3 median filter, then Sobel gradient magnitude scaled to 0..=255.
    Sobel,
}

impl EdgeDetection {
    pub fn cache_key(self) -> &'static str {
        match self {
            Self::None => "frame_entropies",
            Self::Sobel => "frame_entropies_sobel",
        }
    }
}

/// Entropy (bits) of a 256-bin histogram spanning the value range of `values`.
///
/// Bins cover `[min, max]` of the data, the last bin closed. A constant image has zero entropy.
pub fn histogram_entropy(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if hi <= lo {
        return 0.0;
    }

    let mut hist = [0u64; HISTOGRAM_BINS];
    let scale = HISTOGRAM_BINS as f64 / (hi - lo);
    for &v in values {
        let bin = (((v - lo) * scale) as usize).min(HISTOGRAM_BINS - 1);
        hist[bin] += 1;
    }

    let total = values.len() as f64;
    -hist
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            p * p.log2()
        })
        .sum::<f64>()
}

/// 3x3 median filter; borders replicate the edge pixel.
pub fn median_filter_3x3(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut window = [0u8; 9];
    for y in 0..h {
        for x in 0..w {
            let mut k = 0;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    window[k] = img.get_pixel(clamp_coord(x, dx, w), clamp_coord(y, dy, h)).0[0];
                    k += 1;
                }
            }
            window.sort_unstable();
            out.put_pixel(x, y, image::Luma([window[4]]));
        }
    }
    out
}

/// Sobel gradient magnitude, normalized so the strongest edge is 255.
///
/// Derivatives are taken in floating point; borders replicate the edge pixel. An image with no
/// edges yields all zeros.
pub fn sobel_magnitude(img: &GrayImage) -> Vec<f64> {
    let (w, h) = img.dimensions();
    let px = |x: u32, dx: i64, y: u32, dy: i64| -> f64 {
        f64::from(img.get_pixel(clamp_coord(x, dx, w), clamp_coord(y, dy, h)).0[0])
    };

    let mut mag = Vec::with_capacity(w as usize * h as usize);
    for y in 0..h {
        for x in 0..w {
            // Derivative across rows, smoothed along the row.
            let d_rows = (px(x, -1, y, 1) + 2.0 * px(x, 0, y, 1) + px(x, 1, y, 1))
                - (px(x, -1, y, -1) + 2.0 * px(x, 0, y, -1) + px(x, 1, y, -1));
            // Derivative along the row, smoothed across rows.
            let d_cols = (px(x, 1, y, -1) + 2.0 * px(x, 1, y, 0) + px(x, 1, y, 1))
                - (px(x, -1, y, -1) + 2.0 * px(x, -1, y, 0) + px(x, -1, y, 1));
            mag.push(d_rows.hypot(d_cols));
        }
    }

    let max = mag.iter().copied().fold(0.0f64, f64::max);
    if max > 0.0 {
        let k = 255.0 / max;
        for v in &mut mag {
            *v *= k;
        }
    }
    mag
}

fn clamp_coord(v: u32, delta: i64, len: u32) -> u32 {
    (i64::from(v) + delta).clamp(0, i64::from(len) - 1) as u32
}

pub fn image_entropy(img: &GrayImage, edge: EdgeDetection) -> f64 {
    match edge {
        EdgeDetection::None => {
            let values: Vec<f64> = img.as_raw().iter().map(|&v| f64::from(v)).collect();
            histogram_entropy(&values)
        }
        EdgeDetection::Sobel => histogram_entropy(&sobel_magnitude(&median_filter_3x3(img))),
    }
}

pub fn frame_entropy(store: &FrameStore, index: usize, edge: EdgeDetection) -> FramecapResult<f64> {
    Ok(image_entropy(&store.get_frame_luma(index)?, edge))
}

/// Entropy of every frame `0..=frame_count`, computed in parallel, uncached.
pub fn compute_frame_entropies(
    store: &FrameStore,
    edge: EdgeDetection,
    threads: Option<usize>,
) -> FramecapResult<Vec<f64>> {
    let pool = build_thread_pool(threads)?;
    let indices: Vec<usize> = (0..=store.frame_count()).collect();
    run_batch(&pool, &indices, |&i| frame_entropy(store, i, edge))
}

/// Cached entropy series, keyed by the edge-detection mode.
#[tracing::instrument(skip(store, cache), fields(archive = %store.path().display()))]
pub fn frame_entropies(
    store: &FrameStore,
    cache: &AnalysisCache,
    edge: EdgeDetection,
) -> FramecapResult<Vec<f64>> {
    cache.get_or_compute(edge.cache_key(), || {
        compute_frame_entropies(store, edge, None)
    })
}

pub fn overall_entropy(
    store: &FrameStore,
    cache: &AnalysisCache,
    edge: EdgeDetection,
) -> FramecapResult<f64> {
    Ok(frame_entropies(store, cache, edge)?.iter().sum())
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/entropy.rs"]
mod tests;
