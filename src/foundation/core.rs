use crate::foundation::error::{FramecapError, FramecapResult};

/// Frame rate of every capture this crate produces and analyzes.
pub const FRAME_RATE: u32 = 60;

/// Converts a frame count into seconds at [`FRAME_RATE`].
pub fn frames_to_secs(frames: usize) -> f64 {
    frames as f64 / f64::from(FRAME_RATE)
}

/// Straight 8-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Sum of absolute per-channel differences.
    pub fn manhattan_distance(self, px: [u8; 3]) -> u16 {
        u16::from(self.r.abs_diff(px[0]))
            + u16::from(self.g.abs_diff(px[1]))
            + u16::from(self.b.abs_diff(px[2]))
    }
}

/// Pixel rectangle `[left, top, right, bottom]`.
///
/// When produced by the region detector the right/bottom edges are the last matching pixel
/// (inclusive). When used as a crop or ignore rectangle they are treated as exclusive, so
/// `width()`/`height()` are simply `right - left` and `bottom - top`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "[u32; 4]", into = "[u32; 4]")]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> FramecapResult<Self> {
        if left > right || top > bottom {
            return Err(FramecapError::validation(format!(
                "bounding box [{left}, {top}, {right}, {bottom}] has negative extent"
            )));
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn width(self) -> u32 {
        self.right - self.left
    }

    pub fn height(self) -> u32 {
        self.bottom - self.top
    }

    /// `width * height`; zero for single-row or single-column boxes.
    pub fn area(self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn is_degenerate(self) -> bool {
        self.area() == 0
    }

    /// Half-open containment test (`left <= x < right`, `top <= y < bottom`).
    pub fn contains(self, x: u32, y: u32) -> bool {
        self.left <= x && x < self.right && self.top <= y && y < self.bottom
    }

    /// Clip to an image of the given size. Returns `None` if nothing is left.
    pub fn clip_to(self, width: u32, height: u32) -> Option<Self> {
        let right = self.right.min(width);
        let bottom = self.bottom.min(height);
        if self.left >= right || self.top >= bottom {
            return None;
        }
        Some(Self {
            left: self.left,
            top: self.top,
            right,
            bottom,
        })
    }
}

impl TryFrom<[u32; 4]> for BoundingBox {
    type Error = FramecapError;

    fn try_from(v: [u32; 4]) -> Result<Self, Self::Error> {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.left, b.top, b.right, b.bottom]
    }
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> FramecapResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(FramecapError::validation("worker count must be >= 1 when set"));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| FramecapError::validation(format!("failed to build rayon thread pool: {e}")))
}

/// Runs `job` for every item on `pool` and waits for all of them.
///
/// Results come back in input order. If any job failed, the first failure (by input order) is
/// returned after the whole batch has finished.
pub(crate) fn run_batch<I, T, F>(pool: &rayon::ThreadPool, items: &[I], job: F) -> FramecapResult<Vec<T>>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> FramecapResult<T> + Sync,
{
    use rayon::prelude::*;

    let results = pool.install(|| items.par_iter().map(&job).collect::<Vec<_>>());
    let mut out = Vec::with_capacity(results.len());
    for r in results {
        out.push(r?);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
