//! Colored-region ("square") detection.
//!
//! Markers injected into the capture stream and checkerboard placeholders are both solid
//! rectangles of a known color, so detection only needs to find the largest run of
//! matching scanlines. Each row contributes at most one span (leftmost to rightmost matching
//! pixel); this is not a connected-component search.

use image::RgbImage;

use crate::foundation::core::{BoundingBox, Rgb};

/// Default per-pixel tolerance: sum of absolute channel differences must stay below this.
pub const DEFAULT_COLOR_TOLERANCE: u16 = 30;

/// Marker shown on the device just before the region of interest starts.
pub const CAPTURE_START_COLOR: Rgb = Rgb::new(0, 255, 0);

/// Marker shown on the device once the region of interest is over.
pub const CAPTURE_END_COLOR: Rgb = Rgb::new(255, 0, 0);

/// Color the browser paints in place of content it has not rendered yet.
pub const CHECKERBOARD_COLOR: Rgb = Rgb::new(255, 0, 255);

/// All candidate boxes, in the order they were opened while scanning top to bottom.
pub fn find_squares(color: Rgb, tolerance: u16, img: &RgbImage) -> Vec<BoundingBox> {
    let mut squares: Vec<BoundingBox> = Vec::new();

    for (y, row) in img.rows().enumerate() {
        let y = y as u32;
        let mut span: Option<(u32, u32)> = None;
        for (x, px) in row.enumerate() {
            if color.manhattan_distance(px.0) < tolerance {
                let x = x as u32;
                span = Some(match span {
                    Some((left, _)) => (left, x),
                    None => (x, x),
                });
            }
        }

        let Some((left, right)) = span else {
            continue;
        };

        let mut extended = false;
        for sq in squares.iter_mut() {
            if sq.left == left && sq.right == right {
                sq.bottom = y;
                extended = true;
            }
        }
        if !extended {
            squares.push(BoundingBox {
                left,
                top: y,
                right,
                bottom: y,
            });
        }
    }

    squares
}

/// Largest box of `color` within the default tolerance, or `None`.
///
/// Ties between equal-area boxes go to the one opened first in scan order. Callers should not
/// depend on which of several equal boxes is returned.
pub fn find_biggest_square(color: Rgb, img: &RgbImage) -> Option<BoundingBox> {
    find_biggest_square_within(color, DEFAULT_COLOR_TOLERANCE, img)
}

pub fn find_biggest_square_within(
    color: Rgb,
    tolerance: u16,
    img: &RgbImage,
) -> Option<BoundingBox> {
    let mut best: Option<BoundingBox> = None;
    for sq in find_squares(color, tolerance, img) {
        match best {
            Some(b) if b.area() >= sq.area() => {}
            _ => best = Some(sq),
        }
    }
    best
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/square.rs"]
mod tests;
