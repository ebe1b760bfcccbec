use image::{GrayImage, Luma};

use super::*;
use crate::test_support::{gray_frame, memory_cache, write_archive};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn split_image(w: u32, h: u32) -> GrayImage {
    GrayImage::from_fn(w, h, |x, _| if x < w / 2 { Luma([0]) } else { Luma([255]) })
}

#[test]
fn constant_values_have_zero_entropy() {
    assert_eq!(histogram_entropy(&[]), 0.0);
    assert_eq!(histogram_entropy(&[7.0; 50]), 0.0);
}

#[test]
fn equiprobable_values_give_log2_bins() {
    assert!(close(histogram_entropy(&[0.0, 255.0, 0.0, 255.0]), 1.0));
    assert!(close(histogram_entropy(&[0.0, 85.0, 170.0, 255.0]), 2.0));
}

#[test]
fn raw_entropy_of_half_black_half_white_is_one_bit() {
    assert!(close(image_entropy(&split_image(8, 4), EdgeDetection::None), 1.0));
}

#[test]
fn median_filter_drops_isolated_pixels() {
    let mut img = GrayImage::from_pixel(5, 5, Luma([10]));
    img.put_pixel(2, 2, Luma([250]));
    let filtered = median_filter_3x3(&img);
    assert!(filtered.pixels().all(|p| p.0[0] == 10));
}

#[test]
fn sobel_magnitude_is_normalized_and_zero_on_flat_images() {
    let flat = GrayImage::from_pixel(6, 6, Luma([128]));
    assert!(sobel_magnitude(&flat).iter().all(|&v| v == 0.0));
    assert_eq!(image_entropy(&flat, EdgeDetection::Sobel), 0.0);

    let mag = sobel_magnitude(&split_image(8, 8));
    let max = mag.iter().copied().fold(0.0, f64::max);
    assert!(close(max, 255.0));
    // Far from the step there is no gradient.
    assert_eq!(mag[0], 0.0);
    assert!(image_entropy(&split_image(8, 8), EdgeDetection::Sobel) > 0.0);
}

#[test]
fn entropy_series_covers_every_frame_and_is_cached_per_mode() {
    let dir = tempfile::tempdir().unwrap();
    let mut frames: Vec<_> = (0..5u8).map(|v| gray_frame(8, 8, v * 40)).collect();
    frames[2] = image::RgbImage::from_fn(8, 8, |x, _| {
        if x < 4 {
            image::Rgb([0, 0, 0])
        } else {
            image::Rgb([255, 255, 255])
        }
    });
    let store = FrameStore::open(&write_archive(dir.path(), "e.zip", &frames, Vec::new())).unwrap();
    let (cache, backend) = memory_cache(store.path());

    let raw = frame_entropies(&store, &cache, EdgeDetection::None).unwrap();
    assert_eq!(raw.len(), store.frame_count() + 1);
    assert_eq!(raw[0], 0.0);
    assert!(close(raw[2], 1.0));

    let again = frame_entropies(&store, &cache, EdgeDetection::None).unwrap();
    assert_eq!(raw, again);
    assert_eq!(backend.writes(), 1);

    let sobel = frame_entropies(&store, &cache, EdgeDetection::Sobel).unwrap();
    assert_eq!(sobel.len(), raw.len());
    assert_eq!(backend.writes(), 2);
    assert!(cache.get("frame_entropies_sobel").is_some());

    assert!(close(
        overall_entropy(&store, &cache, EdgeDetection::None).unwrap(),
        raw.iter().sum::<f64>()
    ));
}

#[test]
fn parallel_and_single_threaded_results_match() {
    let dir = tempfile::tempdir().unwrap();
    let frames: Vec<_> = (0..6u8)
        .map(|v| {
            image::RgbImage::from_fn(10, 10, |x, y| {
                let g = ((x * 25 + y * 7) as u8).wrapping_add(v * 13);
                image::Rgb([g, g, g])
            })
        })
        .collect();
    let store = FrameStore::open(&write_archive(dir.path(), "p.zip", &frames, Vec::new())).unwrap();
    let one = compute_frame_entropies(&store, EdgeDetection::Sobel, Some(1)).unwrap();
    let many = compute_frame_entropies(&store, EdgeDetection::Sobel, Some(4)).unwrap();
    assert_eq!(one, many);
}
