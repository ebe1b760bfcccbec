use super::*;
use crate::test_support::{gray_frame, memory_cache, write_archive};

const NOISE: [f64; 10] = [0.03, -0.02, 0.01, -0.04, 0.02, 0.0, -0.01, 0.04, -0.03, 0.01];

fn step_series() -> Vec<f64> {
    let mut s: Vec<f64> = (0..20).map(|i| 5.0 + NOISE[i % 10]).collect();
    s.extend((0..20).map(|i| 2.0 + NOISE[(i + 3) % 10]));
    s
}

#[test]
fn diff_method_returns_frame_after_last_change() {
    assert_eq!(stable_frame_from_diffsums(&[0, 0, 50, 0, 0], 10), 3);
    assert_eq!(stable_frame_from_diffsums(&[0, 0, 50, 0, 90], 10), 5);
}

#[test]
fn diff_method_defaults_to_second_to_last() {
    assert_eq!(stable_frame_from_diffsums(&[0, 1, 2, 3], 10), 3);
    // Index 0 is never a candidate.
    assert_eq!(stable_frame_from_diffsums(&[9999, 0, 0], 10), 2);
    assert_eq!(stable_frame_from_diffsums(&[], 10), 0);
}

#[test]
fn entropy_method_finds_last_significant_split() {
    let series = step_series();
    assert_eq!(
        stable_frame_from_entropies(&series, DEFAULT_ENTROPY_WINDOW, DEFAULT_ENTROPY_P_THRESHOLD),
        21
    );
}

#[test]
fn entropy_method_returns_zero_without_change() {
    let flat: Vec<f64> = (0..40).map(|i| 3.0 + NOISE[i % 10]).collect();
    assert_eq!(
        stable_frame_from_entropies(&flat, DEFAULT_ENTROPY_WINDOW, DEFAULT_ENTROPY_P_THRESHOLD),
        0
    );
    assert_eq!(stable_frame_from_entropies(&step_series()[..15], 10, 0.05), 0);
}

#[test]
fn stable_frame_uses_cached_diffsums() {
    let dir = tempfile::tempdir().unwrap();
    let levels = [0u8, 0, 0, 200, 200, 200, 200];
    let frames: Vec<_> = levels.iter().map(|&v| gray_frame(80, 80, v)).collect();
    let store = crate::archive::store::FrameStore::open(&write_archive(
        dir.path(),
        "s.zip",
        &frames,
        Vec::new(),
    ))
    .unwrap();
    let (cache, backend) = memory_cache(store.path());

    // frames 1..=5 => diffsums [0, 6400, 0, 0]
    let method = StabilityMethod::FrameDiff {
        threshold: DEFAULT_DIFF_THRESHOLD,
    };
    assert_eq!(stable_frame(&store, &cache, method).unwrap(), 2);
    assert_eq!(stable_frame_time(&store, &cache, method).unwrap(), 2.0 / 60.0);
    assert_eq!(backend.writes(), 1);
}

#[test]
fn stability_method_serializes_with_tag() {
    let m = StabilityMethod::Entropy {
        edge: EdgeDetection::Sobel,
        window: 10,
        p_threshold: 3.1e-5,
    };
    let v = serde_json::to_value(m).unwrap();
    assert_eq!(v["method"], "entropy");
    assert_eq!(v["edge"], "sobel");
}
