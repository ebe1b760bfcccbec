use super::*;
use crate::{
    foundation::core::BoundingBox,
    test_support::{gray_frame, memory_cache, paint, write_archive},
};

const MAGENTA: [u8; 3] = [255, 0, 255];

#[test]
fn percent_is_box_area_over_frame_area() {
    let dir = tempfile::tempdir().unwrap();
    let mut glitched = gray_frame(20, 10, 40);
    // Inclusive 0..=10 x 0..=5 => detector area (10 - 0) * (5 - 0) = 50
    paint(&mut glitched, BoundingBox::new(0, 0, 10, 5).unwrap(), MAGENTA);
    let frames = vec![
        gray_frame(20, 10, 40),
        gray_frame(20, 10, 40),
        glitched,
        gray_frame(20, 10, 40),
        gray_frame(20, 10, 40),
    ];
    let store = FrameStore::open(&write_archive(dir.path(), "cb.zip", &frames, Vec::new())).unwrap();
    let (cache, backend) = memory_cache(store.path());

    let percents = checkerboard_percents(&store, &cache).unwrap();
    assert_eq!(percents, vec![0.0, 0.25, 0.0]);
    assert_eq!(checkerboard_area_duration(&store, &cache).unwrap(), 0.25);
    assert_eq!(backend.writes(), 1);
    assert_eq!(cache.get(CHECKERBOARD_PERCENTS_KEY), Some(percents));
}

#[test]
fn clean_capture_has_no_checkerboarding() {
    let dir = tempfile::tempdir().unwrap();
    let frames: Vec<_> = (0..4).map(|v| gray_frame(8, 8, v * 30)).collect();
    let store = FrameStore::open(&write_archive(dir.path(), "clean.zip", &frames, Vec::new())).unwrap();
    let (cache, _) = memory_cache(store.path());
    assert_eq!(checkerboard_area_duration(&store, &cache).unwrap(), 0.0);
}
