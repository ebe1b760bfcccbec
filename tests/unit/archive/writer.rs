use image::{GrayImage, Luma};

use super::*;
use crate::archive::store::FrameStore;

#[test]
fn finish_requires_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = ArchiveWriter::create(dir.path().join("x.zip")).unwrap();
    w.write_frame_png(0, b"not checked here").unwrap();
    assert!(matches!(w.finish(), Err(FramecapError::Validation(_))));
}

#[test]
fn creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/deeper/cap.zip");
    let mut w = ArchiveWriter::create(&path).unwrap();
    w.write_metadata(&CaptureMetadata::new("d", (2, 2))).unwrap();
    assert_eq!(w.finish().unwrap(), path);
    assert!(path.exists());
}

#[test]
fn written_frames_read_back_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cap.zip");
    let mut w = ArchiveWriter::create(&path).unwrap();
    w.write_metadata(&CaptureMetadata::new("d", (3, 2))).unwrap();
    for i in 0..4 {
        let img = GrayImage::from_pixel(3, 2, Luma([i as u8 * 10]));
        w.write_frame_image(i, &DynamicImage::ImageLuma8(img)).unwrap();
    }
    w.finish().unwrap();

    let store = FrameStore::open(&path).unwrap();
    assert_eq!(store.frame_count(), 2);
    assert_eq!(store.get_frame_luma(2).unwrap().get_pixel(1, 1).0, [20]);
}
