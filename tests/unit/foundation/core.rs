use super::*;

#[test]
fn bounding_box_extent_and_area() {
    let b = BoundingBox::new(10, 20, 30, 25).unwrap();
    assert_eq!(b.width(), 20);
    assert_eq!(b.height(), 5);
    assert_eq!(b.area(), 100);
    assert!(!b.is_degenerate());

    let row = BoundingBox::new(3, 7, 9, 7).unwrap();
    assert_eq!(row.area(), 0);
    assert!(row.is_degenerate());

    assert!(BoundingBox::new(5, 0, 4, 1).is_err());
}

#[test]
fn bounding_box_contains_is_half_open() {
    let b = BoundingBox::new(2, 2, 4, 4).unwrap();
    assert!(b.contains(2, 2));
    assert!(b.contains(3, 3));
    assert!(!b.contains(4, 3));
    assert!(!b.contains(3, 4));
    assert!(!b.contains(1, 2));
}

#[test]
fn bounding_box_serializes_as_json_array() {
    let b = BoundingBox::new(1, 2, 3, 4).unwrap();
    assert_eq!(serde_json::to_string(&b).unwrap(), "[1,2,3,4]");
    let back: BoundingBox = serde_json::from_str("[1,2,3,4]").unwrap();
    assert_eq!(back, b);
    assert!(serde_json::from_str::<BoundingBox>("[4,2,3,4]").is_err());
}

#[test]
fn bounding_box_clip_to_image() {
    let b = BoundingBox::new(5, 5, 50, 50).unwrap();
    assert_eq!(b.clip_to(20, 30), Some(BoundingBox::new(5, 5, 20, 30).unwrap()));
    assert_eq!(b.clip_to(5, 30), None);
}

#[test]
fn rgb_manhattan_distance_sums_channels() {
    let c = Rgb::new(0, 255, 0);
    assert_eq!(c.manhattan_distance([0, 255, 0]), 0);
    assert_eq!(c.manhattan_distance([10, 250, 3]), 18);
    assert_eq!(c.manhattan_distance([255, 0, 255]), 765);
}

#[test]
fn frames_to_secs_uses_fixed_rate() {
    assert_eq!(frames_to_secs(120), 2.0);
    assert_eq!(frames_to_secs(0), 0.0);
}

#[test]
fn thread_pool_rejects_zero_workers() {
    assert!(build_thread_pool(Some(0)).is_err());
    assert!(build_thread_pool(Some(2)).is_ok());
}

#[test]
fn run_batch_keeps_order_and_reports_failures() {
    let pool = build_thread_pool(Some(2)).unwrap();
    let items: Vec<u32> = (0..16).collect();
    let doubled = run_batch(&pool, &items, |v| Ok(v * 2)).unwrap();
    assert_eq!(doubled, items.iter().map(|v| v * 2).collect::<Vec<_>>());

    let failed = run_batch(&pool, &items, |v| {
        if *v == 7 {
            Err(FramecapError::conversion("seven"))
        } else {
            Ok(*v)
        }
    });
    assert!(matches!(failed, Err(FramecapError::Conversion(_))));
}
