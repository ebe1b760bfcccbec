use super::*;
use crate::{
    analysis::profile::CaptureDevice,
    test_support::{gray_frame, memory_cache, write_archive},
};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

#[test]
fn response_skips_sleeps_and_earlier_frames() {
    let actions = vec![Action::new("sleep", 0.0), Action::new("tap", 0.02)];
    let diffsums = [0, 6400, 0, 6400];
    // Diff-sum 1 is at 1/60 s, before the tap.
    let t = response_time_from_diffsums(&diffsums, &actions, INPUT_RESPONSE_THRESHOLD).unwrap();
    assert!(close(t, 3.0 / 60.0 - 0.02));
}

#[test]
fn response_is_none_without_input_or_change() {
    let sleeps = vec![Action::new("sleep", 0.0)];
    assert_eq!(response_time_from_diffsums(&[9999, 9999], &sleeps, 4096), None);
    let taps = vec![Action::new("tap", 0.0)];
    assert_eq!(response_time_from_diffsums(&[0, 4095, 100], &taps, 4096), None);
    assert_eq!(response_time_from_diffsums(&[0, 4096], &taps, 4096), Some(1.0 / 60.0));
}

#[test]
fn actions_keep_unknown_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("actions.json");
    std::fs::write(&path, r#"[{"type":"tap","start":1.5,"x":10,"y":20}]"#).unwrap();
    let actions = load_actions(&path).unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, "tap");
    assert_eq!(actions[0].start, 1.5);
    assert_eq!(actions[0].extra["x"], 10);

    std::fs::write(&path, "{").unwrap();
    assert!(matches!(load_actions(&path), Err(FramecapError::Serde(_))));
}

#[test]
fn standard_metrics_for_decklink_capture() {
    let dir = tempfile::tempdir().unwrap();
    let levels = [0u8, 0, 0, 200, 200, 200, 200];
    let frames: Vec<_> = levels.iter().map(|&v| gray_frame(80, 80, v)).collect();
    let store = FrameStore::open(&write_archive(dir.path(), "m.zip", &frames, Vec::new())).unwrap();
    let (cache, _) = memory_cache(store.path());

    let actions = vec![Action::new("sleep", 0.0), Action::new("tap", 0.0)];
    let profile = CaptureDevice::Decklink.profile();
    let m = standard_metrics(&store, &cache, &profile, &actions).unwrap();

    assert_eq!(m.unique_frames, 2);
    assert!(close(m.fps, 24.0));
    assert_eq!(m.checkerboard, 0.0);
    assert_eq!(m.time_to_response, Some(1.0 / 60.0));
    assert!(close(m.stable_frame, 2.0 / 60.0));

    assert_eq!(
        time_to_response(&store, &cache, &actions, INPUT_RESPONSE_THRESHOLD).unwrap(),
        Some(1.0 / 60.0)
    );
    let json = serde_json::to_value(&m).unwrap();
    assert_eq!(json["unique_frames"], 2);

    let quiet = standard_metrics(&store, &cache, &profile, &[]).unwrap();
    assert_eq!(quiet.time_to_response, None);
    assert!(serde_json::to_value(&quiet).unwrap().get("time_to_response").is_none());
}
