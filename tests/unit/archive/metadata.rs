use serde_json::json;

use super::*;

#[test]
fn parses_minimal_metadata_and_keeps_unknown_fields() {
    let raw = json!({
        "version": 1,
        "date": "2012-06-01T10:00:00",
        "frameDimensions": [320, 240],
        "device": "LG-P999",
        "appname": "browser",
    });
    let meta = CaptureMetadata::from_json_slice(raw.to_string().as_bytes()).unwrap();
    assert_eq!(meta.version, 1);
    assert_eq!(meta.frame_dimensions, (320, 240));
    assert!(meta.ignore_areas.is_empty());
    assert_eq!(meta.extra.get("device"), Some(&json!("LG-P999")));

    let round: serde_json::Value = serde_json::from_slice(&meta.to_json_vec().unwrap()).unwrap();
    assert_eq!(round["appname"], json!("browser"));
    assert_eq!(round["frameDimensions"], json!([320, 240]));
}

#[test]
fn parses_ignore_areas() {
    let raw = json!({
        "version": 1,
        "date": "x",
        "frameDimensions": [100, 100],
        "ignoreAreas": [[0, 0, 100, 10]],
    });
    let meta = CaptureMetadata::from_json_slice(raw.to_string().as_bytes()).unwrap();
    assert_eq!(
        meta.ignore_areas,
        vec![BoundingBox::new(0, 0, 100, 10).unwrap()]
    );
}

#[test]
fn rejects_missing_or_unknown_version() {
    for raw in [
        json!({"date": "x", "frameDimensions": [1, 1]}),
        json!({"version": 7, "date": "x", "frameDimensions": [1, 1]}),
        json!({}),
        json!([1, 2, 3]),
    ] {
        let err = CaptureMetadata::from_json_slice(raw.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, FramecapError::Archive(_)), "{raw}: {err}");
    }

    let err = CaptureMetadata::from_json_slice(b"not json").unwrap_err();
    assert!(matches!(err, FramecapError::Archive(_)));
}

#[test]
fn caller_fields_merge_without_touching_layout() {
    let caller = json!({
        "device": "unagi",
        "version": 99,
        "frameDimensions": [1, 1],
        "ignoreAreas": [[1, 2, 3, 4]],
    });
    let merged = CaptureMetadata::new("2013-01-01T00:00:00", (640, 480))
        .merged_with(caller.as_object().unwrap())
        .unwrap();
    assert_eq!(merged.version, ARCHIVE_VERSION);
    assert_eq!(merged.frame_dimensions, (640, 480));
    assert_eq!(merged.extra.get("device"), Some(&json!("unagi")));
    assert_eq!(merged.ignore_areas.len(), 1);

    let bad = json!({"ignoreAreas": "everywhere"});
    assert!(
        CaptureMetadata::new("d", (1, 1))
            .merged_with(bad.as_object().unwrap())
            .is_err()
    );
}
