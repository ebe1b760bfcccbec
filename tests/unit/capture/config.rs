use super::*;

#[test]
fn formats_map_to_device_modes() {
    assert_eq!("720p".parse::<CaptureFormat>().unwrap().mode_id(), 13);
    assert_eq!("1080p".parse::<CaptureFormat>().unwrap().mode_id(), 14);
    let err = "480i".parse::<CaptureFormat>().unwrap_err();
    assert!(matches!(err, FramecapError::UnsupportedFormat(ref f) if f == "480i"));
    assert_eq!(CaptureFormat::Hd1080.to_string(), "1080p");
}

#[test]
fn default_config_is_valid() {
    let cfg = CaptureToolsConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.encoder, PathBuf::from("ffmpeg"));
    assert_eq!(cfg.stop_poll_interval(), Duration::from_millis(100));
}

#[test]
fn validate_rejects_zero_limits() {
    let cfg = CaptureToolsConfig {
        max_frames: 0,
        ..CaptureToolsConfig::default()
    };
    assert!(matches!(cfg.validate(), Err(FramecapError::Validation(_))));

    let cfg = CaptureToolsConfig {
        rewrite_workers: Some(0),
        ..CaptureToolsConfig::default()
    };
    assert!(cfg.validate().is_err());

    let cfg = CaptureToolsConfig {
        decoder: PathBuf::new(),
        ..CaptureToolsConfig::default()
    };
    assert!(cfg.validate().unwrap_err().to_string().contains("decoder"));
}

#[test]
fn json_file_fills_missing_fields_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tools.json");
    std::fs::write(
        &path,
        r#"{"capture_binary": "/opt/decklink/capture", "rewrite_workers": 2}"#,
    )
    .unwrap();
    let cfg = CaptureToolsConfig::from_json_file(&path).unwrap();
    assert_eq!(cfg.capture_binary, PathBuf::from("/opt/decklink/capture"));
    assert_eq!(cfg.rewrite_workers, Some(2));
    assert_eq!(cfg.stop_poll_attempts, 5);

    std::fs::write(&path, r#"{"capturebinary": "x"}"#).unwrap();
    assert!(matches!(
        CaptureToolsConfig::from_json_file(&path),
        Err(FramecapError::Validation(_))
    ));
    assert!(CaptureToolsConfig::from_json_file(dir.path().join("missing.json")).is_err());
}
