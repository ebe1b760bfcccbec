use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FramecapError::archive("x")
            .to_string()
            .contains("archive error:")
    );
    assert!(
        FramecapError::unsupported_format("x")
            .to_string()
            .contains("unsupported capture format:")
    );
    assert!(
        FramecapError::process_control("x")
            .to_string()
            .contains("process control error:")
    );
    assert!(
        FramecapError::conversion("x")
            .to_string()
            .contains("conversion error:")
    );
    assert!(
        FramecapError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        FramecapError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn frame_range_messages_name_the_index_and_kind() {
    let err = FramecapError::out_of_range(12, 10);
    assert!(err.is_frame_range());
    assert_eq!(err.to_string(), "frame 12 is out of range (frame count 10)");

    let err = FramecapError::missing_frame(3, 10);
    assert!(err.is_frame_range());
    assert_eq!(err.to_string(), "frame 3 is missing (frame count 10)");

    assert!(!FramecapError::archive("x").is_frame_range());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FramecapError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
