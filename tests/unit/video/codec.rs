use super::*;

#[test]
fn tagged_payload_splits_keyframe_flag() {
    let key = VideoChunk::from_tagged(&[1, 9, 8]).unwrap();
    assert!(key.keyframe);
    assert_eq!(&*key.data, &[9, 8]);

    let delta = VideoChunk::from_tagged(&[0, 7]).unwrap();
    assert!(!delta.keyframe);
    assert_eq!(&*delta.data, &[7]);
}

#[test]
fn empty_tagged_payload_is_protocol_violation() {
    assert!(matches!(
        VideoChunk::from_tagged(&[]),
        Err(DisplayError::ProtocolViolation(_))
    ));
}
