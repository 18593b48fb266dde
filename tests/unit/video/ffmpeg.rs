use super::*;

#[test]
fn ivf_header_layout() {
    let h = ivf_file_header(640, 480);
    assert_eq!(&h[0..4], b"DKIF");
    assert_eq!(u16::from_le_bytes([h[6], h[7]]), 32);
    assert_eq!(&h[8..12], b"VP80");
    assert_eq!(u16::from_le_bytes([h[12], h[13]]), 640);
    assert_eq!(u16::from_le_bytes([h[14], h[15]]), 480);
    assert_eq!(u32::from_le_bytes([h[16], h[17], h[18], h[19]]), 30);
}

#[test]
fn oversized_session_is_configuration_error() {
    let (tx, _rx) = crossbeam_channel::unbounded();
    let err = FfmpegVp8Factory::default()
        .create(
            VideoConfig {
                session: crate::video::codec::SessionId(0),
                width: 70_000,
                height: 10,
            },
            tx,
        )
        .err()
        .unwrap();
    assert!(matches!(err, DisplayError::Configuration(_)));
}

#[test]
fn missing_binary_is_configuration_error() {
    let (tx, _rx) = crossbeam_channel::unbounded();
    let factory = FfmpegVp8Factory {
        ffmpeg_bin: PathBuf::from("/nonexistent/ffmpeg-binary"),
    };
    let err = factory
        .create(
            VideoConfig {
                session: crate::video::codec::SessionId(0),
                width: 16,
                height: 16,
            },
            tx,
        )
        .err()
        .unwrap();
    assert!(matches!(err, DisplayError::Configuration(_)));
}

#[cfg(unix)]
#[test]
fn failed_header_write_reaps_the_child() {
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut child = Command::new("sleep").arg("30").spawn().unwrap();
    let err = write_ivf_header(&mut child, &mut ClosedPipe, 16, 16).unwrap_err();
    assert!(matches!(err, DisplayError::Configuration(_)));
    assert!(child.try_wait().unwrap().is_some());
}
