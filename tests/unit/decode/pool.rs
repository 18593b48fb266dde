use std::io::Cursor;
use std::time::Duration;

use super::*;

fn png_bytes(w: u32, h: u32, px: [u8; 4]) -> Arc<[u8]> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf.into()
}

fn pool(threads: usize) -> DecodePool {
    DecodePool::new(&DecodePoolOpts {
        threads: Some(threads),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn zero_threads_is_rejected() {
    let err = DecodePool::new(&DecodePoolOpts {
        threads: Some(0),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(err, DisplayError::Validation(_)));
}

#[test]
fn submit_delivers_each_result_once() {
    let pool = pool(2);
    let (tx, rx) = crossbeam_channel::unbounded();

    for i in 0..8u8 {
        let tx = tx.clone();
        pool.submit(
            DecodeRequest {
                bytes: png_bytes(1 + u32::from(i), 1, [i, 0, 0, 255]),
                format: "image/png".to_string(),
            },
            move |res| {
                tx.send((i, res.map(|img| img.width))).unwrap();
            },
        );
    }
    drop(tx);

    let mut seen: Vec<(u8, u32)> = rx
        .iter()
        .map(|(i, res)| (i, res.unwrap()))
        .collect();
    seen.sort();
    assert_eq!(seen.len(), 8);
    for (i, w) in seen {
        assert_eq!(w, 1 + u32::from(i));
    }
    assert_eq!(pool.submitted(), 8);
    assert_eq!(pool.completed(), 8);
}

#[test]
fn malformed_payload_fails_through_callback() {
    let pool = pool(1);
    let (tx, rx) = crossbeam_channel::bounded(1);
    pool.submit(
        DecodeRequest {
            bytes: Arc::from(&b"junk"[..]),
            format: "image/jpeg".to_string(),
        },
        move |res| {
            tx.send(res.is_err()).unwrap();
        },
    );
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
}

#[test]
fn default_deadline_is_two_seconds() {
    assert_eq!(DecodePoolOpts::default().deadline(), Duration::from_secs(2));
}
