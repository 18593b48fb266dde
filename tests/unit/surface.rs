use super::*;

fn solid(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    px.iter().copied().cycle().take((w * h * 4) as usize).collect()
}

#[test]
fn new_surface_is_transparent_black() {
    let s = Surface::new(3, 2);
    assert_eq!(s.pixels().len(), 3 * 2 * 4);
    assert!(s.pixels().iter().all(|&b| b == 0));
    assert_eq!(s.generation(), 0);
}

#[test]
fn fill_clamps_to_bounds() {
    let mut s = Surface::new(4, 4);
    s.fill(PixelRect::new(2, 2, 10, 10), Rgb8::new(9, 8, 7));
    assert_eq!(s.pixel(3, 3), Some([9, 8, 7, 255]));
    assert_eq!(s.pixel(1, 1), Some([0, 0, 0, 0]));
    assert_eq!(s.pixel(4, 4), None);
}

#[test]
fn fill_outside_bounds_is_noop() {
    let mut s = Surface::new(4, 4);
    let before = s.clone();
    s.fill(PixelRect::new(4, 0, 2, 2), Rgb8::new(1, 1, 1));
    assert_eq!(s, before);
}

#[test]
fn blit_respects_offset_and_stride_when_clipped() {
    let mut s = Surface::new(3, 3);
    // 2x2 source at (2, 2): only the top-left source pixel lands on the surface.
    let mut src = vec![0xAAu8; 4];
    src.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
    s.blit(PixelRect::new(2, 2, 2, 2), &src, 4);
    assert_eq!(s.pixel(2, 2), Some([1, 2, 3, 4]));
}

#[test]
fn blit_short_buffer_stops_at_missing_rows() {
    let mut s = Surface::new(2, 2);
    s.blit(PixelRect::new(0, 0, 2, 2), &[7; 8], 0);
    assert_eq!(s.pixel(1, 0), Some([7, 7, 7, 7]));
    assert_eq!(s.pixel(0, 1), Some([0, 0, 0, 0]));
}

#[test]
fn resize_discards_content_and_bumps_generation() {
    let mut s = Surface::new(2, 2);
    s.fill(PixelRect::new(0, 0, 2, 2), Rgb8::new(1, 2, 3));
    s.resize(2, 2);
    assert!(s.pixels().iter().all(|&b| b == 0));
    assert_eq!(s.generation(), 1);
}

#[test]
fn resize_then_full_cover_blit_equals_fresh_buffer() {
    let (w, h) = (5, 3);
    let pixels = solid(w, h, [10, 20, 30, 255]);

    let mut resized = Surface::new(17, 9);
    resized.fill(PixelRect::new(0, 0, 17, 9), Rgb8::new(200, 0, 0));
    resized.resize(w, h);
    resized.blit(PixelRect::new(0, 0, w, h), &pixels, 0);

    let mut fresh = Surface::new(w, h);
    fresh.blit(PixelRect::new(0, 0, w, h), &pixels, 0);

    assert_eq!(resized.pixels(), fresh.pixels());
    assert_eq!(resized.pixels(), pixels.as_slice());
}

#[test]
fn copy_region_handles_downward_overlap() {
    let mut s = Surface::new(1, 4);
    for y in 0..4u8 {
        s.fill(PixelRect::new(0, u32::from(y), 1, 1), Rgb8::new(y, y, y));
    }
    s.copy_region(PixelRect::new(0, 0, 1, 3), 0, 1);
    let col: Vec<u8> = (0..4).map(|y| s.pixel(0, y).unwrap()[0]).collect();
    assert_eq!(col, vec![0, 0, 1, 2]);
}

#[test]
fn copy_region_handles_leftward_overlap() {
    let mut s = Surface::new(4, 1);
    for x in 0..4u8 {
        s.fill(PixelRect::new(u32::from(x), 0, 1, 1), Rgb8::new(x, x, x));
    }
    s.copy_region(PixelRect::new(1, 0, 3, 1), 0, 0);
    let row: Vec<u8> = (0..4).map(|x| s.pixel(x, 0).unwrap()[0]).collect();
    assert_eq!(row, vec![1, 2, 3, 3]);
}

#[test]
fn copy_region_clamps_destination() {
    let mut s = Surface::new(4, 4);
    s.fill(PixelRect::new(0, 0, 2, 2), Rgb8::new(5, 5, 5));
    s.copy_region(PixelRect::new(0, 0, 2, 2), 3, 3);
    assert_eq!(s.pixel(3, 3), Some([5, 5, 5, 255]));
}

#[test]
fn draw_image_blends_and_scales() {
    let mut s = Surface::new(4, 4);
    s.fill(PixelRect::new(0, 0, 4, 4), Rgb8::new(0, 0, 0));

    let img = DecodedImage::from_rgba8(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 0]).unwrap();
    s.draw_image(PixelRect::new(0, 0, 4, 2), &img);

    // Left half scaled from the opaque red texel, right half from the transparent one.
    assert_eq!(s.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(s.pixel(1, 1), Some([255, 0, 0, 255]));
    assert_eq!(s.pixel(3, 1), Some([0, 0, 0, 255]));
    assert_eq!(s.pixel(0, 2), Some([0, 0, 0, 255]));
}

#[test]
fn draw_opaque_image_copies_rows() {
    let mut s = Surface::new(3, 3);
    let img = DecodedImage::from_rgba8(2, 2, solid(2, 2, [4, 5, 6, 255])).unwrap();
    s.draw_image(PixelRect::new(2, 2, 2, 2), &img);
    assert_eq!(s.pixel(2, 2), Some([4, 5, 6, 255]));
    assert_eq!(s.pixel(1, 1), Some([0, 0, 0, 0]));
}
