use super::*;

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u16(0, 200), 0);
}

#[test]
fn blend_opaque_source_replaces() {
    let mut dst = [10u8, 20, 30, 255];
    blend_over_straight(&mut dst, &[1, 2, 3, 255]);
    assert_eq!(dst, [1, 2, 3, 255]);
}

#[test]
fn blend_transparent_source_is_noop() {
    let mut dst = [10u8, 20, 30, 255];
    blend_over_straight(&mut dst, &[200, 200, 200, 0]);
    assert_eq!(dst, [10, 20, 30, 255]);
}

#[test]
fn blend_half_alpha_over_opaque_mixes() {
    let mut dst = [0u8, 0, 0, 255];
    blend_over_straight(&mut dst, &[255, 255, 255, 128]);
    assert_eq!(dst[3], 255);
    assert!((127..=129).contains(&dst[0]), "got {}", dst[0]);
}

#[test]
fn blend_onto_transparent_keeps_source_colour() {
    let mut dst = [0u8, 0, 0, 0];
    blend_over_straight(&mut dst, &[200, 100, 50, 128]);
    assert_eq!(dst, [200, 100, 50, 128]);
}
