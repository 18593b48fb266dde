pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Source-over for one straight-alpha RGBA8 pixel onto another.
///
/// Opaque sources replace the destination; fully transparent sources leave it untouched.
pub(crate) fn blend_over_straight(dst: &mut [u8], src: &[u8]) {
    let sa = u16::from(src[3]);
    if sa == 0 {
        return;
    }
    let da = u16::from(dst[3]);
    if sa == 255 || da == 0 {
        dst.copy_from_slice(&src[..4]);
        return;
    }

    let inv = 255 - sa;
    let out_a = sa + mul_div255_u16(da, inv);
    for (d, &s) in dst[..3].iter_mut().zip(&src[..3]) {
        let premul =
            mul_div255_u16(u16::from(s), sa) + mul_div255_u16(mul_div255_u16(u16::from(*d), da), inv);
        *d = ((u32::from(premul) * 255 + u32::from(out_a) / 2) / u32::from(out_a)).min(255) as u8;
    }
    dst[3] = out_a.min(255) as u8;
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
