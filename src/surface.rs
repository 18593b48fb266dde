use crate::decode::still::DecodedImage;
use crate::foundation::core::{PixelRect, Rgb8};
use crate::foundation::math::blend_over_straight;

/// The reconstructed remote display: one straight-alpha RGBA8 buffer.
///
/// Every mutation clamps its rectangle to the buffer bounds and never fails. Only the render
/// tick mutates a surface, so it carries no lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    generation: u64,
    data: Vec<u8>,
}

impl Surface {
    /// Allocate a transparent-black surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            generation: 0,
            data: vec![0; byte_len(width, height)],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of resizes since construction.
    ///
    /// Operations stamped with an older generation target a buffer that no longer exists.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Row-major RGBA8 pixels.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// One pixel, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Copy the buffer into an [`image::RgbaImage`].
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Discard the buffer and reallocate it at the new size.
    ///
    /// Content is never preserved, even when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.generation = self.generation.wrapping_add(1);
        self.data = vec![0; byte_len(width, height)];
    }

    /// Fill `rect` with an opaque colour.
    pub fn fill(&mut self, rect: PixelRect, color: Rgb8) {
        let Some(r) = rect.clamp_to(self.width, self.height) else {
            return;
        };
        let px = color.to_rgba();
        for y in r.y..r.bottom() {
            let start = self.offset(r.x, y);
            let row = &mut self.data[start..start + r.width as usize * 4];
            for dst in row.chunks_exact_mut(4) {
                dst.copy_from_slice(&px);
            }
        }
    }

    /// Replace `rect` with raw RGBA8 pixels read from `pixels[offset..]`.
    ///
    /// The source stride is `rect.width * 4` whatever clipping happens; rows missing from a
    /// short buffer are skipped.
    pub fn blit(&mut self, rect: PixelRect, pixels: &[u8], offset: usize) {
        let Some(r) = rect.clamp_to(self.width, self.height) else {
            return;
        };
        let src_stride = rect.width as usize * 4;
        let row_bytes = r.width as usize * 4;
        for row in 0..r.height as usize {
            let src_start = offset + row * src_stride;
            let Some(src) = pixels.get(src_start..src_start + row_bytes) else {
                break;
            };
            let dst_start = self.offset(r.x, r.y + row as u32);
            self.data[dst_start..dst_start + row_bytes].copy_from_slice(src);
        }
    }

    /// Copy the pixels under `src` so their top-left lands at `(dst_x, dst_y)`.
    ///
    /// Overlapping regions behave as if the source were read in full before writing.
    pub fn copy_region(&mut self, src: PixelRect, dst_x: u32, dst_y: u32) {
        let Some(s) = src.clamp_to(self.width, self.height) else {
            return;
        };
        let Some(d) = PixelRect::new(dst_x, dst_y, s.width, s.height).clamp_to(self.width, self.height)
        else {
            return;
        };
        let row_bytes = d.width as usize * 4;
        let bottom_up = d.y > s.y;
        for i in 0..d.height {
            let row = if bottom_up { d.height - 1 - i } else { i };
            let from = self.offset(s.x, s.y + row);
            let to = self.offset(d.x, d.y + row);
            self.data.copy_within(from..from + row_bytes, to);
        }
    }

    /// Composite a decoded image into `rect` with source-over.
    ///
    /// Images whose size differs from `rect` are scaled with nearest-neighbour sampling.
    pub fn draw_image(&mut self, rect: PixelRect, img: &DecodedImage) {
        if img.width == 0 || img.height == 0 {
            return;
        }
        let Some(r) = rect.clamp_to(self.width, self.height) else {
            return;
        };
        let src = img.rgba8.as_slice();
        let src_stride = img.width as usize * 4;
        let unscaled = img.width == rect.width && img.height == rect.height;

        for row in 0..r.height {
            let sy = if unscaled {
                row as usize
            } else {
                scale_coord(row + (r.y - rect.y), rect.height, img.height)
            };
            let dst_start = self.offset(r.x, r.y + row);

            if unscaled && img.opaque {
                let s = sy * src_stride + (r.x - rect.x) as usize * 4;
                let n = r.width as usize * 4;
                self.data[dst_start..dst_start + n].copy_from_slice(&src[s..s + n]);
                continue;
            }

            for col in 0..r.width {
                let sx = if unscaled {
                    (col + (r.x - rect.x)) as usize
                } else {
                    scale_coord(col + (r.x - rect.x), rect.width, img.width)
                };
                let s = sy * src_stride + sx * 4;
                let d = dst_start + col as usize * 4;
                blend_over_straight(&mut self.data[d..d + 4], &src[s..s + 4]);
            }
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4)
}

/// Map a destination coordinate inside a `dst_len` span onto a `src_len` span.
fn scale_coord(dst: u32, dst_len: u32, src_len: u32) -> usize {
    let v = (u64::from(dst) * u64::from(src_len)) / u64::from(dst_len.max(1));
    (v as usize).min(src_len.saturating_sub(1) as usize)
}

#[cfg(test)]
#[path = "../tests/unit/surface.rs"]
mod tests;
