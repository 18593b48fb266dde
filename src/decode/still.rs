use std::sync::Arc;

use crate::foundation::error::{DisplayError, DisplayResult};

/// Decoded still image in straight-alpha RGBA8, row-major, tightly packed.
///
/// Dropping the handle releases the pixels; the decoder that produced it is already gone.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes.
    pub rgba8: Arc<Vec<u8>>,
    /// `true` when every pixel has alpha 255, which lets the surface copy rows instead of
    /// blending.
    pub opaque: bool,
}

impl DecodedImage {
    /// Wrap an RGBA8 buffer, checking its length against the dimensions.
    pub fn from_rgba8(width: u32, height: u32, rgba8: Vec<u8>) -> DisplayResult<Self> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if rgba8.len() != expected {
            return Err(DisplayError::decode(format!(
                "rgba buffer is {} bytes, expected {expected} for {width}x{height}",
                rgba8.len()
            )));
        }
        let opaque = rgba8.chunks_exact(4).all(|px| px[3] == 255);
        Ok(Self {
            width,
            height,
            rgba8: Arc::new(rgba8),
            opaque,
        })
    }
}

/// Resolve a MIME type (`image/png`) or bare format name (`png`) into an [`image::ImageFormat`].
pub fn resolve_format(format: &str) -> DisplayResult<image::ImageFormat> {
    let name = format.trim().to_ascii_lowercase();
    let name = name.strip_prefix("image/").unwrap_or(&name);
    match name {
        "png" => Ok(image::ImageFormat::Png),
        "jpeg" | "jpg" => Ok(image::ImageFormat::Jpeg),
        "webp" => Ok(image::ImageFormat::WebP),
        "gif" => Ok(image::ImageFormat::Gif),
        "bmp" => Ok(image::ImageFormat::Bmp),
        _ => Err(DisplayError::decode(format!(
            "unsupported image format '{format}'"
        ))),
    }
}

/// Decode a compressed still image.
///
/// The decoder instance lives only for the duration of this call.
pub fn decode_image(bytes: &[u8], format: &str) -> DisplayResult<DecodedImage> {
    if bytes.is_empty() {
        return Err(DisplayError::decode("empty image payload"));
    }
    let fmt = resolve_format(format)?;
    let dyn_img = image::load_from_memory_with_format(bytes, fmt)
        .map_err(|e| DisplayError::decode(format!("{fmt:?} payload: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    DecodedImage::from_rgba8(width, height, rgba.into_raw())
}

#[cfg(test)]
#[path = "../../tests/unit/decode/still.rs"]
mod tests;
