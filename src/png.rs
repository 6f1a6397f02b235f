//! Label image decoding.
//!
//! Label images must be 8-bit RGBA PNGs no larger than
//! [`MAX_IMAGE_WIDTH`] × [`MAX_IMAGE_HEIGHT`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::codecs::png::PngDecoder;
use image::{ColorType, DynamicImage, ImageDecoder, RgbaImage};
use log::debug;

use crate::config::OverlayError;

pub const MAX_IMAGE_WIDTH: u32 = 1024;
pub const MAX_IMAGE_HEIGHT: u32 = 600;

/// Decode `path` into an RGBA8888 buffer.
pub fn decode_label_image(path: &Path) -> Result<RgbaImage, OverlayError> {
    let fail = |message: String| OverlayError::Image {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|e| fail(e.to_string()))?;
    let decoder = PngDecoder::new(BufReader::new(file)).map_err(|e| fail(e.to_string()))?;

    let (width, height) = decoder.dimensions();
    if width == 0 || width > MAX_IMAGE_WIDTH {
        return Err(fail(format!("invalid width {width}")));
    }
    if height == 0 || height > MAX_IMAGE_HEIGHT {
        return Err(fail(format!("invalid height {height}")));
    }

    match decoder.color_type() {
        ColorType::Rgba8 => {}
        ColorType::Rgba16 => return Err(fail("bit depth must be 8".into())),
        other => return Err(fail(format!("color type {other:?} is not RGBA"))),
    }

    let image = DynamicImage::from_decoder(decoder).map_err(|e| fail(e.to_string()))?;
    debug!("Decoded {} ({width}x{height})", path.display());
    Ok(image.into_rgba8())
}
