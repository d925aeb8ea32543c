//! Raster decode/encode and resampling.
//!
//! Every image inside visreg is an [`RgbaImage`]; three-channel sources are
//! widened with opaque alpha on load.

use crate::result::{VisregError, VisregResult};
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use std::path::Path;
use tracing::warn;

/// Extension used for every file visreg writes
pub const IMAGE_EXTENSION: &str = "png";

/// Decode an image file.
///
/// # Errors
///
/// Returns [`VisregError::Decode`] if the file is missing, unreadable or not
/// a supported raster format.
pub fn load(path: impl AsRef<Path>) -> VisregResult<RgbaImage> {
    let path = path.as_ref();
    let decoded = image::open(path)
        .map_err(|e| VisregError::decode(format!("{}: {e}", path.display())))?;
    Ok(decoded.to_rgba8())
}

/// Decode an in-memory PNG or JPEG.
pub fn load_from_memory(bytes: &[u8]) -> VisregResult<RgbaImage> {
    let decoded = image::load_from_memory(bytes).map_err(|e| VisregError::decode(e.to_string()))?;
    Ok(decoded.to_rgba8())
}

/// Encode as PNG. Identical pixels always produce identical bytes.
pub fn encode_png(image: &RgbaImage) -> VisregResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buffer);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| VisregError::ImageProcessing {
            message: format!("Failed to encode PNG: {e}"),
        })?;
    Ok(buffer)
}

/// Write an image, picking the format from the path's extension.
///
/// Best effort: failures are logged and reported as `false`, never raised.
pub fn save(image: &RgbaImage, path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match try_save(image, path) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to save image");
            false
        }
    }
}

fn try_save(image: &RgbaImage, path: &Path) -> VisregResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    image.save(path).map_err(|e| VisregError::ImageProcessing {
        message: format!("{}: {e}", path.display()),
    })
}

/// Resize an image.
///
/// With one dimension given the other follows the source aspect ratio; with
/// both given the result is exactly that size, distorting if necessary.
/// With neither the image is returned unchanged.
#[must_use]
pub fn resize(image: &RgbaImage, width: Option<u32>, height: Option<u32>) -> RgbaImage {
    let (src_w, src_h) = image.dimensions();
    match (width, height) {
        (None, None) => image.clone(),
        (Some(w), Some(h)) => resize_exact(image, w, h),
        (Some(w), None) => {
            let h = scale_dimension(src_h, w, src_w);
            resize_exact(image, w, h)
        }
        (None, Some(h)) => {
            let w = scale_dimension(src_w, h, src_h);
            resize_exact(image, w, h)
        }
    }
}

/// Resize to exactly `width` x `height` with bilinear filtering.
#[must_use]
pub fn resize_exact(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    if width == 0 || height == 0 || is_empty(image) {
        return RgbaImage::new(width, height);
    }
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

/// `other * target / source`, rounded, never below 1.
fn scale_dimension(other: u32, target: u32, source: u32) -> u32 {
    if source == 0 || target == 0 {
        return 0;
    }
    let scaled = (f64::from(other) * f64::from(target) / f64::from(source)).round();
    (scaled as u32).max(1)
}

/// Whether the image has no pixels.
#[must_use]
pub fn is_empty(image: &RgbaImage) -> bool {
    image.width() == 0 || image.height() == 0
}
