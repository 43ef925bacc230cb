//! Image loading for the `LoadImg` commands and the HTML import path.
//!
//! Decoding, scaling and PNG re-encoding are delegated to the `image`
//! crate; this module only fixes the policies: failed loads yield the
//! built-in placeholder, and scaling preserves aspect ratio.

use std::path::Path;

use image::{imageops::FilterType, ImageBuffer, Rgba};

pub use image::DynamicImage;

/// Side length of the generated placeholder.
const PLACEHOLDER_SIZE: u32 = 16;

/// Load an image file; `None` when the file is missing or undecodable.
pub fn load(path: &Path) -> Option<DynamicImage> {
    image::open(path).ok()
}

/// The image substituted when a load fails: a uniform light-gray square.
pub fn placeholder() -> DynamicImage {
    let buf = ImageBuffer::from_pixel(
        PLACEHOLDER_SIZE,
        PLACEHOLDER_SIZE,
        Rgba([0xC0, 0xC0, 0xC0, 0xFF]),
    );
    DynamicImage::ImageRgba8(buf)
}

/// Downscale to fit `w`x`h` preserving aspect ratio. A non-positive
/// dimension leaves the image untouched.
pub fn scaled(img: DynamicImage, w: i32, h: i32) -> DynamicImage {
    if w > 0 && h > 0 {
        img.resize(w as u32, h as u32, FilterType::Triangle)
    } else {
        img
    }
}

/// Encode to PNG for storage in an image cell.
pub fn to_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )?;
    Ok(bytes)
}
