//! Image codec glue (out of scope §1, interface-only per spec §6.2).
//!
//! Any lossless codec satisfying "load to an `(W, H, RGB-bytes)` buffer,
//! store an RGB buffer as lossless PNG" is interchangeable here; this crate
//! binds that contract to the `image` crate.

use std::path::Path;

use image::{ImageFormat, RgbImage};

use crate::error::StegoResult;

/// Decode any supported image format to a flat `W*H*3` RGB byte buffer.
/// Any alpha channel is dropped.
pub fn load(path: &Path) -> StegoResult<(RgbImage, u32, u32)> {
    let img = image::open(path)?.into_rgb8();
    let (w, h) = img.dimensions();
    Ok((img, w, h))
}

/// Encode an RGB buffer as a lossless PNG at `path`.
pub fn save_png(path: &Path, img: &RgbImage) -> StegoResult<()> {
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
