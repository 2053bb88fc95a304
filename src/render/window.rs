//! Window/level transform from stored samples to 8-bit gray
//!
//! For each stored sample `s`: `real = s * slope + intercept`, then
//! `lo = center - width / 2`, `hi = center + width / 2`. Values at or below
//! `lo` map to 0, at or above `hi` to 255, and linearly in between.

use super::RenderError;
use crate::dicom::DicomImage;
use crate::types::WindowLevel;
use image::GrayImage;

/// Map `image` through `window` into a freshly allocated gray raster.
///
/// A non-positive window width is replaced by 1. The source image is only read.
///
/// # Errors
///
/// Returns [`RenderError::BufferSize`] if the produced buffer does not match
/// the image dimensions.
pub fn transform(image: &DicomImage, window: WindowLevel) -> Result<GrayImage, RenderError> {
    let rescale = image.rescale();
    let width = window.effective_width();
    let lo = window.center - width / 2.0;
    let hi = window.center + width / 2.0;
    let invert = image.photometric_interpretation().should_invert();

    let pixels = image.samples().map_to_u8(|stored| {
        let real = rescale.apply(stored);
        let gray = if real <= lo {
            0
        } else if real >= hi {
            u8::MAX
        } else {
            // Saturating cast; (real - lo) / width is strictly inside (0, 1) here
            ((real - lo) / width * 255.0).round() as u8
        };

        // MONOCHROME1: min = white
        if invert { u8::MAX - gray } else { gray }
    });

    let len = pixels.len();
    GrayImage::from_raw(image.width(), image.height(), pixels).ok_or(RenderError::BufferSize {
        width: image.width(),
        height: image.height(),
        len,
    })
}
