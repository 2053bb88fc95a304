//! Displayable rasters
//!
//! [`transform`] is the pure windowing step; [`compose`] places a raster on
//! a host surface through the viewport's zoom and pan.

mod compose;
mod window;

pub use compose::compose;
pub use window::transform;

use crate::dicom::DicomImage;
use crate::types::WindowLevel;
use image::{DynamicImage, GrayImage, RgbaImage};
use std::sync::Arc;
use thiserror::Error;

/// A rendering invariant was violated. Indicates a pipeline defect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("raster buffer of {len} bytes does not fit {width}x{height}")]
    BufferSize { width: u32, height: u32, len: usize },

    #[error("output surface {width}x{height} is empty")]
    EmptySurface { width: u32, height: u32 },

    #[error("render worker failed: {0}")]
    Worker(String),
}

/// Expand a gray raster to opaque RGBA for hosts that blit colour surfaces.
#[must_use]
pub fn to_rgba(raster: &GrayImage) -> RgbaImage {
    DynamicImage::ImageLuma8(raster.clone()).to_rgba8()
}

/// Run [`transform`] on the blocking pool so interactive input is not stalled.
///
/// # Errors
///
/// Propagates the transform's error, or [`RenderError::Worker`] if the
/// worker task panicked or was cancelled.
pub async fn render_async(
    image: Arc<DicomImage>,
    window: WindowLevel,
) -> Result<GrayImage, RenderError> {
    tokio::task::spawn_blocking(move || transform(&image, window))
        .await
        .map_err(|e| RenderError::Worker(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::PixelSamples;
    use crate::types::{Dimensions, RescaleParams};

    fn gradient() -> DicomImage {
        DicomImage::from_samples(
            "gradient",
            Dimensions::new(2, 2),
            PixelSamples::U8(Arc::from(&[0u8, 85, 170, 255][..])),
            RescaleParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_rgba_expansion_is_opaque_gray() {
        let raster = transform(&gradient(), WindowLevel::new(127.5, 255.0)).unwrap();
        let rgba = to_rgba(&raster);

        assert_eq!(rgba.dimensions(), (2, 2));
        for (gray, color) in raster.pixels().zip(rgba.pixels()) {
            assert_eq!(color.0, [gray[0], gray[0], gray[0], 255]);
        }
    }

    #[tokio::test]
    async fn test_render_async_matches_sync() {
        let image = Arc::new(gradient());
        let window = WindowLevel::new(100.0, 50.0);

        let sync = transform(&image, window).unwrap();
        let offloaded = render_async(Arc::clone(&image), window).await.unwrap();
        assert_eq!(sync, offloaded);
    }
}
