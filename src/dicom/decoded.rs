//! Decoded single-frame grayscale image

use super::error::DecodeError;
use super::photometric::PhotometricInterpretation;
use super::pixel_data::{PixelSamples, SampleFormat};
use super::strategy::DecodeStrategy;
use crate::types::{Dimensions, RescaleParams, SOPClass, TransferSyntax, WindowLevel};

/// One decoded slice. Immutable once built; clones share the sample buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DicomImage {
    dimensions: Dimensions,
    samples: PixelSamples,
    rescale: RescaleParams,
    window_center: Option<f64>,
    window_width: Option<f64>,
    min_pixel_value: i32,
    max_pixel_value: i32,
    photometric_interpretation: PhotometricInterpretation,
    source_name: String,
    info: SliceInfo,
}

/// Descriptive attributes carried alongside the pixels
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SliceInfo {
    pub modality: Option<String>,
    pub series_description: Option<String>,
    pub instance_number: Option<i32>,
    pub sop_class: Option<SOPClass>,
    pub transfer_syntax: Option<TransferSyntax>,
    pub strategy: Option<DecodeStrategy>,
}

impl DicomImage {
    /// Build an image from already-decoded samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero or the sample count does
    /// not equal `rows * cols`.
    pub fn from_samples(
        source_name: impl Into<String>,
        dimensions: Dimensions,
        samples: PixelSamples,
        rescale: RescaleParams,
    ) -> Result<Self, DecodeError> {
        super::validation::validate_dimensions(dimensions)?;

        let expected = dimensions.pixel_count();
        if samples.len() != expected {
            let bytes = samples.format().bytes_per_sample();
            return Err(DecodeError::PixelDataLength {
                expected: expected * bytes,
                actual: samples.len() * bytes,
            });
        }

        let (min_pixel_value, max_pixel_value) =
            samples.min_max().ok_or(DecodeError::MissingPixelData)?;

        Ok(Self {
            dimensions,
            samples,
            rescale,
            window_center: None,
            window_width: None,
            min_pixel_value,
            max_pixel_value,
            photometric_interpretation: PhotometricInterpretation::Monochrome2,
            source_name: source_name.into(),
            info: SliceInfo::default(),
        })
    }

    #[must_use]
    pub fn with_window(mut self, center: Option<f64>, width: Option<f64>) -> Self {
        self.window_center = center;
        self.window_width = width;
        self
    }

    #[must_use]
    pub fn with_photometric(mut self, photometric_interpretation: PhotometricInterpretation) -> Self {
        self.photometric_interpretation = photometric_interpretation;
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: SliceInfo) -> Self {
        self.info = info;
        self
    }

    #[inline(always)]
    #[must_use]
    pub fn width(&self) -> u32 {
        u32::from(self.dimensions.cols)
    }

    #[inline(always)]
    #[must_use]
    pub fn height(&self) -> u32 {
        u32::from(self.dimensions.rows)
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    #[must_use]
    pub fn samples(&self) -> &PixelSamples {
        &self.samples
    }

    #[must_use]
    pub fn bits_allocated(&self) -> u16 {
        self.samples.format().bits_allocated()
    }

    #[must_use]
    pub fn pixel_representation(&self) -> u16 {
        self.samples.format().pixel_representation()
    }

    #[must_use]
    pub fn sample_format(&self) -> SampleFormat {
        self.samples.format()
    }

    #[must_use]
    pub fn rescale(&self) -> RescaleParams {
        self.rescale
    }

    #[must_use]
    pub fn window_center(&self) -> Option<f64> {
        self.window_center
    }

    #[must_use]
    pub fn window_width(&self) -> Option<f64> {
        self.window_width
    }

    #[must_use]
    pub fn min_pixel_value(&self) -> i32 {
        self.min_pixel_value
    }

    #[must_use]
    pub fn max_pixel_value(&self) -> i32 {
        self.max_pixel_value
    }

    #[must_use]
    pub fn photometric_interpretation(&self) -> &PhotometricInterpretation {
        &self.photometric_interpretation
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    #[must_use]
    pub fn info(&self) -> &SliceInfo {
        &self.info
    }

    /// Window from the WindowCenter/WindowWidth tags, if both are present
    /// and the width is positive.
    #[must_use]
    pub fn tagged_window(&self) -> Option<WindowLevel> {
        match (self.window_center, self.window_width) {
            (Some(center), Some(width)) if width > 0.0 => Some(WindowLevel::new(center, width)),
            _ => None,
        }
    }

    /// Window spanning the rescaled min/max of the stored samples.
    #[must_use]
    pub fn range_window(&self) -> WindowLevel {
        WindowLevel::from_range(
            self.rescale.apply(f64::from(self.min_pixel_value)),
            self.rescale.apply(f64::from(self.max_pixel_value)),
        )
    }

    /// Tagged window if present, otherwise the min/max range window.
    #[must_use]
    pub fn default_window(&self) -> WindowLevel {
        self.tagged_window().unwrap_or_else(|| self.range_window())
    }
}
