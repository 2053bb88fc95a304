//! DICOM decoding
//!
//! Turns one raw byte buffer into a [`DicomImage`]. Only single-frame,
//! uncompressed, little-endian grayscale objects are accepted, either as a
//! Part 10 file or as a bare dataset.

mod element;
mod decoded;
mod error;
mod parser;
mod photometric;
mod pixel_data;
mod strategy;
mod validation;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{DecodeError, StrategyFailure, StructureError};
pub use decoded::{DicomImage, SliceInfo};
pub use photometric::PhotometricInterpretation;
pub use pixel_data::{PixelSamples, SampleFormat};
pub use strategy::DecodeStrategy;

use crate::types::{Dimensions, RescaleParams, SOPClass};
use dicom::core::dictionary::UidDictionary;
use dicom::dictionary_std::sop_class;
use strategy::{LocateError, Located};
use tracing::debug;

/// Decoder holding an explicit, ordered list of strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DicomDecoder {
    strategies: Vec<DecodeStrategy>,
}

impl Default for DicomDecoder {
    fn default() -> Self {
        Self {
            strategies: DecodeStrategy::ORDERED.to_vec(),
        }
    }
}

impl DicomDecoder {
    /// Decoder that tries `strategies` in the given order.
    #[must_use]
    pub fn with_strategies(strategies: impl IntoIterator<Item = DecodeStrategy>) -> Self {
        Self {
            strategies: strategies.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn strategies(&self) -> &[DecodeStrategy] {
        &self.strategies
    }

    /// Decode one buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Unrecognized`] with every attempt when no
    /// strategy finds a dataset, or the specific content error from the
    /// first strategy that does.
    pub fn decode(&self, bytes: &[u8], source_name: &str) -> Result<DicomImage, DecodeError> {
        let mut attempts = Vec::new();

        for &strategy in &self.strategies {
            match strategy.locate(bytes) {
                Ok(located) => {
                    if !attempts.is_empty() {
                        debug!(source = source_name, %strategy, ?attempts, "decoded after fallback");
                    }
                    return build_image(located, source_name);
                }
                Err(LocateError::NotFound(reason)) => {
                    debug!(source = source_name, %strategy, %reason, "strategy found no dataset");
                    attempts.push(StrategyFailure { strategy, reason });
                }
                Err(LocateError::Rejected(err)) => return Err(err),
            }
        }

        Err(DecodeError::Unrecognized { attempts })
    }
}

/// Decode with the default strategy order (Part 10, then bare dataset).
///
/// # Errors
///
/// See [`DicomDecoder::decode`].
pub fn decode(bytes: &[u8], source_name: &str) -> Result<DicomImage, DecodeError> {
    DicomDecoder::default().decode(bytes, source_name)
}

fn build_image(located: Located<'_>, source_name: &str) -> Result<DicomImage, DecodeError> {
    let Located {
        strategy,
        transfer_syntax,
        dataset,
    } = located;

    let rows = dataset.rows.ok_or(DecodeError::MissingTag("Rows"))?;
    let cols = dataset.cols.ok_or(DecodeError::MissingTag("Columns"))?;
    let dimensions = Dimensions::new(rows, cols);
    validation::validate_dimensions(dimensions)?;

    let photometric_interpretation = dataset
        .photometric_interpretation
        .and_then(|s| s.parse::<PhotometricInterpretation>().ok())
        .unwrap_or_default();
    validation::validate_grayscale(
        &photometric_interpretation,
        dataset.samples_per_pixel.unwrap_or(1),
    )?;
    validation::validate_single_frame(dataset.number_of_frames.unwrap_or(1))?;

    let bits_allocated = dataset
        .bits_allocated
        .ok_or(DecodeError::MissingTag("Bits Allocated"))?;
    let pixel_representation = dataset.pixel_representation.unwrap_or(0);
    let format = SampleFormat::from_tags(bits_allocated, pixel_representation).ok_or(
        DecodeError::UnsupportedSampleFormat {
            bits_allocated,
            pixel_representation,
        },
    )?;

    let pixel_data = dataset.pixel_data.ok_or(DecodeError::MissingPixelData)?;
    if pixel_data.undefined_length {
        return Err(DecodeError::EncapsulatedPixelData);
    }
    let sample_bytes =
        validation::validate_pixel_data_length(dimensions, format, pixel_data.value.len())?;
    let samples = PixelSamples::from_le_bytes(format, &pixel_data.value[..sample_bytes]);

    let rescale = RescaleParams::new(
        dataset.rescale_slope.unwrap_or(1.0),
        dataset.rescale_intercept.unwrap_or(0.0),
    );

    let info = SliceInfo {
        modality: dataset.modality.map(str::to_string),
        series_description: dataset.series_description.map(str::to_string),
        instance_number: dataset.instance_number,
        sop_class: dataset.sop_class_uid.and_then(lookup_sop_class),
        transfer_syntax: Some(transfer_syntax),
        strategy: Some(strategy),
    };

    Ok(DicomImage::from_samples(source_name, dimensions, samples, rescale)?
        .with_window(dataset.window_center, dataset.window_width)
        .with_photometric(photometric_interpretation)
        .with_info(info))
}

fn lookup_sop_class(uid: &str) -> Option<SOPClass> {
    sop_class::StandardSopClassDictionary
        .by_uid(uid)
        .map(|entry| SOPClass::new(uid.to_string(), entry.name.to_string()))
}
