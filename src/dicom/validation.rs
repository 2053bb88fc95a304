use super::error::DecodeError;
use super::photometric::PhotometricInterpretation;
use super::pixel_data::SampleFormat;
use crate::types::Dimensions;

#[inline]
pub fn validate_dimensions(dimensions: Dimensions) -> Result<(), DecodeError> {
    if !dimensions.is_valid() {
        return Err(DecodeError::InvalidDimensions(dimensions));
    }
    Ok(())
}

#[inline]
pub fn validate_single_frame(number_of_frames: u32) -> Result<(), DecodeError> {
    if number_of_frames > 1 {
        return Err(DecodeError::MultiFrame(number_of_frames));
    }
    Ok(())
}

#[inline]
pub fn validate_grayscale(
    photometric_interpretation: &PhotometricInterpretation,
    samples_per_pixel: u16,
) -> Result<(), DecodeError> {
    if samples_per_pixel != 1 {
        return Err(DecodeError::UnsupportedSamplesPerPixel(samples_per_pixel));
    }
    if !photometric_interpretation.is_monochrome() {
        return Err(DecodeError::UnsupportedPhotometric(
            photometric_interpretation.clone(),
        ));
    }
    Ok(())
}

/// Check the PixelData length against the image geometry and return the
/// number of bytes that hold samples.
///
/// An 8-bit image with an odd pixel count carries one trailing pad byte.
pub fn validate_pixel_data_length(
    dimensions: Dimensions,
    format: SampleFormat,
    actual: usize,
) -> Result<usize, DecodeError> {
    let expected = dimensions.pixel_count() * format.bytes_per_sample();
    let padded = expected % 2 == 1 && actual == expected + 1;

    if actual != expected && !padded {
        return Err(DecodeError::PixelDataLength { expected, actual });
    }
    Ok(expected)
}
