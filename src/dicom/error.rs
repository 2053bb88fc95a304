use super::photometric::PhotometricInterpretation;
use super::strategy::DecodeStrategy;
use crate::types::{Dimensions, TransferSyntax};
use dicom::core::Tag;
use std::fmt;
use thiserror::Error;

/// Reason a strategy could not find a readable element stream in the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("buffer of {0} bytes is too short for a preamble and DICM magic")]
    TooShortForPreamble(usize),

    #[error("no DICM magic after the 128-byte preamble")]
    MissingMagic,

    #[error("file meta information has no transfer syntax")]
    MissingTransferSyntax,

    #[error("unexpected end of data at offset {offset}")]
    Truncated { offset: usize },

    #[error("element {tag} at offset {offset} declares {length} bytes past the end of data")]
    LengthOverrun { tag: Tag, offset: usize, length: u32 },

    #[error("invalid value representation {vr:?} for element {tag} at offset {offset}")]
    InvalidVr { tag: Tag, offset: usize, vr: [u8; 2] },

    #[error("element {tag} at offset {offset} is out of order after {previous}")]
    OutOfOrder { tag: Tag, previous: Tag, offset: usize },

    #[error("unterminated undefined-length sequence starting at offset {offset}")]
    UnterminatedSequence { offset: usize },

    #[error("sequences nested deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("no data elements found")]
    Empty,
}

/// One failed strategy attempt, kept so fallback behaviour can be inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: DecodeStrategy,
    pub reason: StructureError,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

fn format_attempts(attempts: &[StrategyFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure to turn one byte buffer into a [`DicomImage`](super::DicomImage)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Every strategy failed to locate a dataset
    #[error("not a readable DICOM object ({})", format_attempts(.attempts))]
    Unrecognized { attempts: Vec<StrategyFailure> },

    #[error("unsupported transfer syntax {0}")]
    UnsupportedTransferSyntax(TransferSyntax),

    #[error("missing or invalid {0} tag")]
    MissingTag(&'static str),

    #[error("invalid image dimensions {0}")]
    InvalidDimensions(Dimensions),

    #[error(
        "unsupported sample format: {bits_allocated} bits allocated, pixel representation {pixel_representation}"
    )]
    UnsupportedSampleFormat {
        bits_allocated: u16,
        pixel_representation: u16,
    },

    #[error("unsupported photometric interpretation {0}")]
    UnsupportedPhotometric(PhotometricInterpretation),

    #[error("expected 1 sample per pixel, found {0}")]
    UnsupportedSamplesPerPixel(u16),

    #[error("multi-frame objects are not supported ({0} frames)")]
    MultiFrame(u32),

    #[error("missing pixel data")]
    MissingPixelData,

    #[error("encapsulated pixel data is not supported")]
    EncapsulatedPixelData,

    #[error("pixel data is {actual} bytes, expected {expected}")]
    PixelDataLength { expected: usize, actual: usize },
}
