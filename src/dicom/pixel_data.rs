//! Typed views over native pixel data
//!
//! Samples are decoded once from little-endian bytes into an `Arc`-backed
//! slice that every consumer shares read-only.

use std::sync::Arc;

/// Stored sample layout selected by BitsAllocated/PixelRepresentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    U16,
    I16,
}

impl SampleFormat {
    /// Map (BitsAllocated, PixelRepresentation) onto a supported layout.
    #[must_use]
    pub fn from_tags(bits_allocated: u16, pixel_representation: u16) -> Option<Self> {
        match (bits_allocated, pixel_representation) {
            (8, 0) => Some(Self::U8),
            (16, 0) => Some(Self::U16),
            (16, 1) => Some(Self::I16),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::I16 => 2,
        }
    }

    #[must_use]
    pub fn bits_allocated(self) -> u16 {
        match self {
            Self::U8 => 8,
            Self::U16 | Self::I16 => 16,
        }
    }

    #[must_use]
    pub fn pixel_representation(self) -> u16 {
        match self {
            Self::U8 | Self::U16 => 0,
            Self::I16 => 1,
        }
    }
}

/// Decoded grayscale samples
#[derive(Debug, Clone, PartialEq)]
pub enum PixelSamples {
    U8(Arc<[u8]>),
    U16(Arc<[u16]>),
    I16(Arc<[i16]>),
}

impl PixelSamples {
    /// Decode `bytes` (exactly `count * bytes_per_sample` long) into samples.
    #[must_use]
    pub fn from_le_bytes(format: SampleFormat, bytes: &[u8]) -> Self {
        match format {
            SampleFormat::U8 => Self::U8(Arc::from(bytes)),
            SampleFormat::U16 => Self::U16(
                bytes
                    .chunks_exact(2)
                    .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
                    .collect(),
            ),
            SampleFormat::I16 => Self::I16(
                bytes
                    .chunks_exact(2)
                    .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn format(&self) -> SampleFormat {
        match self {
            Self::U8(_) => SampleFormat::U8,
            Self::U16(_) => SampleFormat::U16,
            Self::I16(_) => SampleFormat::I16,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U8(s) => s.len(),
            Self::U16(s) => s.len(),
            Self::I16(s) => s.len(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<i32> {
        match self {
            Self::U8(s) => s.get(index).map(|&v| i32::from(v)),
            Self::U16(s) => s.get(index).map(|&v| i32::from(v)),
            Self::I16(s) => s.get(index).map(|&v| i32::from(v)),
        }
    }

    /// Smallest and largest stored value, scanning every sample.
    #[must_use]
    pub fn min_max(&self) -> Option<(i32, i32)> {
        fn scan<T: Copy + Into<i32>>(samples: &[T]) -> Option<(i32, i32)> {
            samples.iter().fold(None, |acc, &v| {
                let v: i32 = v.into();
                Some(match acc {
                    None => (v, v),
                    Some((min, max)) => (min.min(v), max.max(v)),
                })
            })
        }

        match self {
            Self::U8(s) => scan(s),
            Self::U16(s) => scan(s),
            Self::I16(s) => scan(s),
        }
    }

    /// Map every sample through `f`, producing one output byte per sample.
    pub fn map_to_u8<F: Fn(f64) -> u8>(&self, f: F) -> Vec<u8> {
        match self {
            Self::U8(s) => s.iter().map(|&v| f(f64::from(v))).collect(),
            Self::U16(s) => s.iter().map(|&v| f(f64::from(v))).collect(),
            Self::I16(s) => s.iter().map(|&v| f(f64::from(v))).collect(),
        }
    }
}
