//! Synthetic DICOM buffers for unit tests

use super::element::{ITEM, SEQUENCE_DELIMITATION};
use crate::types::EXPLICIT_VR_LITTLE_ENDIAN;
use dicom::core::Tag;
use dicom::dictionary_std::tags;

/// Appends elements in call order; callers keep tags ascending.
pub(crate) struct DatasetBuilder {
    explicit: bool,
    bytes: Vec<u8>,
}

impl DatasetBuilder {
    pub fn explicit() -> Self {
        Self {
            explicit: true,
            bytes: Vec::new(),
        }
    }

    pub fn implicit() -> Self {
        Self {
            explicit: false,
            bytes: Vec::new(),
        }
    }

    fn header(&mut self, tag: Tag, vr: [u8; 2], length: u32) {
        self.bytes.extend_from_slice(&tag.group().to_le_bytes());
        self.bytes.extend_from_slice(&tag.element().to_le_bytes());
        if !self.explicit || tag.group() == 0xFFFE {
            self.bytes.extend_from_slice(&length.to_le_bytes());
            return;
        }
        self.bytes.extend_from_slice(&vr);
        if matches!(&vr, b"OB" | b"OW" | b"SQ" | b"UN" | b"UT") {
            self.bytes.extend_from_slice(&[0, 0]);
            self.bytes.extend_from_slice(&length.to_le_bytes());
        } else {
            let short = u16::try_from(length).expect("short-form length");
            self.bytes.extend_from_slice(&short.to_le_bytes());
        }
    }

    pub fn raw(mut self, tag: Tag, vr: [u8; 2], value: &[u8]) -> Self {
        let length = u32::try_from(value.len()).expect("value length");
        self.header(tag, vr, length);
        self.bytes.extend_from_slice(value);
        self
    }

    fn text(self, tag: Tag, vr: [u8; 2], value: &str, pad: u8) -> Self {
        let mut value = value.as_bytes().to_vec();
        if value.len() % 2 == 1 {
            value.push(pad);
        }
        self.raw(tag, vr, &value)
    }

    pub fn us(self, tag: Tag, value: u16) -> Self {
        self.raw(tag, *b"US", &value.to_le_bytes())
    }

    pub fn ds(self, tag: Tag, value: &str) -> Self {
        self.text(tag, *b"DS", value, b' ')
    }

    pub fn is(self, tag: Tag, value: &str) -> Self {
        self.text(tag, *b"IS", value, b' ')
    }

    pub fn cs(self, tag: Tag, value: &str) -> Self {
        self.text(tag, *b"CS", value, b' ')
    }

    pub fn lo(self, tag: Tag, value: &str) -> Self {
        self.text(tag, *b"LO", value, b' ')
    }

    pub fn ui(self, tag: Tag, value: &str) -> Self {
        self.text(tag, *b"UI", value, 0)
    }

    /// Sequence of undefined length holding one defined-length item.
    pub fn undefined_sequence(mut self, tag: Tag, item: &[u8]) -> Self {
        self.header(tag, *b"SQ", u32::MAX);
        let length = u32::try_from(item.len()).expect("item length");
        self.header(ITEM, *b"  ", length);
        self.bytes.extend_from_slice(item);
        self.header(SEQUENCE_DELIMITATION, *b"  ", 0);
        self
    }

    /// Rows, Columns and the bit layout tags, in tag order.
    pub fn image_header(self, rows: u16, cols: u16, bits: u16, pixel_representation: u16) -> Self {
        self.us(tags::ROWS, rows)
            .us(tags::COLUMNS, cols)
            .us(tags::BITS_ALLOCATED, bits)
            .us(tags::BITS_STORED, bits)
            .us(tags::PIXEL_REPRESENTATION, pixel_representation)
    }

    pub fn pixels_u16(self, samples: &[u16]) -> Self {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.raw(tags::PIXEL_DATA, *b"OW", &bytes)
    }

    pub fn pixels_i16(self, samples: &[i16]) -> Self {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.raw(tags::PIXEL_DATA, *b"OW", &bytes)
    }

    pub fn pixels_u8(self, samples: &[u8]) -> Self {
        let mut bytes = samples.to_vec();
        if bytes.len() % 2 == 1 {
            bytes.push(0);
        }
        self.raw(tags::PIXEL_DATA, *b"OB", &bytes)
    }

    /// Bare dataset, no preamble or file meta
    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    /// Part 10 file: preamble, DICM magic, file meta group, then the dataset.
    pub fn build_part10(self, transfer_syntax: &str) -> Vec<u8> {
        let meta = DatasetBuilder::explicit()
            .ui(tags::TRANSFER_SYNTAX_UID, transfer_syntax)
            .build();
        let group_length = u32::try_from(meta.len()).expect("meta length");

        let mut out = vec![0u8; 128];
        out.extend_from_slice(b"DICM");
        out.extend_from_slice(
            &DatasetBuilder::explicit()
                .raw(tags::FILE_META_INFORMATION_GROUP_LENGTH, *b"UL", &group_length.to_le_bytes())
                .build(),
        );
        out.extend_from_slice(&meta);
        out.extend_from_slice(&self.bytes);
        out
    }
}

/// A complete explicit-VR Part 10 CT slice with 16-bit unsigned samples.
pub(crate) fn ct_slice(rows: u16, cols: u16, samples: &[u16]) -> Vec<u8> {
    DatasetBuilder::explicit()
        .cs(tags::MODALITY, "CT")
        .lo(tags::SERIES_DESCRIPTION, "Chest")
        .us(tags::SAMPLES_PER_PIXEL, 1)
        .cs(tags::PHOTOMETRIC_INTERPRETATION, "MONOCHROME2")
        .image_header(rows, cols, 16, 0)
        .pixels_u16(samples)
        .build_part10(EXPLICIT_VR_LITTLE_ENDIAN)
}
