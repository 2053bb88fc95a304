//! Little-endian data element reader
//!
//! Walks a byte buffer as a flat stream of tag/VR/length/value elements.
//! Undefined-length sequences are skipped over structurally so the caller
//! only ever sees top-level elements.

use super::error::StructureError;
use dicom::core::{Tag, VR};

const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;
const MAX_SEQUENCE_DEPTH: usize = 16;

#[cfg(test)]
pub(crate) const ITEM: Tag = Tag(0xFFFE, 0xE000);
pub(crate) const ITEM_DELIMITATION: Tag = Tag(0xFFFE, 0xE00D);
pub(crate) const SEQUENCE_DELIMITATION: Tag = Tag(0xFFFE, 0xE0DD);

/// One top-level data element
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element<'a> {
    pub tag: Tag,
    /// Only known for explicit VR encodings
    pub vr: Option<VR>,
    pub offset: usize,
    pub value: &'a [u8],
    /// Set when the element had undefined length (skipped sequence or encapsulated data)
    pub undefined_length: bool,
}

impl<'a> Element<'a> {
    /// First value of a 16-bit unsigned (US) element
    pub fn to_u16(&self) -> Option<u16> {
        match self.value {
            [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }

    /// Trimmed string value; multi-valued strings keep their backslashes
    pub fn to_str(&self) -> Option<&'a str> {
        let text = std::str::from_utf8(self.value).ok()?;
        let text = text.trim_end_matches('\0').trim();
        (!text.is_empty()).then_some(text)
    }

    /// First value of a decimal (DS) or integer (IS) string
    pub fn to_f64(&self) -> Option<f64> {
        self.to_str()?
            .split('\\')
            .next()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }
}

struct Header {
    tag: Tag,
    vr: Option<VR>,
    length: u32,
}

pub(crate) struct ElementReader<'a> {
    data: &'a [u8],
    pos: usize,
    explicit_vr: bool,
}

impl<'a> ElementReader<'a> {
    pub fn new(data: &'a [u8], start: usize, explicit_vr: bool) -> Self {
        Self {
            data,
            pos: start,
            explicit_vr,
        }
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Group number of the next element without consuming it
    pub fn peek_group(&self) -> Option<u16> {
        self.data
            .get(self.pos..self.pos + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn set_explicit_vr(&mut self, explicit_vr: bool) {
        self.explicit_vr = explicit_vr;
    }

    /// Read the next element, or `None` at a clean end of data.
    pub fn next_element(&mut self) -> Result<Option<Element<'a>>, StructureError> {
        if self.is_at_end() {
            return Ok(None);
        }

        let offset = self.pos;
        let header = self.read_header()?;

        if header.length == UNDEFINED_LENGTH {
            // Encapsulated pixel data is left unread; the caller rejects it.
            if header.tag != dicom::dictionary_std::tags::PIXEL_DATA {
                self.skip_undefined(0)?;
            }
            return Ok(Some(Element {
                tag: header.tag,
                vr: header.vr,
                offset,
                value: &[],
                undefined_length: true,
            }));
        }

        let value = self.take(header.length, header.tag, offset)?;
        Ok(Some(Element {
            tag: header.tag,
            vr: header.vr,
            offset,
            value,
            undefined_length: false,
        }))
    }

    fn read_u16(&mut self) -> Result<u16, StructureError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + 2)
            .ok_or(StructureError::Truncated { offset: self.pos })?;
        self.pos += 2;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, StructureError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + 4)
            .ok_or(StructureError::Truncated { offset: self.pos })?;
        self.pos += 4;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take(&mut self, length: u32, tag: Tag, offset: usize) -> Result<&'a [u8], StructureError> {
        let end = self
            .pos
            .checked_add(length as usize)
            .filter(|end| *end <= self.data.len())
            .ok_or(StructureError::LengthOverrun {
                tag,
                offset,
                length,
            })?;
        let value = &self.data[self.pos..end];
        self.pos = end;
        Ok(value)
    }

    fn read_header(&mut self) -> Result<Header, StructureError> {
        let offset = self.pos;
        let tag = Tag(self.read_u16()?, self.read_u16()?);

        // Items and delimiters never carry a VR, even in explicit encodings
        if tag.group() == 0xFFFE || !self.explicit_vr {
            let length = self.read_u32()?;
            return Ok(Header {
                tag,
                vr: None,
                length,
            });
        }

        let chars = self
            .data
            .get(self.pos..self.pos + 2)
            .map(|b| [b[0], b[1]])
            .ok_or(StructureError::Truncated { offset: self.pos })?;
        let vr = parse_vr(chars).ok_or(StructureError::InvalidVr {
            tag,
            offset,
            vr: chars,
        })?;
        self.pos += 2;

        let length = if has_long_length(chars) {
            // two reserved bytes precede the 32-bit length
            self.read_u16()?;
            self.read_u32()?
        } else {
            u32::from(self.read_u16()?)
        };

        Ok(Header {
            tag,
            vr: Some(vr),
            length,
        })
    }

    /// Skip the body of an undefined-length sequence, up to and including its delimiter.
    fn skip_undefined(&mut self, depth: usize) -> Result<(), StructureError> {
        if depth >= MAX_SEQUENCE_DEPTH {
            return Err(StructureError::NestingTooDeep(MAX_SEQUENCE_DEPTH));
        }
        let start = self.pos;

        loop {
            if self.is_at_end() {
                return Err(StructureError::UnterminatedSequence { offset: start });
            }
            let offset = self.pos;
            let header = self.read_header()?;

            match header.tag {
                SEQUENCE_DELIMITATION | ITEM_DELIMITATION => return Ok(()),
                // undefined-length items and nested sequences alike
                _ if header.length == UNDEFINED_LENGTH => self.skip_undefined(depth + 1)?,
                tag => {
                    self.take(header.length, tag, offset)?;
                }
            }
        }
    }
}

/// True when the two bytes spell an uppercase VR that dicom-core knows.
pub(crate) fn parse_vr(chars: [u8; 2]) -> Option<VR> {
    if !chars.iter().all(u8::is_ascii_uppercase) {
        return None;
    }
    VR::from_binary(chars)
}

fn has_long_length(chars: [u8; 2]) -> bool {
    matches!(
        &chars,
        b"OB" | b"OD" | b"OF" | b"OL" | b"OV" | b"OW" | b"SQ" | b"SV" | b"UC" | b"UN" | b"UR" | b"UT" | b"UV"
    )
}
