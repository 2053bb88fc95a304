//! Ordered decode strategies
//!
//! Each strategy tries to locate a dataset in the buffer. A strategy that
//! finds no structure reports a [`StructureError`] and the decoder moves on
//! to the next one; a strategy that finds structure but content the
//! pipeline cannot read rejects the buffer outright.

use super::element::{parse_vr, ElementReader};
use super::error::{DecodeError, StructureError};
use super::parser::{self, ParsedDataset};
use crate::types::TransferSyntax;
use dicom::dictionary_std::tags;
use std::fmt;

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";
const META_GROUP: u16 = 0x0002;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStrategy {
    /// 128-byte preamble, "DICM", file meta group, dataset
    Part10,
    /// Dataset from offset 0 with no preamble
    BareDataset,
}

impl DecodeStrategy {
    /// Default attempt order
    pub const ORDERED: [Self; 2] = [Self::Part10, Self::BareDataset];

    pub(crate) fn locate(self, bytes: &[u8]) -> Result<Located<'_>, LocateError> {
        match self {
            Self::Part10 => locate_part10(bytes),
            Self::BareDataset => locate_bare(bytes),
        }
    }
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Part10 => write!(f, "Part 10"),
            Self::BareDataset => write!(f, "bare dataset"),
        }
    }
}

/// A dataset found by one strategy
#[derive(Debug)]
pub(crate) struct Located<'a> {
    pub strategy: DecodeStrategy,
    pub transfer_syntax: TransferSyntax,
    pub dataset: ParsedDataset<'a>,
}

#[derive(Debug)]
pub(crate) enum LocateError {
    /// No structure found; the next strategy may still succeed
    NotFound(StructureError),
    /// Structure found but unusable; stop trying
    Rejected(DecodeError),
}

impl From<StructureError> for LocateError {
    fn from(err: StructureError) -> Self {
        Self::NotFound(err)
    }
}

fn locate_part10(bytes: &[u8]) -> Result<Located<'_>, LocateError> {
    if bytes.len() < PREAMBLE_LEN + MAGIC.len() {
        return Err(StructureError::TooShortForPreamble(bytes.len()).into());
    }
    if &bytes[PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()] != MAGIC {
        return Err(StructureError::MissingMagic.into());
    }

    let mut reader = ElementReader::new(bytes, PREAMBLE_LEN + MAGIC.len(), true);
    let transfer_syntax = read_file_meta(&mut reader)?.ok_or(StructureError::MissingTransferSyntax)?;
    read_dataset(DecodeStrategy::Part10, reader, transfer_syntax)
}

fn locate_bare(bytes: &[u8]) -> Result<Located<'_>, LocateError> {
    let mut reader = ElementReader::new(bytes, 0, true);

    let transfer_syntax = if reader.peek_group() == Some(META_GROUP) {
        read_file_meta(&mut reader)?.ok_or(StructureError::MissingTransferSyntax)?
    } else if looks_explicit(bytes) {
        TransferSyntax::explicit_vr_little_endian()
    } else {
        TransferSyntax::implicit_vr_little_endian()
    };

    read_dataset(DecodeStrategy::BareDataset, reader, transfer_syntax)
}

/// Consume the group 0002 elements (always explicit VR LE) and return the transfer syntax.
fn read_file_meta(reader: &mut ElementReader<'_>) -> Result<Option<TransferSyntax>, StructureError> {
    let mut transfer_syntax = None;
    while reader.peek_group() == Some(META_GROUP) {
        let Some(element) = reader.next_element()? else {
            break;
        };
        if element.tag == tags::TRANSFER_SYNTAX_UID {
            transfer_syntax = element.to_str().map(TransferSyntax::from_uid);
        }
    }
    Ok(transfer_syntax)
}

fn read_dataset<'a>(
    strategy: DecodeStrategy,
    mut reader: ElementReader<'a>,
    transfer_syntax: TransferSyntax,
) -> Result<Located<'a>, LocateError> {
    if !transfer_syntax.is_supported() {
        return Err(LocateError::Rejected(DecodeError::UnsupportedTransferSyntax(
            transfer_syntax,
        )));
    }

    reader.set_explicit_vr(transfer_syntax.is_explicit_vr());
    let dataset = parser::collect(&mut reader)?;

    Ok(Located {
        strategy,
        transfer_syntax,
        dataset,
    })
}

/// An explicit VR header carries two uppercase VR letters right after the tag.
fn looks_explicit(bytes: &[u8]) -> bool {
    bytes
        .get(4..6)
        .is_some_and(|vr| parse_vr([vr[0], vr[1]]).is_some())
}
