use super::element::{Element, ElementReader};
use super::error::StructureError;
use dicom::core::Tag;
use dicom::dictionary_std::tags;

/// The attributes the image pipeline cares about, borrowed from the source buffer.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct ParsedDataset<'a> {
    pub rows: Option<u16>,
    pub cols: Option<u16>,
    pub bits_allocated: Option<u16>,
    pub pixel_representation: Option<u16>,
    pub samples_per_pixel: Option<u16>,
    pub number_of_frames: Option<u32>,
    pub photometric_interpretation: Option<&'a str>,
    pub rescale_slope: Option<f64>,
    pub rescale_intercept: Option<f64>,
    pub window_center: Option<f64>,
    pub window_width: Option<f64>,
    pub modality: Option<&'a str>,
    pub series_description: Option<&'a str>,
    pub instance_number: Option<i32>,
    pub sop_class_uid: Option<&'a str>,
    pub pixel_data: Option<Element<'a>>,
}

/// Read top-level elements until PixelData or the end of the buffer.
///
/// Tags must be strictly ascending; anything else means the bytes are not
/// a dataset in this encoding.
pub(crate) fn collect<'a>(reader: &mut ElementReader<'a>) -> Result<ParsedDataset<'a>, StructureError> {
    let mut dataset = ParsedDataset::default();
    let mut previous: Option<Tag> = None;

    while let Some(element) = reader.next_element()? {
        if let Some(previous) = previous
            && element.tag <= previous
        {
            return Err(StructureError::OutOfOrder {
                tag: element.tag,
                previous,
                offset: element.offset,
            });
        }
        previous = Some(element.tag);

        if element.tag == tags::PIXEL_DATA {
            dataset.pixel_data = Some(element);
            break;
        }
        apply(&mut dataset, &element);
    }

    if previous.is_none() {
        return Err(StructureError::Empty);
    }

    Ok(dataset)
}

fn apply<'a>(dataset: &mut ParsedDataset<'a>, element: &Element<'a>) {
    match element.tag {
        tags::ROWS => dataset.rows = element.to_u16(),
        tags::COLUMNS => dataset.cols = element.to_u16(),
        tags::BITS_ALLOCATED => dataset.bits_allocated = element.to_u16(),
        tags::PIXEL_REPRESENTATION => dataset.pixel_representation = element.to_u16(),
        tags::SAMPLES_PER_PIXEL => dataset.samples_per_pixel = element.to_u16(),
        tags::NUMBER_OF_FRAMES => {
            dataset.number_of_frames = element.to_f64().map(|v| v as u32);
        }
        tags::PHOTOMETRIC_INTERPRETATION => dataset.photometric_interpretation = element.to_str(),
        tags::RESCALE_SLOPE => dataset.rescale_slope = element.to_f64(),
        tags::RESCALE_INTERCEPT => dataset.rescale_intercept = element.to_f64(),
        tags::WINDOW_CENTER => dataset.window_center = element.to_f64(),
        tags::WINDOW_WIDTH => dataset.window_width = element.to_f64(),
        tags::MODALITY => dataset.modality = element.to_str(),
        tags::SERIES_DESCRIPTION => dataset.series_description = element.to_str(),
        tags::INSTANCE_NUMBER => {
            dataset.instance_number = element.to_f64().map(|v| v as i32);
        }
        tags::SOP_CLASS_UID => dataset.sop_class_uid = element.to_str(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::testutil::DatasetBuilder;
    use assert_matches::assert_matches;

    #[test]
    fn test_collects_image_attributes() {
        let bytes = DatasetBuilder::implicit()
            .cs(tags::MODALITY, "MR")
            .is(tags::INSTANCE_NUMBER, "7")
            .image_header(2, 3, 16, 1)
            .ds(tags::WINDOW_CENTER, "40\\80")
            .ds(tags::WINDOW_WIDTH, "400")
            .ds(tags::RESCALE_INTERCEPT, "-1024")
            .ds(tags::RESCALE_SLOPE, "1")
            .pixels_i16(&[0; 6])
            .build();

        let mut reader = ElementReader::new(&bytes, 0, false);
        let dataset = collect(&mut reader).unwrap();

        assert_eq!(dataset.rows, Some(2));
        assert_eq!(dataset.cols, Some(3));
        assert_eq!(dataset.pixel_representation, Some(1));
        assert_eq!(dataset.modality, Some("MR"));
        assert_eq!(dataset.instance_number, Some(7));
        assert_eq!(dataset.window_center, Some(40.0));
        assert_eq!(dataset.window_width, Some(400.0));
        assert_eq!(dataset.rescale_intercept, Some(-1024.0));
        assert_eq!(dataset.pixel_data.map(|e| e.value.len()), Some(12));
    }

    #[test]
    fn test_descending_tags_are_rejected() {
        let bytes = DatasetBuilder::implicit()
            .us(tags::COLUMNS, 2)
            .us(tags::ROWS, 2)
            .build();

        let mut reader = ElementReader::new(&bytes, 0, false);
        assert_matches!(collect(&mut reader), Err(StructureError::OutOfOrder { .. }));
    }

    #[test]
    fn test_empty_buffer_is_rejected() {
        let mut reader = ElementReader::new(&[], 0, false);
        assert_matches!(collect(&mut reader), Err(StructureError::Empty));
    }
}
