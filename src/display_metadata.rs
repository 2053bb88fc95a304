use crate::dicom::DicomImage;
use crate::series::Series;
use std::fmt::Display;

/// Series-level summary, printed once after loading
pub fn print_series(series: &Series) {
    print_field("Modality", Some(series.modality()));
    print_field("Series Description", series.description());
    print_field("Slices", Some(series.len()));
    print_field("Default Window", Some(series.default_window()));
    println!();
}

pub fn print_slice(image: &DicomImage) {
    let info = image.info();

    print_field("Source", Some(image.source_name()));
    print_field("Modality", info.modality.as_ref());
    print_field("Series Description", info.series_description.as_ref());
    print_field("Instance Number", info.instance_number);

    print_dimensions(image);
    print_field("Sample Format", Some(format_args!(
        "{} bits, {}",
        image.bits_allocated(),
        if image.pixel_representation() == 1 { "signed" } else { "unsigned" }
    )));
    print_field("Rescale", Some(image.rescale()));
    print_field("Stored Range", Some(format_args!(
        "{}..{}",
        image.min_pixel_value(),
        image.max_pixel_value()
    )));
    print_field("Window", image.tagged_window());

    print_field("SOP Class UID", info.sop_class.as_ref());
    print_field("Transfer Syntax", info.transfer_syntax.as_ref());
    print_field("Decoded As", info.strategy);

    println!();
}

fn print_field(name: &str, value: Option<impl Display>) {
    if let Some(v) = value {
        println!("{name:20}: {v}");
    }
}

fn print_dimensions(image: &DicomImage) {
    println!(
        "{:20}: {}x{} [{}]",
        "Dimensions",
        image.width(),
        image.height(),
        image.photometric_interpretation()
    );
}
