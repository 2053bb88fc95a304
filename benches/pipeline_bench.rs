use criterion::{Criterion, criterion_group, criterion_main};
use dcmcine::dicom::{self, DicomImage, PixelSamples};
use dcmcine::render;
use dcmcine::types::{Dimensions, RescaleParams, WindowLevel};
use dcmcine::viewport::Pan;
use std::hint::black_box;
use std::sync::Arc;

const ROWS: u16 = 512;
const COLS: u16 = 512;

// ============================================================================
// Synthetic inputs
// ============================================================================

fn ramp() -> Vec<u16> {
    (0..usize::from(ROWS) * usize::from(COLS))
        .map(|i| (i % 4096) as u16)
        .collect()
}

fn element(out: &mut Vec<u8>, group: u16, elem: u16, vr: &[u8; 2], value: &[u8]) {
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&elem.to_le_bytes());
    out.extend_from_slice(vr);
    if matches!(vr, b"OB" | b"OW") {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(value);
}

/// Explicit VR little endian Part 10 CT slice
fn part10_slice() -> Vec<u8> {
    let mut out = vec![0u8; 128];
    out.extend_from_slice(b"DICM");
    element(&mut out, 0x0002, 0x0010, b"UI", b"1.2.840.10008.1.2.1\0");

    element(&mut out, 0x0008, 0x0060, b"CS", b"CT");
    element(&mut out, 0x0028, 0x0002, b"US", &1u16.to_le_bytes());
    element(&mut out, 0x0028, 0x0004, b"CS", b"MONOCHROME2 ");
    element(&mut out, 0x0028, 0x0010, b"US", &ROWS.to_le_bytes());
    element(&mut out, 0x0028, 0x0011, b"US", &COLS.to_le_bytes());
    element(&mut out, 0x0028, 0x0100, b"US", &16u16.to_le_bytes());
    element(&mut out, 0x0028, 0x0101, b"US", &12u16.to_le_bytes());
    element(&mut out, 0x0028, 0x0103, b"US", &0u16.to_le_bytes());
    element(&mut out, 0x0028, 0x1052, b"DS", b"-1024 ");
    element(&mut out, 0x0028, 0x1053, b"DS", b"1 ");

    let pixels: Vec<u8> = ramp().iter().flat_map(|s| s.to_le_bytes()).collect();
    element(&mut out, 0x7FE0, 0x0010, b"OW", &pixels);
    out
}

fn ct_image() -> DicomImage {
    DicomImage::from_samples(
        "bench",
        Dimensions::new(ROWS, COLS),
        PixelSamples::U16(Arc::from(ramp())),
        RescaleParams::new(1.0, -1024.0),
    )
    .unwrap()
}

// ============================================================================
// Benchmarks
// ============================================================================

/// Byte buffer to DicomImage, including the full min/max scan
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let bytes = part10_slice();

    group.bench_function("part10_512x512_u16", |b| {
        b.iter(|| dicom::decode(black_box(&bytes), "bench").unwrap());
    });

    group.finish();
}

/// Window/level transform, the per-frame cost of cine playback
fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    let image = ct_image();

    group.bench_function("soft_tissue_window", |b| {
        b.iter(|| render::transform(black_box(&image), WindowLevel::new(40.0, 400.0)).unwrap());
    });

    group.bench_function("range_window", |b| {
        let window = image.range_window();
        b.iter(|| render::transform(black_box(&image), window).unwrap());
    });

    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    let raster = render::transform(&ct_image(), WindowLevel::new(40.0, 400.0)).unwrap();

    group.bench_function("zoomed_panned_800x600", |b| {
        b.iter(|| {
            render::compose(black_box(&raster), 1.44, Pan::new(30.0, -12.0), 800, 600).unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_transform, bench_compose);
criterion_main!(benches);
