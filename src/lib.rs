pub mod cli;
pub mod dicom;
pub mod display;
pub mod display_metadata;
pub mod playback;
pub mod render;
pub mod series;
pub mod types;
pub mod viewer;
pub mod viewport;

// Re-export the main entry points
pub use dicom::{DecodeError, DicomDecoder, DicomImage, decode};
pub use display_metadata::{print_series, print_slice};
pub use playback::PlaybackController;
pub use render::{RenderError, transform};
pub use series::{Series, SeriesLoadError, SeriesManager, SeriesRequest};
pub use viewer::Viewer;
pub use viewport::ViewportController;
