//! Series loading
//!
//! A [`SeriesManager`] fetches the slices of one [`SeriesRequest`], decodes
//! them on the blocking pool and assembles the successes, in request order,
//! into a [`Series`]. Failed slices are reported and skipped.

mod config;
mod fetch;
mod manager;
mod progress;
mod source;

pub use config::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CONCURRENCY, LoaderConfig};
pub use fetch::{FetchError, FetchSlice, HttpFetcher};
pub use manager::SeriesManager;
pub use progress::{
    IgnoreProgress, LoadProgress, LoadReport, ProgressSink, SliceError, SliceFailure, SliceOutcome,
};
pub use source::{SeriesRequest, SliceLocation, SliceSource};

use crate::dicom::DicomImage;
use crate::types::{Modality, WindowLevel};
use std::sync::Arc;
use thiserror::Error;

/// Terminal failure of a whole series load
#[derive(Debug, Error)]
pub enum SeriesLoadError {
    #[error("none of the {requested} requested slices could be loaded")]
    NoSlicesDecoded {
        requested: usize,
        failures: Vec<SliceFailure>,
    },

    #[error("series load was cancelled")]
    Cancelled,
}

/// Decoded slices of one series, in request order. Never empty.
#[derive(Debug, Clone)]
pub struct Series {
    slices: Vec<Arc<DicomImage>>,
    modality: Modality,
    description: Option<String>,
    default_window: WindowLevel,
    report: LoadReport,
}

impl Series {
    /// Assemble a series from decoded slices.
    ///
    /// Series-level attributes come from the request where given, otherwise
    /// from the first slice.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesLoadError::NoSlicesDecoded`] with the report's failures
    /// if `slices` is empty.
    pub fn from_slices(
        slices: Vec<Arc<DicomImage>>,
        modality_hint: Option<&str>,
        description: Option<String>,
        report: LoadReport,
    ) -> Result<Self, SeriesLoadError> {
        let Some(first) = slices.first() else {
            return Err(SeriesLoadError::NoSlicesDecoded {
                requested: report.requested,
                failures: report.failures,
            });
        };

        let modality = modality_hint
            .and_then(|hint| hint.parse().ok())
            .or_else(|| first.info().modality.as_deref().map(Modality::from_dicom_code))
            .unwrap_or(Modality::Other);
        let description = description
            .filter(|d| !d.trim().is_empty())
            .or_else(|| first.info().series_description.clone());
        let default_window = first.default_window();

        Ok(Self {
            slices,
            modality,
            description,
            default_window,
            report,
        })
    }

    #[must_use]
    pub fn slices(&self) -> &[Arc<DicomImage>] {
        &self.slices
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<DicomImage>> {
        self.slices.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    #[must_use]
    pub fn modality(&self) -> Modality {
        self.modality
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// First slice's tagged window, or its rescaled min/max range
    #[must_use]
    pub fn default_window(&self) -> WindowLevel {
        self.default_window
    }

    #[must_use]
    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}
