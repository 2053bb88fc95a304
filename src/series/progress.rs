//! Per-slice outcomes, progress events and the final load report

use super::fetch::FetchError;
use crate::dicom::DecodeError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why one slice did not make it into the series
#[derive(Debug, Error)]
pub enum SliceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("decode worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone)]
pub struct SliceFailure {
    /// Position in the request
    pub index: usize,
    pub name: String,
    pub error: Arc<SliceError>,
}

impl fmt::Display for SliceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slice {} ({}): {}", self.index, self.name, self.error)
    }
}

#[derive(Debug, Clone)]
pub enum SliceOutcome {
    Loaded,
    Failed(Arc<SliceError>),
}

impl SliceOutcome {
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}

/// Emitted once per slice attempt, in completion order
#[derive(Debug, Clone)]
pub struct LoadProgress {
    /// Position of the slice in the request
    pub index: usize,
    /// Attempts finished so far, including this one
    pub completed: usize,
    pub total: usize,
    pub file_name: String,
    pub outcome: SliceOutcome,
}

/// Receiver of progress events.
///
/// Called from the loader task; implementations should return quickly.
pub trait ProgressSink: Send + Sync + 'static {
    fn on_progress(&self, progress: LoadProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(LoadProgress) + Send + Sync + 'static,
{
    fn on_progress(&self, progress: LoadProgress) {
        self(progress);
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreProgress;

impl ProgressSink for IgnoreProgress {
    fn on_progress(&self, _progress: LoadProgress) {}
}

/// Summary of a finished load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub requested: usize,
    pub loaded: usize,
    /// Sorted by request index
    pub failures: Vec<SliceFailure>,
}

impl LoadReport {
    /// Some but not all slices failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.loaded < self.requested
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Loaded {} of {} slices", self.loaded, self.requested)?;
        if self.is_degraded() {
            write!(f, " (degraded)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_summary() {
        let full = LoadReport {
            requested: 3,
            loaded: 3,
            failures: Vec::new(),
        };
        assert_eq!(full.to_string(), "Loaded 3 of 3 slices");
        assert!(!full.is_degraded());

        let partial = LoadReport {
            requested: 4,
            loaded: 3,
            failures: vec![SliceFailure {
                index: 2,
                name: "IM0003".to_string(),
                error: Arc::new(SliceError::Timeout(Duration::from_secs(30))),
            }],
        };
        assert_eq!(partial.to_string(), "Loaded 3 of 4 slices (degraded)");
        assert_eq!(partial.failures[0].to_string(), "slice 2 (IM0003): fetch timed out after 30s");
    }
}
