use crate::playback::{DEFAULT_FPS, MAX_FPS, MIN_FPS};
use crate::series::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CONCURRENCY, LoaderConfig, SeriesRequest, SliceSource};
use crate::types::WindowLevel;
use clap::Parser;
use std::time::Duration;

/// A terminal DICOM series viewer with cine playback
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// DICOM files or http(s) URLs, in series order
    #[arg(value_name = "FILE|URL")]
    pub inputs: Vec<String>,

    /// Output width in terminal columns
    #[arg(short = 'W', long)]
    pub width: Option<u32>,

    /// Output height in terminal rows
    #[arg(short = 'H', long)]
    pub height: Option<u32>,

    /// Show slice metadata
    #[arg(short, long)]
    pub verbose: bool,

    /// Slice to show (0-based, clamped to the last slice)
    #[arg(long, default_value_t = 0)]
    pub slice: usize,

    /// Interactive cine playback
    #[arg(long)]
    pub play: bool,

    /// Playback frame rate
    #[arg(long, default_value_t = DEFAULT_FPS,
          value_parser = clap::value_parser!(u32).range(i64::from(MIN_FPS)..=i64::from(MAX_FPS)))]
    pub fps: u32,

    /// Window center override
    #[arg(long, allow_hyphen_values = true)]
    pub center: Option<f64>,

    /// Window width override
    #[arg(long = "width-level")]
    pub width_level: Option<f64>,

    /// Series modality, e.g. CT or MRI (defaults to the first slice's tag)
    #[arg(long)]
    pub modality: Option<String>,

    /// Slices fetched and decoded at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub concurrency: usize,

    /// Per-slice fetch timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
    pub timeout: u64,
}

impl Args {
    #[must_use]
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::default()
            .with_max_concurrency(self.concurrency)
            .with_fetch_timeout(Duration::from_secs(self.timeout))
    }

    #[must_use]
    pub fn series_request(&self) -> SeriesRequest {
        let request = SeriesRequest::new(self.inputs.iter().map(|input| SliceSource::parse(input)));
        match &self.modality {
            Some(modality) => request.with_modality_hint(modality),
            None => request,
        }
    }

    /// Series default window with `--center` / `--width-level` applied.
    #[must_use]
    pub fn window(&self, default: WindowLevel) -> WindowLevel {
        WindowLevel::new(
            self.center.unwrap_or(default.center),
            self.width_level.unwrap_or(default.width),
        )
    }
}
