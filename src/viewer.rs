//! One viewing session: at most one open series at a time
//!
//! Loads run in the background and report through [`ViewerEvent`]s. Every
//! open bumps a generation; events tagged with an older generation are
//! dropped by [`Viewer::handle`], so a slow load can never overwrite a newer
//! series.

use crate::dicom::DicomImage;
use crate::playback::{DEFAULT_FPS, PlaybackController};
use crate::render::{self, RenderError};
use crate::series::{
    FetchSlice, HttpFetcher, LoadProgress, LoadReport, LoaderConfig, Series, SeriesLoadError,
    SeriesManager, SeriesRequest,
};
use crate::types::WindowLevel;
use crate::viewport::ViewportController;
use image::{GrayImage, RgbaImage};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug)]
pub struct ViewerEvent {
    pub generation: u64,
    pub kind: ViewerEventKind,
}

#[derive(Debug)]
pub enum ViewerEventKind {
    Progress(LoadProgress),
    Loaded(Result<Series, SeriesLoadError>),
}

/// What an applied event changed
#[derive(Debug)]
pub enum ViewerUpdate {
    Progress(LoadProgress),
    Opened(LoadReport),
    Failed(SeriesLoadError),
}

struct OpenSeries {
    series: Series,
    viewport: ViewportController,
    playback: PlaybackController,
}

pub struct Viewer<F: FetchSlice + Clone = HttpFetcher> {
    fetcher: F,
    config: LoaderConfig,
    fps: u32,
    generation: u64,
    events: mpsc::UnboundedSender<ViewerEvent>,
    manager: Option<SeriesManager<F>>,
    open: Option<OpenSeries>,
}

impl Viewer {
    /// Viewer plus the receiver the host drains into [`Viewer::handle`].
    #[must_use]
    pub fn new(config: LoaderConfig) -> (Self, mpsc::UnboundedReceiver<ViewerEvent>) {
        Self::with_fetcher(HttpFetcher::default(), config)
    }
}

impl<F: FetchSlice + Clone> Viewer<F> {
    #[must_use]
    pub fn with_fetcher(
        fetcher: F,
        config: LoaderConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ViewerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let viewer = Self {
            fetcher,
            config,
            fps: DEFAULT_FPS,
            generation: 0,
            events,
            manager: None,
            open: None,
        };
        (viewer, rx)
    }

    /// Frame rate given to the playback controller of series opened later.
    pub fn set_fps(&mut self, fps: u32) {
        self.fps = fps;
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.manager.is_some()
    }

    /// Start loading `request`, replacing whatever was open or loading.
    ///
    /// Must be called from within a tokio runtime. Returns the generation
    /// the load's events will carry.
    pub fn open(&mut self, request: SeriesRequest) -> u64 {
        self.close();
        let generation = self.generation;
        debug!(generation, slices = request.len(), "opening series");

        let manager = SeriesManager::with_fetcher(self.fetcher.clone(), self.config);
        let progress_tx = self.events.clone();
        let load = manager.load(request, move |progress: LoadProgress| {
            let _ = progress_tx.send(ViewerEvent {
                generation,
                kind: ViewerEventKind::Progress(progress),
            });
        });

        let done_tx = self.events.clone();
        tokio::spawn(async move {
            let result = load.await;
            let _ = done_tx.send(ViewerEvent {
                generation,
                kind: ViewerEventKind::Loaded(result),
            });
        });
        self.manager = Some(manager);
        generation
    }

    /// Cancel any load and drop the open series.
    pub fn close(&mut self) {
        if let Some(manager) = self.manager.take() {
            manager.cancel();
        }
        self.open = None;
        self.generation += 1;
    }

    /// Apply an event. Returns `None` for events from a superseded load.
    pub fn handle(&mut self, event: ViewerEvent) -> Option<ViewerUpdate> {
        if event.generation != self.generation {
            debug!(
                stale = event.generation,
                current = self.generation,
                "discarding stale viewer event"
            );
            return None;
        }

        match event.kind {
            ViewerEventKind::Progress(progress) => Some(ViewerUpdate::Progress(progress)),
            ViewerEventKind::Loaded(result) => {
                self.manager = None;
                match result {
                    Ok(series) => {
                        let report = series.report().clone();
                        self.open = Some(OpenSeries {
                            viewport: ViewportController::new(series.default_window()),
                            playback: PlaybackController::new(series.len(), self.fps),
                            series,
                        });
                        Some(ViewerUpdate::Opened(report))
                    }
                    Err(err) => Some(ViewerUpdate::Failed(err)),
                }
            }
        }
    }

    #[must_use]
    pub fn series(&self) -> Option<&Series> {
        self.open.as_ref().map(|open| &open.series)
    }

    #[must_use]
    pub fn viewport(&self) -> Option<&ViewportController> {
        self.open.as_ref().map(|open| &open.viewport)
    }

    pub fn viewport_mut(&mut self) -> Option<&mut ViewportController> {
        self.open.as_mut().map(|open| &mut open.viewport)
    }

    #[must_use]
    pub fn playback(&self) -> Option<&PlaybackController> {
        self.open.as_ref().map(|open| &open.playback)
    }

    #[must_use]
    pub fn current_slice(&self) -> Option<&Arc<DicomImage>> {
        let open = self.open.as_ref()?;
        open.series.get(open.playback.current_index())
    }

    /// Window the current slice with the viewport's window.
    ///
    /// # Errors
    ///
    /// Propagates [`RenderError`] from the transform.
    pub fn render(&self) -> Result<Option<GrayImage>, RenderError> {
        let Some((image, window)) = self.render_input() else {
            return Ok(None);
        };
        render::transform(&image, window).map(Some)
    }

    /// [`Viewer::render`] then place the raster on a host surface with the
    /// viewport's zoom and pan.
    ///
    /// # Errors
    ///
    /// Propagates [`RenderError`] from the transform or composition.
    pub fn render_surface(&self, width: u32, height: u32) -> Result<Option<RgbaImage>, RenderError> {
        let (Some(raster), Some(viewport)) = (self.render()?, self.viewport()) else {
            return Ok(None);
        };
        render::compose(&raster, viewport.zoom(), viewport.pan(), width, height).map(Some)
    }

    /// [`Viewer::render`] on the blocking pool. The future does not borrow
    /// the viewer.
    pub fn render_async(
        &self,
    ) -> impl Future<Output = Result<Option<GrayImage>, RenderError>> + Send + 'static {
        let input = self.render_input();
        async move {
            match input {
                Some((image, window)) => render::render_async(image, window).await.map(Some),
                None => Ok(None),
            }
        }
    }

    fn render_input(&self) -> Option<(Arc<DicomImage>, WindowLevel)> {
        let window = self.viewport()?.window();
        Some((Arc::clone(self.current_slice()?), window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::testutil::ct_slice;
    use crate::series::{FetchError, SliceLocation, SliceOutcome, SliceSource};
    use assert_matches::assert_matches;

    fn request(prefix: &str, count: u16) -> SeriesRequest {
        SeriesRequest::new((0..count).map(|i| {
            SliceSource::from_bytes(format!("{prefix}{i}"), ct_slice(2, 2, &[i, i + 10, i + 20, i + 30]))
        }))
    }

    /// Drain events until the current load settles.
    async fn settle(
        viewer: &mut Viewer,
        rx: &mut mpsc::UnboundedReceiver<ViewerEvent>,
    ) -> ViewerUpdate {
        loop {
            let event = rx.recv().await.expect("viewer keeps a sender");
            match viewer.handle(event) {
                Some(ViewerUpdate::Progress(_)) | None => continue,
                Some(update) => return update,
            }
        }
    }

    #[tokio::test]
    async fn test_open_builds_viewport_and_playback() {
        let (mut viewer, mut rx) = Viewer::new(LoaderConfig::default());
        viewer.open(request("IM", 3));
        assert!(viewer.is_loading());

        let update = settle(&mut viewer, &mut rx).await;

        assert_matches!(update, ViewerUpdate::Opened(LoadReport { requested: 3, loaded: 3, .. }));
        assert!(!viewer.is_loading());
        let series = viewer.series().unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(viewer.viewport().unwrap().window(), series.default_window());
        assert_eq!(viewer.playback().unwrap().slice_count(), 3);
        assert_eq!(viewer.current_slice().unwrap().source_name(), "IM0");
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let (mut viewer, mut rx) = Viewer::new(LoaderConfig::default());
        let first = viewer.open(request("old", 5));
        let second = viewer.open(request("new", 2));
        assert!(second > first);

        // A completion from the superseded load changes nothing
        let stale_series = Series::from_slices(
            vec![Arc::new(crate::dicom::decode(&ct_slice(1, 1, &[7]), "stale").unwrap())],
            None,
            None,
            LoadReport { requested: 1, loaded: 1, failures: Vec::new() },
        )
        .unwrap();
        let stale = ViewerEvent {
            generation: first,
            kind: ViewerEventKind::Loaded(Ok(stale_series)),
        };
        assert!(viewer.handle(stale).is_none());
        assert!(viewer.series().is_none());

        settle(&mut viewer, &mut rx).await;
        assert_eq!(viewer.series().unwrap().len(), 2);
        assert_eq!(viewer.current_slice().unwrap().source_name(), "new0");
    }

    #[tokio::test]
    async fn test_failed_load_reports_error() {
        let (mut viewer, mut rx) = Viewer::new(LoaderConfig::default());
        viewer.open(SeriesRequest::new([SliceSource::from_bytes("junk", vec![1u8; 40])]));

        let update = settle(&mut viewer, &mut rx).await;

        assert_matches!(update, ViewerUpdate::Failed(SeriesLoadError::NoSlicesDecoded { requested: 1, .. }));
        assert!(viewer.series().is_none());
    }

    #[tokio::test]
    async fn test_render_follows_viewport_and_playback() {
        let (mut viewer, mut rx) = Viewer::new(LoaderConfig::default());
        assert!(viewer.render().unwrap().is_none());

        viewer.open(request("IM", 2));
        settle(&mut viewer, &mut rx).await;

        viewer.viewport_mut().unwrap().set_window(WindowLevel::new(-1000.0, 1.0));
        let raster = viewer.render().unwrap().unwrap();
        assert_eq!(raster.dimensions(), (2, 2));
        assert!(raster.pixels().all(|p| p[0] == 255));

        viewer.playback().unwrap().next();
        assert_eq!(viewer.current_slice().unwrap().source_name(), "IM1");
        let offloaded = viewer.render_async().await.unwrap().unwrap();
        assert_eq!(offloaded, viewer.render().unwrap().unwrap());

        let surface = viewer.render_surface(8, 8).unwrap().unwrap();
        assert_eq!(surface.dimensions(), (8, 8));
    }

    /// Serves in-memory slices and never answers for URLs.
    #[derive(Clone)]
    struct StallingFetcher;

    impl FetchSlice for StallingFetcher {
        async fn fetch(&self, location: &SliceLocation) -> Result<Vec<u8>, FetchError> {
            match location {
                SliceLocation::Url(_) => std::future::pending().await,
                other => HttpFetcher::default().fetch(other).await,
            }
        }
    }

    #[tokio::test]
    async fn test_close_drops_series_and_ignores_late_events() {
        let (mut viewer, mut rx) = Viewer::with_fetcher(StallingFetcher, LoaderConfig::default());
        let mut slices = vec![SliceSource::from_bytes("IM0", ct_slice(1, 1, &[5]))];
        slices.extend((1..4).map(|i| SliceSource::from_url(format!("http://pacs.invalid/IM{i}"))));
        let generation = viewer.open(SeriesRequest::new(slices));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.generation, generation);
        assert_matches!(
            viewer.handle(first),
            Some(ViewerUpdate::Progress(LoadProgress { index: 0, completed: 1, .. }))
        );

        viewer.close();
        assert!(!viewer.is_loading());
        assert!(viewer.generation() > generation);

        let late_progress = ViewerEvent {
            generation,
            kind: ViewerEventKind::Progress(LoadProgress {
                index: 1,
                completed: 2,
                total: 4,
                file_name: "IM1".into(),
                outcome: SliceOutcome::Loaded,
            }),
        };
        assert!(viewer.handle(late_progress).is_none());

        // The cancelled load still reports its result under the old generation
        let loaded = loop {
            let event = rx.recv().await.unwrap();
            if matches!(event.kind, ViewerEventKind::Loaded(_)) {
                break event;
            }
        };
        assert_eq!(loaded.generation, generation);
        assert_matches!(loaded.kind, ViewerEventKind::Loaded(Err(SeriesLoadError::Cancelled)));
        assert!(viewer.handle(loaded).is_none());

        assert!(viewer.series().is_none());
        assert!(viewer.playback().is_none());
        assert!(viewer.render().unwrap().is_none());
    }
}
