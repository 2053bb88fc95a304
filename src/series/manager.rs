//! Concurrent fetch and decode of one series

use super::config::LoaderConfig;
use super::fetch::{FetchSlice, HttpFetcher};
use super::progress::{LoadProgress, LoadReport, ProgressSink, SliceError, SliceFailure, SliceOutcome};
use super::source::{SeriesRequest, SliceSource};
use super::{Series, SeriesLoadError};
use crate::dicom::{DicomDecoder, DicomImage};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

struct Shared<F> {
    fetcher: F,
    decoder: DicomDecoder,
    config: LoaderConfig,
    cancel_tx: watch::Sender<bool>,
    /// Written by `cancel()`; held while a progress event is delivered
    cancelled: Mutex<bool>,
}

impl<F> Shared<F> {
    fn lock_cancelled(&self) -> MutexGuard<'_, bool> {
        self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_cancelled(&self) -> bool {
        *self.lock_cancelled()
    }

    /// Deliver unless cancelled. Returns false if the event was dropped.
    fn deliver(&self, sink: &impl ProgressSink, progress: LoadProgress) -> bool {
        let cancelled = self.lock_cancelled();
        if *cancelled {
            return false;
        }
        sink.on_progress(progress);
        true
    }
}

/// Loads one series. Disposable: once cancelled (or dropped) it stays
/// cancelled and every later `load` resolves to [`SeriesLoadError::Cancelled`].
pub struct SeriesManager<F: FetchSlice = HttpFetcher> {
    shared: Arc<Shared<F>>,
}

impl SeriesManager {
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_fetcher(HttpFetcher::default(), config)
    }
}

impl Default for SeriesManager {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl<F: FetchSlice> SeriesManager<F> {
    #[must_use]
    pub fn with_fetcher(fetcher: F, config: LoaderConfig) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                fetcher,
                decoder: DicomDecoder::default(),
                config,
                cancel_tx,
                cancelled: Mutex::new(false),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> LoaderConfig {
        self.shared.config
    }

    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.shared.fetcher
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Stop all in-flight work. No progress event is delivered after this
    /// returns, and the pending `load` resolves to `Cancelled`.
    pub fn cancel(&self) {
        {
            let mut cancelled = self.shared.lock_cancelled();
            if *cancelled {
                return;
            }
            *cancelled = true;
        }
        self.shared.cancel_tx.send_replace(true);
        debug!("series load cancelled");
    }

    /// Fetch and decode every slice of `request`.
    ///
    /// The returned future owns everything it needs and can be spawned.
    /// Individual slice failures end up in the series report; the load only
    /// fails when nothing decoded or when it was cancelled.
    pub fn load<S: ProgressSink>(
        &self,
        request: SeriesRequest,
        sink: S,
    ) -> impl Future<Output = Result<Series, SeriesLoadError>> + Send + 'static {
        run_load(Arc::clone(&self.shared), request, sink)
    }
}

impl<F: FetchSlice> Drop for SeriesManager<F> {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_load<F: FetchSlice, S: ProgressSink>(
    shared: Arc<Shared<F>>,
    request: SeriesRequest,
    sink: S,
) -> Result<Series, SeriesLoadError> {
    let mut cancel_rx = shared.cancel_tx.subscribe();
    if shared.is_cancelled() {
        return Err(SeriesLoadError::Cancelled);
    }

    let total = request.slices.len();
    let permits = Arc::new(Semaphore::new(shared.config.permits()));
    debug!(total, concurrency = shared.config.permits(), "loading series");

    let mut tasks = JoinSet::new();
    for (index, source) in request.slices.into_iter().enumerate() {
        let shared = Arc::clone(&shared);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            // Never closed, so acquiring only waits
            let _permit = permits.acquire_owned().await;
            let result = load_slice(shared, &source).await;
            (index, source.name, result)
        });
    }

    let mut slots: Vec<Option<Arc<DicomImage>>> = vec![None; total];
    let mut failures = Vec::new();
    let mut completed = 0;

    while !tasks.is_empty() {
        let joined = tokio::select! {
            biased;
            _ = cancel_rx.changed() => None,
            joined = tasks.join_next() => joined,
        };
        let Some(joined) = joined else {
            tasks.abort_all();
            return Err(SeriesLoadError::Cancelled);
        };

        let (index, name, result) = match joined {
            Ok(done) => done,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => continue,
        };

        completed += 1;
        let outcome = match result {
            Ok(image) => {
                slots[index] = Some(Arc::new(image));
                SliceOutcome::Loaded
            }
            Err(error) => {
                warn!(index, name = %name, error = %error, "slice failed to load");
                let error = Arc::new(error);
                failures.push(SliceFailure {
                    index,
                    name: name.clone(),
                    error: Arc::clone(&error),
                });
                SliceOutcome::Failed(error)
            }
        };

        let progress = LoadProgress {
            index,
            completed,
            total,
            file_name: name,
            outcome,
        };
        if !shared.deliver(&sink, progress) {
            return Err(SeriesLoadError::Cancelled);
        }
    }

    if shared.is_cancelled() {
        return Err(SeriesLoadError::Cancelled);
    }

    failures.sort_by_key(|failure| failure.index);
    let slices: Vec<Arc<DicomImage>> = slots.into_iter().flatten().collect();
    let report = LoadReport {
        requested: total,
        loaded: slices.len(),
        failures,
    };
    info!(loaded = report.loaded, requested = report.requested, "series load finished");

    Series::from_slices(
        slices,
        request.modality_hint.as_deref(),
        request.description,
        report,
    )
}

async fn load_slice<F: FetchSlice>(
    shared: Arc<Shared<F>>,
    source: &SliceSource,
) -> Result<DicomImage, SliceError> {
    let limit = shared.config.fetch_timeout;
    let bytes = tokio::time::timeout(limit, shared.fetcher.fetch(&source.location))
        .await
        .map_err(|_| SliceError::Timeout(limit))??;

    let name = source.name.clone();
    tokio::task::spawn_blocking(move || shared.decoder.decode(&bytes, &name))
        .await
        .map_err(|e| SliceError::Worker(e.to_string()))?
        .map_err(SliceError::from)
}
