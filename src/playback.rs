//! Cine playback over a series' slice indices
//!
//! Two states, `Stopped` (initial) and `Playing`. While playing, a timer task
//! advances the index every `1 / fps` seconds and wraps at the end of the
//! series. All state lives behind one mutex; the timer re-checks its run
//! token under that mutex before every advance, so once `stop()` returns no
//! further index change can happen.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 30;
pub const DEFAULT_FPS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Stopped,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    pub mode: PlaybackMode,
    pub fps: u32,
}

struct State {
    mode: PlaybackMode,
    fps: u32,
    index: usize,
    slice_count: usize,
    /// Bumped on every play/stop; a timer only acts for its own run
    run: u64,
    ticker: Option<JoinHandle<()>>,
}

struct Inner {
    state: Mutex<State>,
    index_tx: watch::Sender<usize>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_index(&self, state: &mut State, index: usize) {
        state.index = index;
        self.index_tx.send_replace(index);
    }
}

/// Cine controller for one open series. Dropping it stops playback.
pub struct PlaybackController {
    inner: Arc<Inner>,
}

impl PlaybackController {
    #[must_use]
    pub fn new(slice_count: usize, fps: u32) -> Self {
        let (index_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    mode: PlaybackMode::Stopped,
                    fps: clamp_fps(fps),
                    index: 0,
                    slice_count,
                    run: 0,
                    ticker: None,
                }),
                index_tx,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        let state = self.inner.lock();
        PlaybackState {
            mode: state.mode,
            fps: state.fps,
        }
    }

    #[must_use]
    pub fn mode(&self) -> PlaybackMode {
        self.inner.lock().mode
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.mode() == PlaybackMode::Playing
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.inner.lock().index
    }

    #[must_use]
    pub fn slice_count(&self) -> usize {
        self.inner.lock().slice_count
    }

    /// Receiver that observes every index change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.inner.index_tx.subscribe()
    }

    /// Start cine playback. Only possible with more than one slice.
    ///
    /// The timer runs on the current tokio runtime; outside one nothing
    /// happens. Returns whether playback is now running because of this call.
    pub fn play(&self) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("playback needs a tokio runtime");
            return false;
        };
        let mut state = self.inner.lock();
        if state.mode == PlaybackMode::Playing || state.slice_count <= 1 {
            return false;
        }

        state.mode = PlaybackMode::Playing;
        state.run += 1;
        let run = state.run;
        state.ticker = Some(runtime.spawn(run_ticker(Arc::downgrade(&self.inner), run)));
        debug!(fps = state.fps, index = state.index, "playback started");
        true
    }

    /// Stop playback and cancel the pending advance.
    pub fn stop(&self) {
        let mut state = self.inner.lock();
        if state.mode == PlaybackMode::Stopped {
            return;
        }

        state.mode = PlaybackMode::Stopped;
        state.run += 1;
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        debug!(index = state.index, "playback stopped");
    }

    pub fn pause(&self) {
        self.stop();
    }

    pub fn toggle(&self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.play();
        }
    }

    /// Change the frame rate (clamped to 1..=30). Applies from the next tick.
    pub fn set_fps(&self, fps: u32) -> u32 {
        let mut state = self.inner.lock();
        state.fps = clamp_fps(fps);
        state.fps
    }

    /// Step forward, wrapping to the first slice.
    pub fn next(&self) -> usize {
        self.step(|index, count| (index + 1) % count)
    }

    /// Step back, wrapping to the last slice.
    pub fn prev(&self) -> usize {
        self.step(|index, count| (index + count - 1) % count)
    }

    /// Jump to `index`, clamped to the last slice.
    pub fn seek(&self, index: usize) -> usize {
        self.step(|_, count| index.min(count - 1))
    }

    fn step(&self, f: impl FnOnce(usize, usize) -> usize) -> usize {
        let mut state = self.inner.lock();
        if state.slice_count == 0 {
            return 0;
        }
        let index = f(state.index, state.slice_count);
        self.inner.set_index(&mut state, index);
        index
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_ticker(inner: Weak<Inner>, run: u64) {
    loop {
        let Some(fps) = with_live_run(&inner, run, |_, state| state.fps) else {
            return;
        };

        tokio::time::sleep(frame_interval(fps)).await;

        let advanced = with_live_run(&inner, run, |inner, state| {
            let index = (state.index + 1) % state.slice_count;
            inner.set_index(state, index);
        });
        if advanced.is_none() {
            return;
        }
    }
}

/// Run `f` under the state lock if `run` is still the active playback run.
fn with_live_run<T>(
    inner: &Weak<Inner>,
    run: u64,
    f: impl FnOnce(&Inner, &mut State) -> T,
) -> Option<T> {
    let inner = inner.upgrade()?;
    let mut state = inner.lock();
    if state.run != run || state.mode != PlaybackMode::Playing || state.slice_count == 0 {
        return None;
    }
    Some(f(&inner, &mut state))
}

fn clamp_fps(fps: u32) -> u32 {
    fps.clamp(MIN_FPS, MAX_FPS)
}

fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs(1) / clamp_fps(fps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[test]
    fn test_initial_state() {
        let playback = PlaybackController::new(10, 5);
        assert_eq!(
            playback.state(),
            PlaybackState {
                mode: PlaybackMode::Stopped,
                fps: 5
            }
        );
        assert_eq!(playback.current_index(), 0);
    }

    #[test]
    fn test_fps_is_clamped() {
        let playback = PlaybackController::new(3, 0);
        assert_eq!(playback.state().fps, MIN_FPS);
        assert_eq!(playback.set_fps(120), MAX_FPS);
        assert_eq!(playback.set_fps(12), 12);
    }

    #[test]
    fn test_play_without_runtime_is_refused() {
        let playback = PlaybackController::new(5, 10);
        assert!(!playback.play());
        assert_eq!(playback.mode(), PlaybackMode::Stopped);

        playback.toggle();
        assert!(!playback.is_playing());
    }

    #[tokio::test]
    async fn test_single_slice_cannot_play() {
        let playback = PlaybackController::new(1, 10);
        assert!(!playback.play());
        assert_eq!(playback.mode(), PlaybackMode::Stopped);
    }

    #[test]
    fn test_manual_navigation_wraps_and_clamps() {
        let playback = PlaybackController::new(4, 10);

        assert_eq!(playback.prev(), 3);
        assert_eq!(playback.next(), 0);
        assert_eq!(playback.next(), 1);
        assert_eq!(playback.seek(2), 2);
        assert_eq!(playback.seek(99), 3);
        assert_eq!(playback.mode(), PlaybackMode::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cine_loop_wraps_around() {
        let playback = PlaybackController::new(10, 5);
        assert!(playback.play());

        // 200ms per frame: five ticks by 1.1s, ten by 2.1s
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(playback.current_index(), 5);

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(playback.current_index(), 0);
        assert!(playback.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_scheduled_tick() {
        let playback = PlaybackController::new(10, 5);
        playback.play();

        // Stop exactly when a tick is due
        sleep(Duration::from_millis(1000)).await;
        playback.stop();
        let stopped_at = playback.current_index();
        assert!(stopped_at == 4 || stopped_at == 5, "index was {stopped_at}");

        sleep(Duration::from_secs(5)).await;
        assert_eq!(playback.current_index(), stopped_at);
        assert_eq!(playback.mode(), PlaybackMode::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fps_change_applies_on_next_tick() {
        let playback = PlaybackController::new(20, 5);
        playback.play();

        sleep(Duration::from_millis(100)).await;
        playback.set_fps(10);

        // Tick at 200ms still uses the old interval, then 100ms steps: 300, 400
        sleep(Duration::from_millis(350)).await;
        assert_eq!(playback.current_index(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_while_playing_keeps_mode() {
        let playback = PlaybackController::new(10, 5);
        playback.play();
        playback.seek(7);

        assert!(playback.is_playing());
        sleep(Duration::from_millis(250)).await;
        assert_eq!(playback.current_index(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_advances() {
        let playback = PlaybackController::new(3, 10);
        let mut rx = playback.subscribe();
        playback.play();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
        playback.toggle();
        assert!(!playback.is_playing());
    }
}
