use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use dcmcine::cli::Args;
use dcmcine::display;
use dcmcine::render;
use dcmcine::series::{LoadProgress, SliceOutcome};
use dcmcine::viewer::{Viewer, ViewerUpdate};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Window center change per arrow key press
const WINDOW_STEP: f64 = 10.0;
/// How often the key reader checks whether the viewer has quit
const KEY_POLL: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();

    if args.inputs.is_empty() {
        let _ = Args::command().print_help();
        println!();
        return;
    }

    if let Err(e) = run(&args).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: &Args) -> Result<()> {
    let (mut viewer, mut events) = Viewer::new(args.loader_config());
    viewer.set_fps(args.fps);
    viewer.open(args.series_request());

    // Stage 1: load the series
    let report = loop {
        let event = events.recv().await.context("Viewer event channel closed")?;
        match viewer.handle(event) {
            Some(ViewerUpdate::Progress(progress)) => print_progress(&progress),
            Some(ViewerUpdate::Opened(report)) => break report,
            Some(ViewerUpdate::Failed(err)) => return Err(err).context("Failed to load series"),
            None => {}
        }
    };
    eprintln!("{report}");

    // Stage 2: apply command-line view settings
    if let Some(viewport) = viewer.viewport_mut() {
        let window = args.window(viewport.default_window());
        viewport.set_window(window);
    }
    if let Some(playback) = viewer.playback() {
        playback.seek(args.slice);
    }

    // Stage 3: verbose output
    if args.verbose {
        if let Some(series) = viewer.series() {
            dcmcine::print_series(series);
        }
        if let Some(slice) = viewer.current_slice() {
            dcmcine::print_slice(slice);
        }
    }

    // Stage 4: display
    if args.play {
        cine(&mut viewer, args).await
    } else {
        let frame = viewer.render()?.context("No slice to display")?;
        display::print_frame(&render::to_rgba(&frame), args)
    }
}

fn print_progress(progress: &LoadProgress) {
    let LoadProgress {
        completed,
        total,
        file_name,
        ..
    } = progress;
    match &progress.outcome {
        SliceOutcome::Loaded => eprintln!("[{completed}/{total}] {file_name}"),
        SliceOutcome::Failed(err) => eprintln!("[{completed}/{total}] {file_name}: {err}"),
    }
}

/// Restores the terminal when the cine view exits, including on error.
struct RawMode;

impl RawMode {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        execute!(std::io::stdout(), cursor::Hide).context("Failed to hide cursor")?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = execute!(std::io::stdout(), cursor::Show);
        let _ = terminal::disable_raw_mode();
        println!();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    Redraw,
    Ignore,
    Quit,
}

async fn cine(viewer: &mut Viewer, args: &Args) -> Result<()> {
    let mut index_rx = viewer.playback().context("No series open")?.subscribe();
    let _raw = RawMode::enter()?;

    let (key_tx, mut keys) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || read_keys(&key_tx));

    if let Some(playback) = viewer.playback() {
        playback.play();
    }
    redraw(viewer, args)?;

    loop {
        tokio::select! {
            changed = index_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            key = keys.recv() => {
                let Some(key) = key else { break };
                match apply_key(viewer, key) {
                    KeyAction::Quit => break,
                    KeyAction::Ignore => continue,
                    KeyAction::Redraw => {}
                }
            }
        }
        redraw(viewer, args)?;
    }

    if let Some(playback) = viewer.playback() {
        playback.stop();
    }
    Ok(())
}

/// Forward key presses until the receiving side goes away.
fn read_keys(tx: &mpsc::UnboundedSender<KeyEvent>) {
    while !tx.is_closed() {
        match event::poll(KEY_POLL) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.send(key).is_err() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(_) => return,
            },
            Ok(false) => {}
            Err(_) => return,
        }
    }
}

fn apply_key(viewer: &mut Viewer, key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
        KeyCode::Char(' ') => {
            if let Some(playback) = viewer.playback() {
                playback.toggle();
            }
        }
        KeyCode::Left => {
            if let Some(playback) = viewer.playback() {
                playback.prev();
            }
        }
        KeyCode::Right => {
            if let Some(playback) = viewer.playback() {
                playback.next();
            }
        }
        KeyCode::Char('+' | '=') => {
            if let Some(viewport) = viewer.viewport_mut() {
                viewport.zoom_in();
            }
        }
        KeyCode::Char('-') => {
            if let Some(viewport) = viewer.viewport_mut() {
                viewport.zoom_out();
            }
        }
        KeyCode::Up | KeyCode::Down => {
            let step = if key.code == KeyCode::Up { WINDOW_STEP } else { -WINDOW_STEP };
            if let Some(viewport) = viewer.viewport_mut() {
                viewport.adjust_window(0.0, step);
            }
        }
        KeyCode::Char('r') => {
            if let Some(viewport) = viewer.viewport_mut() {
                viewport.reset();
            }
        }
        _ => return KeyAction::Ignore,
    }
    KeyAction::Redraw
}

fn redraw(viewer: &Viewer, args: &Args) -> Result<()> {
    let (Some(slice), Some(viewport), Some(playback)) =
        (viewer.current_slice(), viewer.viewport(), viewer.playback())
    else {
        return Ok(());
    };

    let frame = viewer
        .render_surface(slice.width(), slice.height())?
        .context("No slice to display")?;
    let state = playback.state();
    let status = format!(
        "{index}/{count} {mode} {fps} fps | {window} | zoom {zoom:.1}x | \
         space play/pause, </> step, +/- zoom, up/down level, r reset, q quit",
        index = playback.current_index() + 1,
        count = playback.slice_count(),
        mode = if playback.is_playing() { "playing" } else { "paused" },
        fps = state.fps,
        window = viewport.window(),
        zoom = viewport.zoom(),
    );
    display::redraw_frame(&frame, args, &status)
}
