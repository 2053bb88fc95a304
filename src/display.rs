use anyhow::{Context, Result};
use crate::cli::Args;
use crossterm::{cursor, queue, terminal};
use image::{DynamicImage, RgbaImage};
use std::io::{IsTerminal, Write};
use viuer::{Config as ViuerConfig, print};

/// Default output width in terminal columns
const DEFAULT_COLUMNS: u32 = 24;

fn viuer_config(args: &Args, absolute: bool) -> ViuerConfig {
    let is_tty = std::io::stdout().is_terminal();

    let (width, height) = match (args.width, args.height) {
        (Some(w), ..) => (Some(w), None),
        (None, Some(h)) => (None, Some(h)),
        (None, None) => (Some(DEFAULT_COLUMNS), None),
    };

    ViuerConfig {
        width,
        height,
        absolute_offset: absolute,
        x: 0,
        y: 0,
        use_kitty: is_tty,
        use_iterm: is_tty,
        use_sixel: is_tty,
        ..Default::default()
    }
}

/// Print one frame below the cursor.
pub fn print_frame(frame: &RgbaImage, args: &Args) -> Result<()> {
    std::io::stdout().flush().context("Failed to flush stdout")?;

    print(&DynamicImage::ImageRgba8(frame.clone()), &viuer_config(args, false))
        .context("Failed to display image")?;

    Ok(())
}

/// Redraw the cine view in place: frame at the top left, status line under it.
/// Expects the terminal in raw mode.
pub fn redraw_frame(frame: &RgbaImage, args: &Args, status: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    queue!(stdout, cursor::MoveTo(0, 0), terminal::Clear(terminal::ClearType::All))
        .context("Failed to clear terminal")?;
    stdout.flush().context("Failed to flush stdout")?;

    let (_, rows) = print(&DynamicImage::ImageRgba8(frame.clone()), &viuer_config(args, true))
        .context("Failed to display image")?;

    let row = u16::try_from(rows).unwrap_or(u16::MAX);
    queue!(stdout, cursor::MoveTo(0, row), terminal::Clear(terminal::ClearType::CurrentLine))
        .context("Failed to move cursor")?;
    write!(stdout, "{status}").context("Failed to write status line")?;
    stdout.flush().context("Failed to flush stdout")?;

    Ok(())
}
