//! Zoom, pan and window/level state for one open series

use crate::types::WindowLevel;
use std::fmt;

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;
pub const ZOOM_STEP: f64 = 1.2;

/// Window change per pointer pixel while dragging window/level
const WINDOW_DRAG_SENSITIVITY: f64 = 1.0;

/// Pan offset in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pan {
    pub x: f64,
    pub y: f64,
}

impl Pan {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Pan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({x:+.0}, {y:+.0})", x = self.x, y = self.y)
    }
}

/// Snapshot of everything the render step needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub zoom: f64,
    pub pan: Pan,
    pub window: WindowLevel,
    pub current_slice_index: usize,
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    zoom: f64,
    pan: Pan,
    window: WindowLevel,
    default_window: WindowLevel,
    drag_origin: Option<(f64, f64)>,
}

impl ViewportController {
    /// New viewport showing the series at zoom 1 with its default window.
    #[must_use]
    pub fn new(default_window: WindowLevel) -> Self {
        let default_window = sanitize(default_window);
        Self {
            zoom: 1.0,
            pan: Pan::default(),
            window: default_window,
            default_window,
            drag_origin: None,
        }
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn pan(&self) -> Pan {
        self.pan
    }

    #[must_use]
    pub fn window(&self) -> WindowLevel {
        self.window
    }

    #[must_use]
    pub fn default_window(&self) -> WindowLevel {
        self.default_window
    }

    #[must_use]
    pub fn state(&self, current_slice_index: usize) -> ViewportState {
        ViewportState {
            zoom: self.zoom,
            pan: self.pan,
            window: self.window,
            current_slice_index,
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_STEP);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_nan() {
            return;
        }
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan.x += dx;
        self.pan.y += dy;
    }

    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.drag_origin = Some((x, y));
    }

    /// Accumulate the pointer movement since the last drag position.
    /// Ignored when no drag is active.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        if let Some((last_x, last_y)) = self.drag_origin {
            self.pan_by(x - last_x, y - last_y);
            self.drag_origin = Some((x, y));
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_origin = None;
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    /// Set window/level; a non-positive width becomes 1.
    pub fn set_window(&mut self, window: WindowLevel) {
        self.window = sanitize(window);
    }

    /// Window/level drag: horizontal motion widens, vertical motion raises the center.
    pub fn adjust_window(&mut self, dx: f64, dy: f64) {
        let window = WindowLevel::new(
            self.window.center + dy * WINDOW_DRAG_SENSITIVITY,
            self.window.width + dx * WINDOW_DRAG_SENSITIVITY,
        );
        self.set_window(window);
    }

    /// Back to zoom 1, no pan, and the series' default window.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = Pan::default();
        self.window = self.default_window;
        self.drag_origin = None;
    }
}

fn sanitize(window: WindowLevel) -> WindowLevel {
    WindowLevel::new(window.center, window.effective_width())
}
