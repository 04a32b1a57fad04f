use std::sync::Arc;

use super::reduce::WaveformEnvelope;

/// Zoom bounds for the waveform surface.
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 10.0;
/// Zoom changes snap to this step.
pub const ZOOM_STEP: f64 = 0.5;

/// Horizontal zoom and scroll applied to the waveform surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveformViewport {
    zoom: f64,
    scroll_offset_px: f64,
}

impl Default for WaveformViewport {
    fn default() -> Self {
        Self {
            zoom: MIN_ZOOM,
            scroll_offset_px: 0.0,
        }
    }
}

impl WaveformViewport {
    pub fn new(zoom: f64, scroll_offset_px: f64) -> Self {
        Self::default()
            .with_zoom(zoom)
            .with_scroll(scroll_offset_px)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn scroll_offset_px(&self) -> f64 {
        self.scroll_offset_px
    }

    /// Zoom clamped to 1-10 and rounded to half steps. Non-finite values are ignored.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        if zoom.is_finite() {
            self.zoom = ((zoom / ZOOM_STEP).round() * ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM);
        }
        self
    }

    /// Scroll offset in pixels, never negative.
    pub fn with_scroll(mut self, scroll_offset_px: f64) -> Self {
        if scroll_offset_px.is_finite() {
            self.scroll_offset_px = scroll_offset_px.max(0.0);
        }
        self
    }
}

/// Visible surface size plus the viewport applied to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceGeometry {
    pub width_px: f64,
    pub viewport: WaveformViewport,
}

impl SurfaceGeometry {
    /// Scroll is limited to the overflow created by zooming.
    pub fn new(width_px: f64, viewport: WaveformViewport) -> Self {
        let mut geometry = Self { width_px, viewport };
        let max_scroll = geometry.max_scroll_px();
        if geometry.viewport.scroll_offset_px > max_scroll {
            geometry.viewport.scroll_offset_px = max_scroll;
        }
        geometry
    }

    /// Width and zoom are both usable for mapping positions.
    pub fn is_usable(&self) -> bool {
        self.width_px.is_finite() && self.width_px > 0.0
    }

    /// Width of the full track once zoom is applied.
    pub fn content_width_px(&self) -> f64 {
        self.width_px * self.viewport.zoom
    }

    pub fn max_scroll_px(&self) -> f64 {
        if !self.is_usable() {
            return 0.0;
        }
        self.content_width_px() - self.width_px
    }

    /// Track percentage under surface position `x_px`, clamped to [0, 100].
    pub fn percent_at(&self, x_px: f64) -> Option<f64> {
        if !self.is_usable() || !x_px.is_finite() {
            return None;
        }
        let percent = (x_px + self.viewport.scroll_offset_px) * 100.0 / self.content_width_px();
        Some(percent.clamp(0.0, 100.0))
    }

    /// Surface position of track percentage `percent`.
    pub fn x_at(&self, percent: f64) -> f64 {
        percent * self.content_width_px() / 100.0 - self.viewport.scroll_offset_px
    }
}

/// Read-only snapshot handed to a [`WaveformRenderer`].
#[derive(Clone, Debug, PartialEq)]
pub struct RenderFrame {
    pub envelope: Arc<WaveformEnvelope>,
    pub trim_start: f64,
    pub trim_end: f64,
    pub playhead_percent: f64,
    pub duration_seconds: f64,
    pub grid_interval_seconds: f64,
    pub snap_to_grid: bool,
}

/// One envelope bar positioned on the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeBar {
    pub x_px: f64,
    pub width_px: f64,
    pub value: f32,
    /// Bar lies inside the kept region.
    pub selected: bool,
}

impl RenderFrame {
    /// Bars that intersect the visible surface.
    pub fn visible_bars(&self, geometry: &SurfaceGeometry) -> Vec<EnvelopeBar> {
        let count = self.envelope.len();
        if count == 0 || !geometry.is_usable() {
            return Vec::new();
        }
        let width_px = geometry.content_width_px() / count as f64;
        self.envelope
            .values()
            .iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let percent = index as f64 / count as f64 * 100.0;
                let x_px = geometry.x_at(percent);
                if x_px < -width_px || x_px > geometry.width_px {
                    return None;
                }
                Some(EnvelopeBar {
                    x_px,
                    width_px,
                    value,
                    selected: percent >= self.trim_start && percent <= self.trim_end,
                })
            })
            .collect()
    }
}

/// Drawing surface fed by the editor session.
pub trait WaveformRenderer {
    fn render(&mut self, frame: &RenderFrame);
}
