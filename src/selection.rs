//! Trim selection state over a track, expressed in percent of its duration.
//! Selection math stays pure here so the session and pointer code can stay small.

mod interaction;

use crate::waveform::MIN_GRID_SIZE_SECONDS;

pub use interaction::{DEFAULT_HANDLE_TOLERANCE_PX, DragState, PointerEvent, TrimInteraction};

/// Smallest allowed distance between trim start and end, in percentage points.
pub const DEFAULT_MIN_GAP_PERCENT: f64 = 1.0;
/// Upper bound for a configured minimum gap.
pub const MAX_MIN_GAP_PERCENT: f64 = 50.0;

/// Kept region of a track, `start` and `end` in percent (0-100).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrimSelection {
    start: f64,
    end: f64,
}

impl Default for TrimSelection {
    fn default() -> Self {
        Self::FULL
    }
}

impl TrimSelection {
    /// The whole track.
    pub const FULL: Self = Self {
        start: 0.0,
        end: 100.0,
    };

    /// Raw bounds; [`TrimSelectionModel`] is what keeps them ordered and gapped.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Kept share of the track in percentage points.
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    /// Percent lies strictly between the bounds.
    pub fn contains(&self, percent: f64) -> bool {
        percent > self.start && percent < self.end
    }
}

/// Optional grid that edits snap to, in seconds of track time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapGrid {
    pub enabled: bool,
    pub grid_size_seconds: f64,
}

impl Default for SnapGrid {
    fn default() -> Self {
        Self {
            enabled: false,
            grid_size_seconds: 1.0,
        }
    }
}

/// Duration summary shown next to the trim controls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrimStats {
    pub original_seconds: f64,
    pub trimmed_seconds: f64,
    pub kept_percent: f64,
}

/// Trim bounds plus the constraints every edit is clamped against.
///
/// Every operation keeps `0 <= start`, `start + min_gap <= end` and
/// `end <= 100`. Edits never fail; out-of-range and non-finite input is
/// clamped or ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct TrimSelectionModel {
    selection: TrimSelection,
    min_gap: f64,
    snap: SnapGrid,
    duration_seconds: f64,
}

impl Default for TrimSelectionModel {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_GAP_PERCENT)
    }
}

impl TrimSelectionModel {
    pub fn new(min_gap: f64) -> Self {
        Self {
            selection: TrimSelection::FULL,
            min_gap: clamp_min_gap(min_gap),
            snap: SnapGrid::default(),
            duration_seconds: 0.0,
        }
    }

    pub fn selection(&self) -> TrimSelection {
        self.selection
    }

    pub fn start(&self) -> f64 {
        self.selection.start
    }

    pub fn end(&self) -> f64 {
        self.selection.end
    }

    pub fn min_gap(&self) -> f64 {
        self.min_gap
    }

    pub fn snap_grid(&self) -> SnapGrid {
        self.snap
    }

    pub fn total_duration(&self) -> f64 {
        self.duration_seconds
    }

    /// Back to the whole track.
    pub fn reset(&mut self) {
        self.selection = TrimSelection::FULL;
    }

    /// Duration used for snapping and the seconds helpers. Invalid values become 0.
    pub fn set_total_duration(&mut self, seconds: f64) {
        self.duration_seconds = if seconds.is_finite() && seconds > 0.0 {
            seconds
        } else {
            0.0
        };
    }

    pub fn set_snap_grid(&mut self, snap: SnapGrid) {
        self.snap = snap;
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.snap.enabled = enabled;
    }

    /// Grid spacing in seconds; values below [`MIN_GRID_SIZE_SECONDS`] are ignored.
    pub fn set_grid_size(&mut self, seconds: f64) {
        if usable_grid_size(seconds) {
            self.snap.grid_size_seconds = seconds;
        }
    }

    /// Change the minimum gap, widening the selection if it no longer fits.
    pub fn set_min_gap(&mut self, min_gap: f64) {
        if !min_gap.is_finite() {
            return;
        }
        self.min_gap = clamp_min_gap(min_gap);
        if self.selection.width() < self.min_gap {
            let end = (self.selection.start + self.min_gap).min(100.0);
            self.selection = TrimSelection::new(end - self.min_gap, end);
        }
    }

    /// Move the start bound, clamped to `[0, end - min_gap]` and snapped when enabled.
    pub fn set_start(&mut self, percent: f64) {
        if !percent.is_finite() {
            return;
        }
        let upper = (self.selection.end - self.min_gap).max(0.0);
        let mut start = self.snap(percent.clamp(0.0, upper));
        if start > upper {
            start = self.snap_down(upper);
        }
        self.selection.start = start.clamp(0.0, upper);
    }

    /// Move the end bound, clamped to `[start + min_gap, 100]` and snapped when enabled.
    pub fn set_end(&mut self, percent: f64) {
        if !percent.is_finite() {
            return;
        }
        let lower = (self.selection.start + self.min_gap).min(100.0);
        let mut end = self.snap(percent.clamp(lower, 100.0));
        if end < lower {
            end = self.snap_up(lower);
        }
        self.selection.end = end.clamp(lower, 100.0);
    }

    /// Shift both bounds by `delta` percent, keeping the width.
    ///
    /// The region stops at either edge of the track. With snapping on, the
    /// start bound lands on the grid and the end follows it.
    pub fn drag_region(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        let width = self.selection.width();
        let start = self
            .snap(self.selection.start + delta)
            .clamp(0.0, 100.0 - width);
        let end = (start + width).min(100.0);
        self.selection = TrimSelection::new(end - width, end);
    }

    pub fn start_seconds(&self) -> f64 {
        self.selection.start / 100.0 * self.duration_seconds
    }

    pub fn end_seconds(&self) -> f64 {
        self.selection.end / 100.0 * self.duration_seconds
    }

    /// Numeric entry of the start bound in seconds; ignored without a duration.
    pub fn set_start_seconds(&mut self, seconds: f64) {
        if self.duration_seconds > 0.0 {
            self.set_start(seconds / self.duration_seconds * 100.0);
        }
    }

    /// Numeric entry of the end bound in seconds; ignored without a duration.
    pub fn set_end_seconds(&mut self, seconds: f64) {
        if self.duration_seconds > 0.0 {
            self.set_end(seconds / self.duration_seconds * 100.0);
        }
    }

    /// Length of the kept region in seconds.
    pub fn trimmed_duration_seconds(&self) -> f64 {
        self.end_seconds() - self.start_seconds()
    }

    pub fn kept_percent(&self) -> f64 {
        self.selection.width()
    }

    pub fn stats(&self) -> TrimStats {
        TrimStats {
            original_seconds: self.duration_seconds,
            trimmed_seconds: self.trimmed_duration_seconds(),
            kept_percent: self.kept_percent(),
        }
    }

    /// Edits currently land on grid points.
    pub fn snap_active(&self) -> bool {
        self.snap_step_percent().is_some()
    }

    fn snap_step_percent(&self) -> Option<f64> {
        let grid = self.snap.grid_size_seconds;
        if !self.snap.enabled || self.duration_seconds <= 0.0 || !usable_grid_size(grid) {
            return None;
        }
        Some(grid / self.duration_seconds * 100.0)
    }

    fn snap(&self, percent: f64) -> f64 {
        self.snap_with(percent, f64::round)
    }

    fn snap_down(&self, percent: f64) -> f64 {
        self.snap_with(percent, f64::floor)
    }

    fn snap_up(&self, percent: f64) -> f64 {
        self.snap_with(percent, f64::ceil)
    }

    fn snap_with(&self, percent: f64, rounding: fn(f64) -> f64) -> f64 {
        match self.snap_step_percent() {
            Some(step) => rounding(percent / step) * step,
            None => percent,
        }
    }
}

fn usable_grid_size(seconds: f64) -> bool {
    seconds.is_finite() && seconds >= MIN_GRID_SIZE_SECONDS
}

fn clamp_min_gap(min_gap: f64) -> f64 {
    if min_gap.is_finite() && min_gap > 0.0 {
        min_gap.min(MAX_MIN_GAP_PERCENT)
    } else {
        DEFAULT_MIN_GAP_PERCENT
    }
}
