use crate::audio::DEFAULT_VOLUME;
use crate::selection::{DEFAULT_HANDLE_TOLERANCE_PX, DEFAULT_MIN_GAP_PERCENT, MAX_MIN_GAP_PERCENT};
use crate::waveform::{DEFAULT_ENVELOPE_SAMPLES, MIN_GRID_SIZE_SECONDS};

pub(super) const MAX_ENVELOPE_SAMPLES: usize = 20_000;
pub(super) const MIN_OUTPUT_SAMPLE_RATE: u32 = 8_000;
pub(super) const MAX_OUTPUT_SAMPLE_RATE: u32 = 192_000;

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_false() -> bool {
    false
}

pub(super) fn default_envelope_samples() -> usize {
    DEFAULT_ENVELOPE_SAMPLES
}

pub(super) fn default_min_gap_percent() -> f64 {
    DEFAULT_MIN_GAP_PERCENT
}

pub(super) fn default_handle_tolerance_px() -> f64 {
    DEFAULT_HANDLE_TOLERANCE_PX
}

pub(super) fn default_grid_size_seconds() -> f64 {
    1.0
}

pub(super) fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

pub(super) fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        default_volume()
    }
}

pub(super) fn clamp_min_gap(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value.min(MAX_MIN_GAP_PERCENT)
    } else {
        default_min_gap_percent()
    }
}

pub(super) fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

/// Grid spacing if it is at least [`MIN_GRID_SIZE_SECONDS`], otherwise the default.
pub(super) fn grid_size_or_default(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds >= MIN_GRID_SIZE_SECONDS {
        seconds
    } else {
        default_grid_size_seconds()
    }
}
