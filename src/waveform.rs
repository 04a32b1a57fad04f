//! Waveform envelope reduction and the render boundary consumed by drawing code.

mod grid;
mod reduce;
mod view;

pub use grid::{GRID_SIZE_PRESETS, GridTick, MIN_GRID_SIZE_SECONDS, format_time, grid_ticks};
pub use reduce::{DEFAULT_ENVELOPE_SAMPLES, WaveformEnvelope, WaveformReducer, reduce};
pub use view::{
    EnvelopeBar, MAX_ZOOM, MIN_ZOOM, RenderFrame, SurfaceGeometry, WaveformRenderer,
    WaveformViewport, ZOOM_STEP,
};
