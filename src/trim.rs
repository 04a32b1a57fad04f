//! Commits a trim selection: slice, render, encode.

mod asset;
mod render;

use std::ops::Range;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::audio::{InvariantError, SampleBuffer};
use crate::selection::TrimSelection;
use crate::wav::{EncodeError, PcmEncoder, WavDocument};

pub use asset::{AssetError, AssetId, AssetRef, AssetStore, next_trim_path};
pub use render::{LinearResampler, OfflineRender, Passthrough, RenderError, resample_linear};

/// Reasons a trim is rejected. The source buffer is never modified.
#[derive(Debug, Error)]
pub enum TrimError {
    /// Selection maps to zero frames.
    #[error("Trim selection is empty: frames {start}..{end}")]
    EmptySelection { start: usize, end: usize },
    /// Selection bounds are not finite.
    #[error("Trim selection {start}..{end} is not a valid range")]
    InvalidSelection { start: f64, end: f64 },
    #[error("Failed to slice audio: {0}")]
    Slice(#[from] InvariantError),
    #[error("Render pass failed: {0}")]
    Render(#[from] RenderError),
    #[error("Failed to encode trimmed audio: {0}")]
    Encode(#[from] EncodeError),
}

/// Result of a committed trim.
#[derive(Clone, Debug)]
pub struct TrimOutcome {
    pub document: WavDocument,
    /// Samples as encoded, after the render pass.
    pub buffer: SampleBuffer,
    pub start_frame: usize,
    pub end_frame: usize,
}

/// Map percent bounds to a frame range: `floor(percent * frames / 100)`, clamped.
pub fn selection_frame_bounds(
    selection: TrimSelection,
    frame_count: usize,
) -> Result<Range<usize>, TrimError> {
    let (start, end) = (selection.start(), selection.end());
    if !start.is_finite() || !end.is_finite() {
        return Err(TrimError::InvalidSelection { start, end });
    }
    let to_frame = |percent: f64| {
        let frame = (percent * frame_count as f64 / 100.0).floor();
        frame.clamp(0.0, frame_count as f64) as usize
    };
    let start_frame = to_frame(start);
    let end_frame = to_frame(end);
    if end_frame <= start_frame {
        return Err(TrimError::EmptySelection {
            start: start_frame,
            end: end_frame,
        });
    }
    Ok(start_frame..end_frame)
}

/// Slices a buffer to a selection, runs the render pass, and encodes PCM16 WAV.
#[derive(Clone)]
pub struct TrimApplier {
    render: Arc<dyn OfflineRender>,
    encoder: PcmEncoder,
}

impl Default for TrimApplier {
    fn default() -> Self {
        Self::new()
    }
}

impl TrimApplier {
    /// Applier that keeps the source sample rate.
    pub fn new() -> Self {
        Self::with_render(Arc::new(Passthrough))
    }

    pub fn with_render(render: Arc<dyn OfflineRender>) -> Self {
        Self {
            render,
            encoder: PcmEncoder::new(),
        }
    }

    /// Resample output to `rate` when set, otherwise keep the source rate.
    pub fn with_output_sample_rate(rate: Option<u32>) -> Self {
        match rate {
            Some(rate) => Self::with_render(Arc::new(LinearResampler::new(rate))),
            None => Self::new(),
        }
    }

    pub fn apply(
        &self,
        buffer: &SampleBuffer,
        selection: TrimSelection,
    ) -> Result<TrimOutcome, TrimError> {
        let frames = selection_frame_bounds(selection, buffer.frame_count())?;
        let sliced = buffer.slice_frames(frames.clone())?;
        let rendered = self.render.render(sliced)?;
        let document = self.encoder.encode(&rendered)?;
        info!(
            start_frame = frames.start,
            end_frame = frames.end,
            bytes = document.len(),
            "Applied trim"
        );
        Ok(TrimOutcome {
            document,
            buffer: rendered,
            start_frame: frames.start,
            end_frame: frames.end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> SampleBuffer {
        SampleBuffer::new(1_000, vec![(0..frames).map(|i| i as f32 / frames as f32).collect()])
            .unwrap()
    }

    #[test]
    fn frame_bounds_floor_each_edge() {
        let range = selection_frame_bounds(TrimSelection::new(20.0, 60.0), 441_000).unwrap();
        assert_eq!(range, 88_200..264_600);
        let range = selection_frame_bounds(TrimSelection::new(33.3, 66.7), 10).unwrap();
        assert_eq!(range, 3..6);
    }

    #[test]
    fn selection_below_one_frame_is_empty() {
        let err = selection_frame_bounds(TrimSelection::new(10.0, 11.0), 10).unwrap_err();
        assert!(matches!(err, TrimError::EmptySelection { start: 1, end: 1 }));
    }

    #[test]
    fn non_finite_selection_is_invalid() {
        let err = selection_frame_bounds(TrimSelection::new(f64::NAN, 50.0), 10).unwrap_err();
        assert!(matches!(err, TrimError::InvalidSelection { .. }));
    }

    #[test]
    fn apply_slices_without_touching_source() {
        let source = ramp(1_000);
        let outcome = TrimApplier::new()
            .apply(&source, TrimSelection::new(50.0, 100.0))
            .unwrap();
        assert_eq!(outcome.start_frame, 500);
        assert_eq!(outcome.end_frame, 1_000);
        assert_eq!(outcome.buffer.frame_count(), 500);
        assert_eq!(outcome.buffer.channel(0).unwrap()[0], 0.5);
        assert_eq!(outcome.document.header().frame_count(), 500);
        assert_eq!(source.frame_count(), 1_000);
    }

    #[test]
    fn configured_output_rate_resamples() {
        let source = ramp(1_000);
        let outcome = TrimApplier::with_output_sample_rate(Some(500))
            .apply(&source, TrimSelection::FULL)
            .unwrap();
        assert_eq!(outcome.document.header().sample_rate, 500);
        assert_eq!(outcome.buffer.frame_count(), 500);
    }
}
