use thiserror::Error;

use crate::audio::{InvariantError, SampleBuffer};

/// Failure inside an offline render pass.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render produced an invalid buffer: {0}")]
    Invariant(#[from] InvariantError),
    #[error("Cannot resample to {rate} Hz")]
    InvalidRate { rate: u32 },
}

/// Processing applied to the trimmed buffer before it is encoded.
pub trait OfflineRender: Send + Sync {
    fn render(&self, buffer: SampleBuffer) -> Result<SampleBuffer, RenderError>;
}

/// Leaves samples untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl OfflineRender for Passthrough {
    fn render(&self, buffer: SampleBuffer) -> Result<SampleBuffer, RenderError> {
        Ok(buffer)
    }
}

/// Converts to a fixed output rate by linear interpolation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinearResampler {
    target_rate: u32,
}

impl LinearResampler {
    pub fn new(target_rate: u32) -> Self {
        Self { target_rate }
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }
}

impl OfflineRender for LinearResampler {
    fn render(&self, buffer: SampleBuffer) -> Result<SampleBuffer, RenderError> {
        if self.target_rate == 0 {
            return Err(RenderError::InvalidRate { rate: 0 });
        }
        if buffer.sample_rate() == self.target_rate {
            return Ok(buffer);
        }
        let channels = buffer
            .channels()
            .map(|channel| resample_linear(channel, buffer.sample_rate(), self.target_rate))
            .collect();
        Ok(SampleBuffer::new(self.target_rate, channels)?)
    }
}

/// Linear-interpolated rate conversion of one channel.
pub fn resample_linear(samples: &[f32], in_rate: u32, out_rate: u32) -> Vec<f32> {
    if in_rate == out_rate || in_rate == 0 || out_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = out_rate as f64 / in_rate as f64;
    let out_len = (samples.len() as u64 * out_rate as u64).div_ceil(in_rate as u64) as usize;
    let last = samples.len() - 1;
    (0..out_len)
        .map(|index| {
            let position = index as f64 / ratio;
            let i0 = (position.floor() as usize).min(last);
            let i1 = (i0 + 1).min(last);
            let t = (position - i0 as f64).clamp(0.0, 1.0) as f32;
            samples[i0] * (1.0 - t) + samples[i1] * t
        })
        .collect()
}
