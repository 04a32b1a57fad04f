use std::ops::Range;
use std::sync::Arc;

use thiserror::Error;

/// Highest channel count the editor accepts (mono or stereo).
pub const MAX_CHANNELS: usize = 2;

/// Structural violations rejected by [`SampleBuffer`] constructors and the encoder.
///
/// These indicate a caller defect rather than bad user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantError {
    /// A buffer needs at least one channel.
    #[error("Sample buffer has no channels")]
    NoChannels,
    /// Only mono and stereo buffers are supported.
    #[error("Sample buffer has {count} channels; only mono and stereo are supported")]
    TooManyChannels { count: usize },
    /// Sample rate must be positive.
    #[error("Sample rate must be greater than zero")]
    ZeroSampleRate,
    /// Every channel must hold the same number of frames.
    #[error("Channel {channel} holds {actual} samples, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },
    /// Interleaved input length is not a multiple of the channel count.
    #[error("Interleaved input of {len} samples does not divide into {channels} channels")]
    RaggedInterleaved { len: usize, channels: usize },
    /// A frame range reached past the end of the buffer.
    #[error("Frame range {start}..{end} exceeds buffer length {frames}")]
    FrameRangeOutOfBounds {
        start: usize,
        end: usize,
        frames: usize,
    },
    /// The PCM payload does not fit the 32-bit RIFF size fields.
    #[error("PCM payload of {bytes} bytes exceeds the WAV size limit")]
    PayloadTooLarge { bytes: u64 },
}

/// Immutable multi-channel f32 audio.
///
/// Channel storage is reference counted, so clones and handoffs between the
/// worker and the session do not copy sample data.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Arc<[f32]>>,
    sample_rate: u32,
    frame_count: usize,
}

impl SampleBuffer {
    /// Build a buffer from planar channel data.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, InvariantError> {
        if channels.is_empty() {
            return Err(InvariantError::NoChannels);
        }
        if channels.len() > MAX_CHANNELS {
            return Err(InvariantError::TooManyChannels {
                count: channels.len(),
            });
        }
        if sample_rate == 0 {
            return Err(InvariantError::ZeroSampleRate);
        }
        let expected = channels[0].len();
        if let Some((channel, actual)) = channels
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != expected)
        {
            return Err(InvariantError::ChannelLengthMismatch {
                channel,
                expected,
                actual,
            });
        }
        Ok(Self {
            channels: channels.into_iter().map(Arc::from).collect(),
            sample_rate,
            frame_count: expected,
        })
    }

    /// Build a buffer from frame-interleaved samples.
    pub fn from_interleaved(
        sample_rate: u32,
        channel_count: usize,
        interleaved: &[f32],
    ) -> Result<Self, InvariantError> {
        if channel_count == 0 {
            return Err(InvariantError::NoChannels);
        }
        if interleaved.len() % channel_count != 0 {
            return Err(InvariantError::RaggedInterleaved {
                len: interleaved.len(),
                channels: channel_count,
            });
        }
        let frames = interleaved.len() / channel_count;
        let mut planar = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (channel, sample) in planar.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        Self::new(sample_rate, planar)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Duration in seconds, `frame_count / sample_rate`.
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count as f64 / self.sample_rate as f64
    }

    /// Samples for one channel, if it exists.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|samples| &samples[..])
    }

    /// Iterate over all channels in order.
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(|samples| &samples[..])
    }

    /// Copy a frame range into a new buffer with the same rate and layout.
    pub fn slice_frames(&self, range: Range<usize>) -> Result<Self, InvariantError> {
        if range.start > range.end || range.end > self.frame_count {
            return Err(InvariantError::FrameRangeOutOfBounds {
                start: range.start,
                end: range.end,
                frames: self.frame_count,
            });
        }
        let channels = self
            .channels
            .iter()
            .map(|samples| samples[range.clone()].to_vec())
            .collect();
        Self::new(self.sample_rate, channels)
    }

    /// Frame-interleaved copy of the samples.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frame_count * self.channels.len());
        for frame in 0..self.frame_count {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }
}
