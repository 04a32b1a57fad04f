use crate::audio::SampleBuffer;

/// Envelope resolution used by the editor surface.
pub const DEFAULT_ENVELOPE_SAMPLES: usize = 2_000;

/// Fixed-length amplitude envelope normalized to a peak of 1.0.
///
/// Silence yields all zeros rather than a divide-by-zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaveformEnvelope {
    values: Vec<f32>,
}

impl WaveformEnvelope {
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest value, 0.0 for silent or empty envelopes.
    pub fn peak(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// Values covering `[start_percent, end_percent]` of the envelope.
    ///
    /// The slice keeps the full-track normalization; reducing the trimmed
    /// audio again will generally produce different values.
    pub fn window(&self, start_percent: f64, end_percent: f64) -> &[f32] {
        let len = self.values.len();
        let to_index = |percent: f64| {
            ((percent.clamp(0.0, 100.0) / 100.0) * len as f64).floor() as usize
        };
        let start = to_index(start_percent).min(len);
        let end = to_index(end_percent).clamp(start, len);
        &self.values[start..end]
    }
}

impl From<Vec<f32>> for WaveformEnvelope {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// Reduces decoded channels to a [`WaveformEnvelope`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveformReducer {
    sample_count: usize,
}

impl Default for WaveformReducer {
    fn default() -> Self {
        Self::new(DEFAULT_ENVELOPE_SAMPLES)
    }
}

impl WaveformReducer {
    pub fn new(sample_count: usize) -> Self {
        Self { sample_count }
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Envelope of the first channel of `buffer`.
    pub fn reduce_buffer(&self, buffer: &SampleBuffer) -> WaveformEnvelope {
        reduce(buffer.channel(0).unwrap_or(&[]), self.sample_count)
    }
}

/// Reduce `channel` to `sample_count` mean-absolute blocks scaled to a peak of 1.0.
///
/// Blocks are `len / sample_count` samples wide and any trailing remainder is
/// dropped. When the channel is shorter than `sample_count`, each slot holds
/// the nearest source sample instead so short clips still draw their shape.
pub fn reduce(channel: &[f32], sample_count: usize) -> WaveformEnvelope {
    if sample_count == 0 {
        return WaveformEnvelope::default();
    }
    if channel.is_empty() {
        return WaveformEnvelope::from(vec![0.0; sample_count]);
    }
    let block_size = channel.len() / sample_count;
    let mut values: Vec<f32> = if block_size == 0 {
        (0..sample_count)
            .map(|slot| magnitude(channel[slot * channel.len() / sample_count]))
            .collect()
    } else {
        channel
            .chunks_exact(block_size)
            .take(sample_count)
            .map(|block| {
                let sum: f64 = block.iter().map(|&sample| magnitude(sample) as f64).sum();
                (sum / block_size as f64) as f32
            })
            .collect()
    };
    let peak = values.iter().copied().fold(0.0, f32::max);
    if peak > 0.0 {
        let scale = 1.0 / peak;
        for value in &mut values {
            *value *= scale;
        }
    } else {
        values.iter_mut().for_each(|value| *value = 0.0);
    }
    WaveformEnvelope::from(values)
}

fn magnitude(sample: f32) -> f32 {
    if sample.is_finite() { sample.abs() } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_has_requested_length_and_unit_peak() {
        let channel: Vec<f32> = (0..44_100).map(|i| ((i as f32) * 0.01).sin() * 0.3).collect();
        let envelope = reduce(&channel, DEFAULT_ENVELOPE_SAMPLES);
        assert_eq!(envelope.len(), DEFAULT_ENVELOPE_SAMPLES);
        assert!((envelope.peak() - 1.0).abs() < 1e-6);
        assert!(envelope.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn silence_yields_zeros() {
        let envelope = reduce(&vec![0.0; 10_000], 2_000);
        assert_eq!(envelope.len(), 2_000);
        assert!(envelope.values().iter().all(|v| *v == 0.0));
        let empty = reduce(&[], 16);
        assert_eq!(empty.values(), &[0.0; 16]);
    }

    #[test]
    fn blocks_average_absolute_values_and_drop_remainder() {
        let channel = [0.5, -0.5, 0.25, -0.25, 1.0];
        let envelope = reduce(&channel, 2);
        assert_eq!(envelope.values(), &[1.0, 0.5]);
    }

    #[test]
    fn short_input_holds_nearest_sample() {
        let envelope = reduce(&[0.2, -0.4], 4);
        let expected = [0.5, 0.5, 1.0, 1.0];
        assert_eq!(envelope.len(), expected.len());
        for (actual, expected) in envelope.values().iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn non_finite_samples_count_as_silence() {
        let envelope = reduce(&[f32::NAN, 0.5, f32::INFINITY, 0.25], 4);
        assert_eq!(envelope.values(), &[0.0, 1.0, 0.0, 0.5]);
    }

    #[test]
    fn zero_count_is_empty() {
        assert!(reduce(&[0.1, 0.2], 0).is_empty());
    }

    #[test]
    fn window_keeps_full_track_normalization() {
        let channel: Vec<f32> = (0..100).map(|i| if i < 50 { 0.1 } else { 1.0 }).collect();
        let envelope = reduce(&channel, 100);
        let first_half = envelope.window(0.0, 50.0);
        assert_eq!(first_half.len(), 50);
        assert!((first_half[0] - 0.1).abs() < 1e-6);
        let renormalized = reduce(&channel[..50], 50);
        assert!((renormalized.peak() - 1.0).abs() < 1e-6);
        assert_ne!(first_half, renormalized.values());
    }

    #[test]
    fn reducer_uses_first_channel() {
        let buffer =
            SampleBuffer::new(8, vec![vec![0.0, 0.0, 1.0, 1.0], vec![1.0, 1.0, 0.0, 0.0]]).unwrap();
        let envelope = WaveformReducer::new(2).reduce_buffer(&buffer);
        assert_eq!(envelope.values(), &[0.0, 1.0]);
    }
}
