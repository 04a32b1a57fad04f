use std::io::Cursor;
use std::sync::Arc;

use thiserror::Error;

use super::header::{CANONICAL_HEADER_LEN, HeaderError, WavHeader};
use crate::audio::{InvariantError, SampleBuffer};

/// Errors raised while serializing PCM.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Buffer violates a structural invariant (for example an oversized payload).
    #[error(transparent)]
    Invariant(#[from] InvariantError),
    /// The WAV writer failed.
    #[error("Failed to write WAV: {source}")]
    Writer { source: hound::Error },
    /// The written bytes could not be read back as a WAV header.
    #[error("Encoded WAV header is invalid: {0}")]
    Header(#[from] HeaderError),
}

impl From<hound::Error> for EncodeError {
    fn from(source: hound::Error) -> Self {
        Self::Writer { source }
    }
}

/// Convert a float sample to signed 16-bit PCM.
///
/// Values are clamped to [-1, 1]; negatives scale by 32768 and non-negatives
/// by 32767 so both extremes land exactly on the i16 range. The product is
/// truncated toward zero. NaN maps to silence.
pub fn float_to_pcm16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32_768.0) as i16
    } else {
        (clamped * 32_767.0) as i16
    }
}

/// Serialized WAV bytes plus the header they carry.
#[derive(Clone, Debug, PartialEq)]
pub struct WavDocument {
    bytes: Arc<[u8]>,
    header: WavHeader,
}

impl WavDocument {
    /// Wrap existing WAV bytes, validating the header.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self, HeaderError> {
        let bytes = bytes.into();
        let header = WavHeader::parse(&bytes)?;
        Ok(Self { bytes, header })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Playback length implied by the header.
    pub fn duration_seconds(&self) -> f64 {
        if self.header.sample_rate == 0 {
            return 0.0;
        }
        self.header.frame_count() as f64 / self.header.sample_rate as f64
    }
}

/// Writes [`SampleBuffer`]s as canonical 16-bit PCM WAV.
#[derive(Clone, Copy, Debug, Default)]
pub struct PcmEncoder;

impl PcmEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode all frames of `buffer`, interleaving channels.
    pub fn encode(&self, buffer: &SampleBuffer) -> Result<WavDocument, EncodeError> {
        let channels = buffer.channel_count();
        let total_samples = buffer.frame_count() as u64 * channels as u64;
        let data_len = total_samples * 2;
        if data_len + (CANONICAL_HEADER_LEN as u64 - 8) > u32::MAX as u64 {
            return Err(InvariantError::PayloadTooLarge { bytes: data_len }.into());
        }
        let spec = hound::WavSpec {
            channels: channels as u16,
            sample_rate: buffer.sample_rate(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::with_capacity(CANONICAL_HEADER_LEN + data_len as usize));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            {
                let mut samples = writer.get_i16_writer(total_samples as u32);
                for frame in 0..buffer.frame_count() {
                    for channel in buffer.channels() {
                        samples.write_sample(float_to_pcm16(channel[frame]));
                    }
                }
                samples.flush()?;
            }
            writer.finalize()?;
        }
        let document = WavDocument::from_bytes(cursor.into_inner())?;
        tracing::debug!(
            bytes = document.len(),
            frames = buffer.frame_count(),
            channels,
            "Encoded PCM16 WAV"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_hits_both_extremes_and_truncates() {
        assert_eq!(float_to_pcm16(1.0), 32_767);
        assert_eq!(float_to_pcm16(-1.0), -32_768);
        assert_eq!(float_to_pcm16(2.5), 32_767);
        assert_eq!(float_to_pcm16(-7.0), -32_768);
        assert_eq!(float_to_pcm16(0.0), 0);
        assert_eq!(float_to_pcm16(f32::NAN), 0);
        assert_eq!(float_to_pcm16(0.5), 16_383);
        assert_eq!(float_to_pcm16(-0.5), -16_384);
        assert_eq!(float_to_pcm16(1.0 / 40_000.0), 0);
    }

    #[test]
    fn stereo_header_is_byte_exact() {
        let buffer = SampleBuffer::new(44_100, vec![vec![0.0; 100], vec![0.0; 100]]).unwrap();
        let document = PcmEncoder::new().encode(&buffer).unwrap();
        let bytes = document.bytes();
        assert_eq!(bytes.len(), 444);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 436);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes(bytes[20..22].try_into().unwrap()), 1);
        assert_eq!(u16::from_le_bytes(bytes[22..24].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 44_100);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 176_400);
        assert_eq!(u16::from_le_bytes(bytes[32..34].try_into().unwrap()), 4);
        assert_eq!(u16::from_le_bytes(bytes[34..36].try_into().unwrap()), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 400);
        assert_eq!(document.header().data_offset, 44);
    }

    #[test]
    fn frames_are_interleaved_left_then_right() {
        let buffer = SampleBuffer::new(8_000, vec![vec![1.0, 0.0], vec![-1.0, 0.5]]).unwrap();
        let document = PcmEncoder::new().encode(&buffer).unwrap();
        let data: Vec<i16> = document.bytes()[44..]
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(data, vec![32_767, -32_768, 0, 16_383]);
    }

    #[test]
    fn mono_duration_comes_from_header() {
        let buffer = SampleBuffer::new(8_000, vec![vec![0.25; 4_000]]).unwrap();
        let document = PcmEncoder::new().encode(&buffer).unwrap();
        assert_eq!(document.header().block_align, 2);
        assert_eq!(document.header().byte_rate, 16_000);
        assert!((document.duration_seconds() - 0.5).abs() < 1e-12);
    }
}
