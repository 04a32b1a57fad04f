//! Container/codec decoding into [`SampleBuffer`].
//!
//! Wraps symphonia's probe and codec registry. Each call owns a short-lived
//! [`DecodeContext`] that is dropped on every exit path, so no decoder state
//! outlives the job that created it.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer as PacketBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::buffer::{InvariantError, MAX_CHANNELS, SampleBuffer};

/// Frames a stream may fall short of its declared length before it counts as truncated.
const TRUNCATION_SLACK_FRAMES: u64 = 4_096;

/// Errors raised while turning encoded bytes into samples.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Container could not be recognised.
    #[error("Unsupported or unrecognised audio format: {source}")]
    Unsupported { source: SymphoniaError },
    /// Container holds no decodable audio track.
    #[error("No decodable audio track found")]
    NoTrack,
    /// Codec for the selected track is unavailable.
    #[error("Unsupported codec: {source}")]
    Codec { source: SymphoniaError },
    /// Track does not declare a sample rate.
    #[error("Audio track is missing a sample rate")]
    MissingSampleRate,
    /// Track has more channels than the editor handles.
    #[error("Audio has {count} channels; only mono and stereo are supported")]
    TooManyChannels { count: usize },
    /// Decoding produced no frames.
    #[error("Audio contains no samples")]
    Empty,
    /// Stream ended well before its declared length.
    #[error("Audio stream is truncated: decoded {decoded} of {expected} frames")]
    Truncated { decoded: u64, expected: u64 },
    /// Channel layout or rate changed between packets.
    #[error("Audio stream changed format mid-stream")]
    FormatChanged,
    /// Unrecoverable error while reading packets.
    #[error("Audio stream error: {source}")]
    Stream { source: SymphoniaError },
    /// Failed to read a file from disk.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Decoded samples could not form a valid buffer.
    #[error(transparent)]
    Invariant(#[from] InvariantError),
}

/// Decodes compressed or PCM audio bytes into planar f32 samples.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleDecoder;

impl SampleDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a complete file held in memory.
    ///
    /// `hint` is an optional file extension (`"mp3"`, `"wav"`, ...) used to
    /// speed up probing; the container is still sniffed from its bytes.
    pub fn decode(&self, bytes: &[u8], hint: Option<&str>) -> Result<SampleBuffer, DecodeError> {
        let mut context = DecodeContext::open(bytes.to_vec(), hint)?;
        let decoded = context.decode_all()?;
        let frames = decoded.channels.first().map(Vec::len).unwrap_or(0) as u64;
        if frames == 0 {
            return Err(DecodeError::Empty);
        }
        if let Some(expected) = context.declared_frames {
            let shortfall = expected.saturating_sub(frames);
            if shortfall > (expected / 100).max(TRUNCATION_SLACK_FRAMES) {
                return Err(DecodeError::Truncated {
                    decoded: frames,
                    expected,
                });
            }
        }
        debug!(
            frames,
            channels = decoded.channels.len(),
            sample_rate = decoded.sample_rate,
            "Decoded audio"
        );
        Ok(SampleBuffer::new(decoded.sample_rate, decoded.channels)?)
    }

    /// Read and decode a file, using its extension as the probe hint.
    pub fn decode_file(&self, path: &Path) -> Result<SampleBuffer, DecodeError> {
        let bytes = std::fs::read(path).map_err(|source| DecodeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let hint = path.extension().and_then(|ext| ext.to_str());
        self.decode(&bytes, hint)
    }
}

struct DecodedChannels {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

/// Format reader and codec for one decode call.
struct DecodeContext {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: Option<u32>,
    declared_frames: Option<u64>,
}

impl DecodeContext {
    fn open(bytes: Vec<u8>, extension: Option<&str>) -> Result<Self, DecodeError> {
        let mut hint = Hint::new();
        if let Some(extension) = extension {
            hint.with_extension(extension);
        }
        let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|source| DecodeError::Unsupported { source })?;
        let reader = probed.format;
        let track = reader
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoTrack)?;
        if let Some(count) = track.codec_params.channels.map(|channels| channels.count()) {
            if count > MAX_CHANNELS {
                return Err(DecodeError::TooManyChannels { count });
            }
        }
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|source| DecodeError::Codec { source })?;
        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate;
        let declared_frames = track.codec_params.n_frames;
        trace!(track_id, ?declared_frames, "Opened decode context");
        Ok(Self {
            reader,
            decoder,
            track_id,
            sample_rate,
            declared_frames,
        })
    }

    fn decode_all(&mut self) -> Result<DecodedChannels, DecodeError> {
        let mut channels: Vec<Vec<f32>> = Vec::new();
        let mut sample_rate = self.sample_rate;
        let mut scratch: Option<PacketBuffer<f32>> = None;
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(_)) => break,
                Err(SymphoniaError::ResetRequired) => return Err(DecodeError::FormatChanged),
                Err(source) => return Err(DecodeError::Stream { source }),
            };
            if packet.track_id() != self.track_id {
                continue;
            }
            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(message)) => {
                    warn!("Skipping undecodable packet: {message}");
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(source) => return Err(DecodeError::Stream { source }),
            };
            let spec = *decoded.spec();
            let count = spec.channels.count();
            if count > MAX_CHANNELS {
                return Err(DecodeError::TooManyChannels { count });
            }
            if channels.is_empty() {
                channels = vec![Vec::new(); count];
            } else if channels.len() != count {
                return Err(DecodeError::FormatChanged);
            }
            match sample_rate {
                None => sample_rate = Some(spec.rate),
                Some(rate) if rate != spec.rate => return Err(DecodeError::FormatChanged),
                Some(_) => {}
            }
            let frames = decoded.frames();
            if frames == 0 {
                continue;
            }
            let needs_alloc = scratch
                .as_ref()
                .map(|buffer| buffer.capacity() < decoded.capacity() * count)
                .unwrap_or(true);
            if needs_alloc {
                scratch = Some(PacketBuffer::new(decoded.capacity() as u64, spec));
            }
            let Some(buffer) = scratch.as_mut() else {
                continue;
            };
            buffer.copy_planar_ref(decoded);
            for (channel, planar) in channels.iter_mut().zip(buffer.samples().chunks(frames)) {
                channel.extend(planar.iter().map(|&sample| finite_or_silent(sample)));
            }
        }
        let sample_rate = match sample_rate {
            Some(0) | None => return Err(DecodeError::MissingSampleRate),
            Some(rate) => rate,
        };
        if channels.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(DecodedChannels {
            channels,
            sample_rate,
        })
    }
}

impl Drop for DecodeContext {
    fn drop(&mut self) {
        trace!(track_id = self.track_id, "Released decode context");
    }
}

fn finite_or_silent(sample: f32) -> f32 {
    if sample.is_finite() { sample } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::SampleFormat;

    fn wav_bytes(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("create wav writer");
            for &sample in samples {
                writer.write_sample(sample).expect("write sample");
            }
            writer.finalize().expect("finalize wav");
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_stereo_pcm_into_planar_channels() {
        let samples: Vec<i16> = (0..200)
            .flat_map(|i| [i as i16 * 10, -(i as i16) * 10])
            .collect();
        let bytes = wav_bytes(2, 22_050, &samples);
        let buffer = SampleDecoder::new().decode(&bytes, Some("wav")).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.sample_rate(), 22_050);
        assert_eq!(buffer.frame_count(), 200);
        let left = buffer.channel(0).unwrap();
        let right = buffer.channel(1).unwrap();
        assert!((left[10] - 100.0 / 32_768.0).abs() < 1e-6);
        assert!((right[10] + 100.0 / 32_768.0).abs() < 1e-6);
    }

    #[test]
    fn garbage_bytes_are_unsupported() {
        let err = SampleDecoder::new()
            .decode(&[0, 1, 2, 3, 4, 5, 6, 7], None)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported { .. }));
    }

    #[test]
    fn header_only_wav_is_empty() {
        let bytes = wav_bytes(1, 44_100, &[]);
        let err = SampleDecoder::new().decode(&bytes, Some("wav")).unwrap_err();
        assert!(matches!(err, DecodeError::Empty));
    }

    #[test]
    fn surround_audio_is_rejected() {
        let bytes = wav_bytes(3, 8_000, &[0; 30]);
        let err = SampleDecoder::new().decode(&bytes, None).unwrap_err();
        assert!(matches!(err, DecodeError::TooManyChannels { count: 3 }));
    }

    #[test]
    fn cut_off_stream_reports_truncation() {
        let bytes = wav_bytes(1, 8_000, &vec![1_000; 20_000]);
        let cut = &bytes[..bytes.len() / 2];
        let err = SampleDecoder::new().decode(cut, Some("wav")).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { expected: 20_000, .. }));
    }

    #[test]
    fn decode_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = SampleDecoder::new()
            .decode_file(&dir.path().join("missing.mp3"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Read { .. }));
    }
}
