use thiserror::Error;

/// Size of the canonical RIFF + fmt + data header written by the encoder.
pub const CANONICAL_HEADER_LEN: usize = 44;
/// `wFormatTag` for integer PCM.
pub const PCM_FORMAT_TAG: u16 = 1;

/// Failures while reading back a WAV header.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Missing RIFF/WAVE signature")]
    NotRiffWave,
    #[error("WAV is missing its {0} chunk")]
    MissingChunk(&'static str),
    #[error("fmt chunk is {len} bytes, expected at least 16")]
    ShortFmt { len: usize },
}

/// Fields of a PCM WAV header, as stored in the `fmt ` and `data` chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavHeader {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Byte offset of the first sample.
    pub data_offset: usize,
    /// Declared length of the data chunk in bytes.
    pub data_len: u32,
}

impl WavHeader {
    /// Walk the RIFF chunk list and collect the `fmt ` and `data` fields.
    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(HeaderError::NotRiffWave);
        }
        let mut fmt: Option<(usize, usize)> = None;
        let mut data: Option<(usize, u32)> = None;
        let mut offset = 12usize;
        while offset + 8 <= bytes.len() {
            let id = &bytes[offset..offset + 4];
            let chunk_size = read_u32(bytes, offset + 4);
            let chunk_data = offset + 8;
            if id == b"fmt " {
                fmt = Some((chunk_data, chunk_size as usize));
            } else if id == b"data" {
                data = Some((chunk_data, chunk_size));
                break;
            }
            offset = chunk_data.saturating_add(chunk_size as usize);
            if chunk_size % 2 == 1 {
                offset = offset.saturating_add(1);
            }
        }
        let (fmt_offset, fmt_len) = fmt.ok_or(HeaderError::MissingChunk("fmt"))?;
        if fmt_len < 16 || fmt_offset + 16 > bytes.len() {
            return Err(HeaderError::ShortFmt { len: fmt_len });
        }
        let (data_offset, data_len) = data.ok_or(HeaderError::MissingChunk("data"))?;
        Ok(Self {
            format_tag: read_u16(bytes, fmt_offset),
            channels: read_u16(bytes, fmt_offset + 2),
            sample_rate: read_u32(bytes, fmt_offset + 4),
            byte_rate: read_u32(bytes, fmt_offset + 8),
            block_align: read_u16(bytes, fmt_offset + 12),
            bits_per_sample: read_u16(bytes, fmt_offset + 14),
            data_offset,
            data_len,
        })
    }

    /// Number of whole frames in the data chunk.
    pub fn frame_count(&self) -> u32 {
        if self.block_align == 0 {
            return 0;
        }
        self.data_len / self.block_align as u32
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
