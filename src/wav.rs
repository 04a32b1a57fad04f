//! 16-bit PCM WAV serialization and header inspection.

mod encode;
mod header;

pub use encode::{EncodeError, PcmEncoder, WavDocument, float_to_pcm16};
pub use header::{CANONICAL_HEADER_LEN, HeaderError, PCM_FORMAT_TAG, WavHeader};
