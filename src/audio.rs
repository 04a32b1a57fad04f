//! Decoding, sample storage, and playback.

mod buffer;
mod decode;
mod output;
pub(crate) mod playback;

pub use buffer::{InvariantError, MAX_CHANNELS, SampleBuffer};
pub use decode::{DecodeError, SampleDecoder};
pub use output::{ResourceError, RodioOutput};
pub use playback::{
    DEFAULT_VOLUME, PlaybackBackend, PlaybackController, PlaybackError, PlaybackStatus,
};
