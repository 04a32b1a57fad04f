//! Audio trimming core: decode a track, reduce it to a waveform envelope,
//! select a region with pointer drags, and commit the region as 16-bit WAV.
/// Application directory helpers.
pub mod app_dirs;
/// Decoding, sample buffers, and playback.
pub mod audio;
/// Persisted editor settings.
pub mod config;
/// Editor session tying decode, selection, playback, and trims together.
pub mod editor;
/// Tracing setup.
pub mod logging;
/// Trim selection math and pointer handling.
pub mod selection;
/// Trim application and produced assets.
pub mod trim;
/// PCM16 WAV encoding.
pub mod wav;
/// Waveform envelopes and render geometry.
pub mod waveform;

pub use editor::{EditorError, EditorEvent, EditorNotice, EditorSession, TrackId};
