use std::fmt;

use super::TrackId;
use crate::waveform::format_time;

/// User-facing message raised by the session.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorNotice {
    /// The track could not be decoded; the editor keeps its previous state.
    LoadFailed { track_id: TrackId, message: String },
    /// A trim was committed and stored as a new asset.
    TrimApplied { uri: String, duration_seconds: f64 },
    /// A trim was rejected; selection and asset are unchanged.
    TrimFailed { message: String },
    /// No audio output could be opened; editing still works without playback.
    PlaybackUnavailable { message: String },
}

impl EditorNotice {
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::TrimApplied { .. })
    }
}

impl fmt::Display for EditorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadFailed { track_id, message } => {
                write!(f, "Could not load audio for {track_id}: {message}")
            }
            Self::TrimApplied {
                duration_seconds, ..
            } => write!(f, "Trim applied, new length {}", format_time(*duration_seconds)),
            Self::TrimFailed { message } => write!(f, "Trim failed: {message}"),
            Self::PlaybackUnavailable { message } => {
                write!(f, "Playback disabled: {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_read_naturally() {
        let notice = EditorNotice::TrimApplied {
            uri: "asset://x.wav".into(),
            duration_seconds: 95.4,
        };
        assert_eq!(notice.to_string(), "Trim applied, new length 1:35");
        assert!(!notice.is_error());
        let failed = EditorNotice::LoadFailed {
            track_id: TrackId::new("t1"),
            message: "Audio contains no samples".into(),
        };
        assert_eq!(
            failed.to_string(),
            "Could not load audio for t1: Audio contains no samples"
        );
        assert!(failed.is_error());
    }
}
