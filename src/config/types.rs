use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::defaults::{
    MAX_ENVELOPE_SAMPLES, MAX_OUTPUT_SAMPLE_RATE, MIN_OUTPUT_SAMPLE_RATE, clamp_min_gap,
    clamp_volume, default_envelope_samples, default_false, default_grid_size_seconds,
    default_handle_tolerance_px, default_min_gap_percent, default_true, default_volume,
    grid_size_or_default, positive_or,
};

/// Errors that may occur while loading or saving editor settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Persisted editor preferences, stored as `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    #[serde(default)]
    pub waveform: WaveformSettings,
    #[serde(default)]
    pub trim: TrimSettings,
    #[serde(default)]
    pub playback: PlaybackSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

/// Envelope resolution.
///
/// Config keys: `envelope_samples`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformSettings {
    #[serde(default = "default_envelope_samples")]
    pub envelope_samples: usize,
}

impl Default for WaveformSettings {
    fn default() -> Self {
        Self {
            envelope_samples: default_envelope_samples(),
        }
    }
}

/// Trim editing constraints.
///
/// Config keys: `min_gap_percent`, `handle_tolerance_px`, `snap_to_grid`,
/// `grid_size_seconds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimSettings {
    /// Smallest kept share of the track, in percentage points.
    #[serde(default = "default_min_gap_percent")]
    pub min_gap_percent: f64,
    /// Pointer reach for grabbing a trim handle.
    #[serde(default = "default_handle_tolerance_px")]
    pub handle_tolerance_px: f64,
    #[serde(default = "default_false")]
    pub snap_to_grid: bool,
    #[serde(default = "default_grid_size_seconds")]
    pub grid_size_seconds: f64,
}

impl Default for TrimSettings {
    fn default() -> Self {
        Self {
            min_gap_percent: default_min_gap_percent(),
            handle_tolerance_px: default_handle_tolerance_px(),
            snap_to_grid: default_false(),
            grid_size_seconds: default_grid_size_seconds(),
        }
    }
}

/// Output device preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Open an audio device at all; disable for headless use.
    #[serde(default = "default_true")]
    pub output_enabled: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            output_enabled: default_true(),
        }
    }
}

/// Trimmed asset output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Resample trimmed audio to this rate; unset keeps the source rate.
    #[serde(default)]
    pub output_sample_rate: Option<u32>,
    /// Directory trimmed assets are written to when persisted.
    #[serde(default)]
    pub asset_dir: Option<PathBuf>,
}

impl EditorSettings {
    /// Clamp out-of-range values back into their supported ranges.
    pub fn normalized(mut self) -> Self {
        self.waveform.envelope_samples = match self.waveform.envelope_samples {
            0 => default_envelope_samples(),
            count => count.min(MAX_ENVELOPE_SAMPLES),
        };
        self.trim.min_gap_percent = clamp_min_gap(self.trim.min_gap_percent);
        self.trim.handle_tolerance_px =
            positive_or(self.trim.handle_tolerance_px, default_handle_tolerance_px());
        self.trim.grid_size_seconds = grid_size_or_default(self.trim.grid_size_seconds);
        self.playback.volume = clamp_volume(self.playback.volume);
        self.export.output_sample_rate = self
            .export
            .output_sample_rate
            .map(|rate| rate.clamp(MIN_OUTPUT_SAMPLE_RATE, MAX_OUTPUT_SAMPLE_RATE));
        self
    }
}
