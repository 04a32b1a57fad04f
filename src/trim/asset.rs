use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::wav::WavDocument;

const MAX_NAME_INDEX: u32 = 999;

/// Errors raised while storing or exporting trimmed assets.
#[derive(Debug, Error)]
pub enum AssetError {
    /// No asset with this id has been registered.
    #[error("Unknown asset {0}")]
    Unknown(AssetId),
    /// Every `_trimNNN` name in the directory is taken.
    #[error("No free file name for {stem} in {dir}")]
    NoFreeName { dir: PathBuf, stem: String },
    /// Failed to write the asset file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Stable identifier for a registered asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssetId(Uuid);

impl AssetId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to an encoded WAV produced by a trim.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetRef {
    pub id: AssetId,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub byte_len: usize,
}

impl AssetRef {
    /// Reference string handed to the track record.
    pub fn uri(&self) -> String {
        format!("asset://{}.wav", self.id)
    }
}

/// In-memory registry of encoded assets.
#[derive(Debug, Default)]
pub struct AssetStore {
    assets: HashMap<AssetId, WavDocument>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `document` and hand back a reference to it.
    pub fn register(&mut self, document: WavDocument) -> AssetRef {
        let id = AssetId::new();
        let header = *document.header();
        let reference = AssetRef {
            id,
            duration_seconds: document.duration_seconds(),
            sample_rate: header.sample_rate,
            channels: header.channels,
            byte_len: document.len(),
        };
        self.assets.insert(id, document);
        reference
    }

    pub fn get(&self, id: AssetId) -> Option<&WavDocument> {
        self.assets.get(&id)
    }

    /// Drop an asset's bytes, returning them if it was registered.
    pub fn remove(&mut self, id: AssetId) -> Option<WavDocument> {
        self.assets.remove(&id)
    }

    /// Keep only the assets for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(AssetId) -> bool) {
        self.assets.retain(|id, _| keep(*id));
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Write an asset into `dir` as `<stem>_trimNNN.wav`, picking the first free index.
    pub fn persist(&self, id: AssetId, dir: &Path, stem: &str) -> Result<PathBuf, AssetError> {
        let document = self.get(id).ok_or(AssetError::Unknown(id))?;
        std::fs::create_dir_all(dir).map_err(|source| AssetError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = next_trim_path(dir, stem)?;
        write_atomic(&path, document.bytes())?;
        info!("Saved trimmed asset to {}", path.display());
        Ok(path)
    }
}

/// First `<stem>_trimNNN.wav` in `dir` that does not exist yet.
pub fn next_trim_path(dir: &Path, stem: &str) -> Result<PathBuf, AssetError> {
    let stem = stem.trim();
    let stem = if stem.is_empty() { "track" } else { stem };
    let stem = strip_trim_suffix(stem);
    (1..=MAX_NAME_INDEX)
        .map(|index| dir.join(format!("{stem}_trim{index:03}.wav")))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| AssetError::NoFreeName {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
        })
}

fn strip_trim_suffix(stem: &str) -> &str {
    let Some((prefix, suffix)) = stem.rsplit_once("_trim") else {
        return stem;
    };
    if suffix.len() == 3 && suffix.chars().all(|c| c.is_ascii_digit()) && !prefix.is_empty() {
        prefix
    } else {
        stem
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AssetError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let write_error = |source| AssetError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    file.persist(path).map_err(|err| write_error(err.error))?;
    Ok(())
}
