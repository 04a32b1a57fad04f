//! Single-track trim editor: owns the loaded audio, the selection, playback,
//! and a background worker for decode and trim jobs.

mod jobs;
mod notice;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

pub use notice::EditorNotice;

use crate::app_dirs::{self, AppDirError};
use crate::audio::{
    PlaybackBackend, PlaybackController, PlaybackError, PlaybackStatus, RodioOutput, SampleBuffer,
    SampleDecoder,
};
use crate::config::EditorSettings;
use crate::selection::{PointerEvent, SnapGrid, TrimInteraction, TrimSelectionModel};
use crate::trim::{AssetError, AssetId, AssetRef, AssetStore, TrimApplier};
use crate::waveform::{
    RenderFrame, SurfaceGeometry, WaveformEnvelope, WaveformReducer, WaveformRenderer,
    WaveformViewport,
};
use jobs::{EditorJob, JobResult, TrackSource, Worker, spawn_worker};

/// Opaque identifier of the track being edited.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors returned directly by session calls.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("No track is loaded")]
    NoTrack,
    #[error("A trim is already being applied")]
    ApplyInProgress,
    #[error("Background worker stopped unexpectedly")]
    WorkerGone,
    #[error("Failed to start background worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Timed out waiting for background work")]
    Timeout,
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("Failed to resolve export directory: {0}")]
    Dirs(#[from] AppDirError),
}

/// Outcome of a finished job, as seen by the caller of [`EditorSession::poll`].
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    TrackLoaded(TrackId),
    LoadFailed(TrackId),
    TrimApplied(AssetRef),
    TrimFailed,
}

struct LoadedTrack {
    id: TrackId,
    buffer: SampleBuffer,
    envelope: Arc<WaveformEnvelope>,
}

/// Editor state for one track at a time.
pub struct EditorSession<B: PlaybackBackend = RodioOutput> {
    settings: EditorSettings,
    jobs: Sender<EditorJob>,
    results: Receiver<JobResult>,
    next_request_id: u64,
    pending_load: Option<u64>,
    pending_apply: Option<u64>,
    track: Option<LoadedTrack>,
    empty_envelope: Arc<WaveformEnvelope>,
    selection: TrimSelectionModel,
    interaction: TrimInteraction,
    geometry: SurfaceGeometry,
    playback: PlaybackController<B>,
    assets: AssetStore,
    last_asset: Option<AssetRef>,
    notices: Vec<EditorNotice>,
}

impl EditorSession<RodioOutput> {
    /// Build a session on the default output device.
    ///
    /// A missing device is reported once through [`EditorSession::take_notices`]
    /// and leaves playback disabled.
    pub fn new(settings: EditorSettings) -> Result<Self, EditorError> {
        let mut notices = Vec::new();
        let playback = if settings.playback.output_enabled {
            match PlaybackController::open_default() {
                Ok(playback) => playback,
                Err(err) => {
                    warn!("Audio output unavailable: {err}");
                    notices.push(EditorNotice::PlaybackUnavailable {
                        message: err.to_string(),
                    });
                    PlaybackController::unavailable()
                }
            }
        } else {
            info!("Audio output disabled in settings");
            PlaybackController::unavailable()
        };
        let mut session = Self::with_playback(settings, playback)?;
        session.notices.extend(notices);
        Ok(session)
    }
}

impl<B: PlaybackBackend> EditorSession<B> {
    /// Build a session around an existing playback controller.
    pub fn with_playback(
        settings: EditorSettings,
        mut playback: PlaybackController<B>,
    ) -> Result<Self, EditorError> {
        let settings = settings.normalized();
        let worker = Worker {
            decoder: SampleDecoder::new(),
            reducer: WaveformReducer::new(settings.waveform.envelope_samples),
            applier: TrimApplier::with_output_sample_rate(settings.export.output_sample_rate),
        };
        let (jobs, results) = spawn_worker(worker).map_err(EditorError::Spawn)?;
        let mut selection = TrimSelectionModel::new(settings.trim.min_gap_percent);
        selection.set_snap_grid(SnapGrid {
            enabled: settings.trim.snap_to_grid,
            grid_size_seconds: settings.trim.grid_size_seconds,
        });
        playback.set_volume(settings.playback.volume);
        Ok(Self {
            interaction: TrimInteraction::new(settings.trim.handle_tolerance_px),
            settings,
            jobs,
            results,
            next_request_id: 0,
            pending_load: None,
            pending_apply: None,
            track: None,
            empty_envelope: Arc::new(WaveformEnvelope::from(Vec::new())),
            selection,
            geometry: SurfaceGeometry::new(0.0, WaveformViewport::default()),
            playback,
            assets: AssetStore::new(),
            last_asset: None,
            notices: Vec::new(),
        })
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Queue `bytes` for decoding; `hint` is a file extension such as `"mp3"`.
    ///
    /// Supersedes any earlier load or apply still in flight.
    pub fn load_track(
        &mut self,
        track_id: TrackId,
        bytes: Vec<u8>,
        hint: Option<&str>,
    ) -> Result<u64, EditorError> {
        let source = TrackSource::Bytes {
            bytes,
            hint: hint.map(str::to_string),
        };
        self.queue_load(track_id, source)
    }

    /// Queue a file for decoding, reading it on the worker.
    pub fn load_track_file(
        &mut self,
        track_id: TrackId,
        path: impl Into<PathBuf>,
    ) -> Result<u64, EditorError> {
        self.queue_load(track_id, TrackSource::File(path.into()))
    }

    fn queue_load(&mut self, track_id: TrackId, source: TrackSource) -> Result<u64, EditorError> {
        let request_id = self.next_request_id();
        self.pending_apply = None;
        self.interaction.cancel();
        if self.playback.status().is_playing {
            let _ = self.playback.pause();
        }
        self.jobs
            .send(EditorJob::Decode {
                request_id,
                track_id,
                source,
            })
            .map_err(|_| EditorError::WorkerGone)?;
        debug!(request_id, "Queued track load");
        self.pending_load = Some(request_id);
        Ok(request_id)
    }

    /// Trim the loaded track to the current selection on the worker.
    ///
    /// Pointer input is ignored until the result has been polled.
    pub fn apply_trim(&mut self) -> Result<u64, EditorError> {
        if self.pending_apply.is_some() {
            return Err(EditorError::ApplyInProgress);
        }
        if self.pending_load.is_some() {
            return Err(EditorError::NoTrack);
        }
        let (track_id, buffer) = match &self.track {
            Some(track) => (track.id.clone(), track.buffer.clone()),
            None => return Err(EditorError::NoTrack),
        };
        let request_id = self.next_request_id();
        self.interaction.cancel();
        self.jobs
            .send(EditorJob::Apply {
                request_id,
                track_id,
                buffer,
                selection: self.selection.selection(),
            })
            .map_err(|_| EditorError::WorkerGone)?;
        debug!(request_id, "Queued trim");
        self.pending_apply = Some(request_id);
        Ok(request_id)
    }

    /// Drain finished jobs without blocking and advance playback.
    pub fn poll(&mut self) -> Result<Vec<EditorEvent>, EditorError> {
        let mut events = Vec::new();
        loop {
            match self.results.try_recv() {
                Ok(result) => events.extend(self.handle_result(result)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(EditorError::WorkerGone),
            }
        }
        self.playback.tick();
        Ok(events)
    }

    /// Block until no load or apply is outstanding, or `timeout` elapses.
    pub fn wait_idle(&mut self, timeout: Duration) -> Result<Vec<EditorEvent>, EditorError> {
        let deadline = Instant::now() + timeout;
        let mut events = self.poll()?;
        while self.is_busy() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(result) => events.extend(self.handle_result(result)),
                Err(RecvTimeoutError::Timeout) => return Err(EditorError::Timeout),
                Err(RecvTimeoutError::Disconnected) => return Err(EditorError::WorkerGone),
            }
        }
        Ok(events)
    }

    /// True while a load or apply has not been polled yet.
    pub fn is_busy(&self) -> bool {
        self.pending_load.is_some() || self.pending_apply.is_some()
    }

    pub fn is_applying(&self) -> bool {
        self.pending_apply.is_some()
    }

    fn next_request_id(&mut self) -> u64 {
        self.next_request_id += 1;
        self.next_request_id
    }

    fn handle_result(&mut self, result: JobResult) -> Option<EditorEvent> {
        match result {
            JobResult::Decoded {
                request_id,
                track_id,
                result,
            } => {
                if self.pending_load != Some(request_id) {
                    debug!(request_id, track = %track_id, "Dropping stale decode result");
                    return None;
                }
                self.pending_load = None;
                match result {
                    Ok(prepared) => {
                        info!(
                            track = %track_id,
                            frames = prepared.buffer.frame_count(),
                            "Track ready"
                        );
                        self.install(track_id.clone(), prepared.buffer, prepared.envelope);
                        Some(EditorEvent::TrackLoaded(track_id))
                    }
                    Err(err) => {
                        self.notices.push(EditorNotice::LoadFailed {
                            track_id: track_id.clone(),
                            message: err.to_string(),
                        });
                        Some(EditorEvent::LoadFailed(track_id))
                    }
                }
            }
            JobResult::Applied {
                request_id,
                track_id,
                result,
            } => {
                let current = self.pending_apply == Some(request_id)
                    && self.track.as_ref().is_some_and(|track| track.id == track_id);
                if !current {
                    debug!(request_id, track = %track_id, "Dropping stale trim result");
                    return None;
                }
                self.pending_apply = None;
                match result {
                    Ok(applied) => {
                        let asset = self.assets.register(applied.outcome.document);
                        info!(uri = %asset.uri(), "Registered trimmed asset");
                        self.notices.push(EditorNotice::TrimApplied {
                            uri: asset.uri(),
                            duration_seconds: asset.duration_seconds,
                        });
                        self.last_asset = Some(asset.clone());
                        self.install(track_id, applied.outcome.buffer, applied.envelope);
                        Some(EditorEvent::TrimApplied(asset))
                    }
                    Err(err) => {
                        self.notices.push(EditorNotice::TrimFailed {
                            message: err.to_string(),
                        });
                        Some(EditorEvent::TrimFailed)
                    }
                }
            }
        }
    }

    fn install(&mut self, id: TrackId, buffer: SampleBuffer, envelope: WaveformEnvelope) {
        self.interaction.cancel();
        self.selection.reset();
        self.selection.set_total_duration(buffer.duration_seconds());
        if let Err(err) = self.playback.load(&buffer) {
            warn!("Failed to queue audio for playback: {err}");
        }
        self.track = Some(LoadedTrack {
            id,
            buffer,
            envelope: Arc::new(envelope),
        });
    }

    pub fn track_id(&self) -> Option<&TrackId> {
        self.track.as_ref().map(|track| &track.id)
    }

    /// Samples currently being edited.
    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.track.as_ref().map(|track| &track.buffer)
    }

    pub fn envelope(&self) -> Arc<WaveformEnvelope> {
        self.track
            .as_ref()
            .map_or_else(|| Arc::clone(&self.empty_envelope), |track| {
                Arc::clone(&track.envelope)
            })
    }

    pub fn selection(&self) -> &TrimSelectionModel {
        &self.selection
    }

    pub fn set_trim_start(&mut self, percent: f64) {
        if !self.is_applying() {
            self.selection.set_start(percent);
        }
    }

    pub fn set_trim_end(&mut self, percent: f64) {
        if !self.is_applying() {
            self.selection.set_end(percent);
        }
    }

    pub fn reset_trim(&mut self) {
        if !self.is_applying() {
            self.interaction.cancel();
            self.selection.reset();
        }
    }

    pub fn set_snap_to_grid(&mut self, enabled: bool) {
        self.selection.set_snap_enabled(enabled);
    }

    pub fn set_grid_size(&mut self, seconds: f64) {
        self.selection.set_grid_size(seconds);
    }

    /// Surface width and viewport used to map pointer positions.
    pub fn set_surface(&mut self, width_px: f64, viewport: WaveformViewport) {
        self.geometry = SurfaceGeometry::new(width_px, viewport);
    }

    pub fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    /// Forward a pointer event unless a trim is being applied. Returns true
    /// when the selection changed.
    pub fn pointer(&mut self, event: PointerEvent) -> bool {
        if self.is_applying() || self.track.is_none() {
            return false;
        }
        self.interaction
            .handle(event, &self.geometry, &mut self.selection)
    }

    pub fn pointer_down(&mut self, x_px: f64) -> bool {
        self.pointer(PointerEvent::Down { x_px })
    }

    pub fn pointer_move(&mut self, x_px: f64) -> bool {
        self.pointer(PointerEvent::Move { x_px })
    }

    pub fn pointer_up(&mut self) {
        self.pointer(PointerEvent::Up);
    }

    pub fn pointer_leave(&mut self) {
        self.pointer(PointerEvent::Leave);
    }

    pub fn interaction(&self) -> &TrimInteraction {
        &self.interaction
    }

    /// Snapshot for drawing code.
    pub fn render_frame(&self) -> RenderFrame {
        let status = self.playback.status();
        let playhead_percent = if status.duration_seconds > 0.0 {
            (status.current_time_seconds / status.duration_seconds * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let snap = self.selection.snap_grid();
        RenderFrame {
            envelope: self.envelope(),
            trim_start: self.selection.start(),
            trim_end: self.selection.end(),
            playhead_percent,
            duration_seconds: self.selection.total_duration(),
            grid_interval_seconds: snap.grid_size_seconds,
            snap_to_grid: snap.enabled,
        }
    }

    pub fn render_to(&self, renderer: &mut impl WaveformRenderer) {
        renderer.render(&self.render_frame());
    }

    pub fn playback(&self) -> &PlaybackController<B> {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackController<B> {
        &mut self.playback
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        self.playback.status()
    }

    pub fn toggle_playback(&mut self) -> Result<(), EditorError> {
        Ok(self.playback.toggle()?)
    }

    pub fn stop_playback(&mut self) -> Result<(), EditorError> {
        Ok(self.playback.stop()?)
    }

    /// Seek to a position given in percent of the loaded track.
    pub fn seek_percent(&mut self, percent: f64) -> Result<(), EditorError> {
        let seconds = percent.clamp(0.0, 100.0) / 100.0 * self.selection.total_duration();
        Ok(self.playback.seek(seconds)?)
    }

    /// Notices raised since the last call, oldest first.
    pub fn take_notices(&mut self) -> Vec<EditorNotice> {
        std::mem::take(&mut self.notices)
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    /// Free a registered asset. Returns false when `id` was not held.
    pub fn release_asset(&mut self, id: AssetId) -> bool {
        if self.last_asset.as_ref().is_some_and(|asset| asset.id == id) {
            self.last_asset = None;
        }
        self.assets.remove(id).is_some()
    }

    /// Free every asset except the most recent one; returns how many were dropped.
    pub fn release_superseded_assets(&mut self) -> usize {
        let before = self.assets.len();
        let latest = self.last_asset.as_ref().map(|asset| asset.id);
        self.assets.retain(|id| Some(id) == latest);
        let released = before - self.assets.len();
        if released > 0 {
            debug!(released, "Released superseded assets");
        }
        released
    }

    /// Most recent asset produced by [`EditorSession::apply_trim`].
    pub fn last_asset(&self) -> Option<&AssetRef> {
        self.last_asset.as_ref()
    }

    /// Write the latest asset as `<stem>_trimNNN.wav` into the configured
    /// export directory, or the app exports folder when unset.
    pub fn persist_last_asset(&self, stem: &str) -> Result<PathBuf, EditorError> {
        let asset = self.last_asset.as_ref().ok_or(EditorError::NoTrack)?;
        let dir = match &self.settings.export.asset_dir {
            Some(dir) => dir.clone(),
            None => app_dirs::exports_dir()?,
        };
        self.persist_asset_to(asset, &dir, stem)
    }

    pub fn persist_asset_to(
        &self,
        asset: &AssetRef,
        dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, EditorError> {
        Ok(self.assets.persist(asset.id, dir, stem)?)
    }
}
