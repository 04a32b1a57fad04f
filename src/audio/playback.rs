use std::sync::mpsc::{Receiver, Sender, channel};

use thiserror::Error;
use tracing::{debug, warn};

use super::buffer::SampleBuffer;
use super::output::{ResourceError, RodioOutput};

/// Volume applied to a fresh controller.
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Errors returned by playback transport calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// No output device could be opened; playback is disabled.
    #[error("Audio playback is unavailable")]
    Unavailable,
    /// Transport was used before any audio was loaded.
    #[error("Load a track before starting playback")]
    NothingLoaded,
    /// The backend rejected a seek.
    #[error("Seek failed: {0}")]
    Seek(String),
}

/// Snapshot published to playback observers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackStatus {
    pub current_time_seconds: f64,
    pub is_playing: bool,
    pub duration_seconds: f64,
}

/// Output sink the controller drives.
///
/// Implementations own the device connection; the controller owns transport
/// state and observer notifications.
pub trait PlaybackBackend {
    /// Replace the queued audio, leaving output paused at the start.
    fn load(&mut self, buffer: &SampleBuffer) -> Result<(), PlaybackError>;
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError>;
    fn set_volume(&mut self, volume: f32);
    /// Current playback position in seconds.
    fn position_seconds(&self) -> f64;
    /// True once the loaded audio has played to its end.
    fn is_finished(&self) -> bool;
}

/// Transport state for one loaded buffer.
pub struct PlaybackController<B = RodioOutput> {
    backend: Option<B>,
    loaded: bool,
    is_playing: bool,
    position: f64,
    duration: f64,
    volume: f32,
    observers: Vec<Sender<PlaybackStatus>>,
    last_published: Option<PlaybackStatus>,
}

impl PlaybackController<RodioOutput> {
    /// Open the default output device.
    pub fn open_default() -> Result<Self, ResourceError> {
        Ok(Self::new(RodioOutput::open_default()?))
    }
}

impl<B: PlaybackBackend> PlaybackController<B> {
    pub fn new(mut backend: B) -> Self {
        backend.set_volume(DEFAULT_VOLUME);
        Self {
            backend: Some(backend),
            ..Self::unavailable()
        }
    }

    /// Controller with no output; transport calls fail with [`PlaybackError::Unavailable`].
    pub fn unavailable() -> Self {
        Self {
            backend: None,
            loaded: false,
            is_playing: false,
            position: 0.0,
            duration: 0.0,
            volume: DEFAULT_VOLUME,
            observers: Vec::new(),
            last_published: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            current_time_seconds: self.position,
            is_playing: self.is_playing,
            duration_seconds: self.duration,
        }
    }

    /// Register an observer; it receives every status change from now on.
    pub fn subscribe(&mut self) -> Receiver<PlaybackStatus> {
        let (tx, rx) = channel();
        let _ = tx.send(self.status());
        self.observers.push(tx);
        rx
    }

    /// Queue `buffer` for playback, stopping whatever was loaded.
    pub fn load(&mut self, buffer: &SampleBuffer) -> Result<(), PlaybackError> {
        self.is_playing = false;
        self.position = 0.0;
        self.duration = buffer.duration_seconds();
        if let Some(backend) = self.backend.as_mut() {
            backend.load(buffer)?;
            backend.set_volume(self.volume);
        }
        self.loaded = true;
        self.publish();
        Ok(())
    }

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        let duration = self.duration;
        let at_end = self.position >= duration;
        let backend = self.ready_backend()?;
        if at_end {
            backend.seek(0.0)?;
        }
        backend.play()?;
        if at_end {
            self.position = 0.0;
        }
        self.is_playing = true;
        self.publish();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        let backend = self.ready_backend()?;
        backend.pause();
        let position = backend.position_seconds();
        self.position = position.clamp(0.0, self.duration);
        self.is_playing = false;
        self.publish();
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        if self.is_playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Pause and rewind to the start.
    pub fn stop(&mut self) -> Result<(), PlaybackError> {
        let backend = self.ready_backend()?;
        backend.pause();
        backend.seek(0.0)?;
        self.position = 0.0;
        self.is_playing = false;
        self.publish();
        Ok(())
    }

    /// Move the playhead, clamped to the loaded duration. Non-finite input is ignored.
    pub fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        if !seconds.is_finite() {
            return Ok(());
        }
        let target = seconds.clamp(0.0, self.duration);
        self.ready_backend()?.seek(target)?;
        self.position = target;
        self.publish();
        Ok(())
    }

    /// Set output volume in [0, 1].
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(backend) = self.backend.as_mut() {
            backend.set_volume(self.volume);
        }
    }

    /// Poll the backend and publish progress; call from the session loop.
    pub fn tick(&mut self) {
        if !self.is_playing {
            return;
        }
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        if backend.is_finished() {
            debug!("Playback reached the end of the track");
            if let Err(err) = backend.seek(0.0) {
                warn!("Failed to rewind finished playback: {err}");
            }
            self.is_playing = false;
            self.position = 0.0;
        } else {
            self.position = backend.position_seconds().clamp(0.0, self.duration);
        }
        self.publish();
    }

    fn ready_backend(&mut self) -> Result<&mut B, PlaybackError> {
        let backend = self.backend.as_mut().ok_or(PlaybackError::Unavailable)?;
        if !self.loaded {
            return Err(PlaybackError::NothingLoaded);
        }
        Ok(backend)
    }

    fn publish(&mut self) {
        let status = self.status();
        if self.last_published == Some(status) {
            return;
        }
        self.last_published = Some(status);
        self.observers.retain(|observer| observer.send(status).is_ok());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Backend that advances only when told to.
    #[derive(Default)]
    pub(crate) struct ManualBackend {
        pub position: f64,
        pub duration: f64,
        pub playing: bool,
        pub volume: f32,
        pub loads: usize,
    }

    impl PlaybackBackend for ManualBackend {
        fn load(&mut self, buffer: &SampleBuffer) -> Result<(), PlaybackError> {
            self.duration = buffer.duration_seconds();
            self.position = 0.0;
            self.playing = false;
            self.loads += 1;
            Ok(())
        }

        fn play(&mut self) -> Result<(), PlaybackError> {
            self.playing = true;
            Ok(())
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
            self.position = seconds;
            Ok(())
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }

        fn position_seconds(&self) -> f64 {
            self.position
        }

        fn is_finished(&self) -> bool {
            self.position >= self.duration
        }
    }

    fn two_second_buffer() -> SampleBuffer {
        SampleBuffer::new(100, vec![vec![0.0; 200]]).unwrap()
    }

    fn loaded_controller() -> PlaybackController<ManualBackend> {
        let mut controller = PlaybackController::new(ManualBackend::default());
        controller.load(&two_second_buffer()).unwrap();
        controller
    }

    #[test]
    fn defaults_to_seventy_percent_volume() {
        let controller = PlaybackController::new(ManualBackend::default());
        assert_eq!(controller.volume(), DEFAULT_VOLUME);
        assert_eq!(controller.backend.as_ref().unwrap().volume, DEFAULT_VOLUME);
    }

    #[test]
    fn volume_is_clamped() {
        let mut controller = loaded_controller();
        controller.set_volume(3.0);
        assert_eq!(controller.volume(), 1.0);
        controller.set_volume(-1.0);
        assert_eq!(controller.volume(), 0.0);
        controller.set_volume(f32::NAN);
        assert_eq!(controller.volume(), 0.0);
    }

    #[test]
    fn transport_requires_loaded_audio() {
        let mut controller = PlaybackController::new(ManualBackend::default());
        assert_eq!(controller.play(), Err(PlaybackError::NothingLoaded));
    }

    #[test]
    fn unavailable_controller_rejects_transport() {
        let mut controller = PlaybackController::<ManualBackend>::unavailable();
        controller.load(&two_second_buffer()).unwrap();
        assert_eq!(controller.play(), Err(PlaybackError::Unavailable));
        assert_eq!(controller.status().duration_seconds, 2.0);
        assert!(!controller.status().is_playing);
    }

    #[test]
    fn seek_clamps_to_duration() {
        let mut controller = loaded_controller();
        controller.seek(5.0).unwrap();
        assert_eq!(controller.status().current_time_seconds, 2.0);
        controller.seek(-1.0).unwrap();
        assert_eq!(controller.status().current_time_seconds, 0.0);
    }

    #[test]
    fn stop_pauses_and_rewinds() {
        let mut controller = loaded_controller();
        controller.play().unwrap();
        controller.backend.as_mut().unwrap().position = 1.2;
        controller.tick();
        assert!((controller.status().current_time_seconds - 1.2).abs() < 1e-9);
        controller.stop().unwrap();
        let status = controller.status();
        assert!(!status.is_playing);
        assert_eq!(status.current_time_seconds, 0.0);
        assert!(!controller.backend.as_ref().unwrap().playing);
    }

    #[test]
    fn reaching_the_end_resets_and_notifies() {
        let mut controller = loaded_controller();
        let updates = controller.subscribe();
        controller.play().unwrap();
        controller.backend.as_mut().unwrap().position = 2.0;
        controller.tick();
        let last = updates.try_iter().last().unwrap();
        assert!(!last.is_playing);
        assert_eq!(last.current_time_seconds, 0.0);
        assert_eq!(last.duration_seconds, 2.0);
    }

    #[test]
    fn toggle_flips_between_play_and_pause() {
        let mut controller = loaded_controller();
        controller.toggle().unwrap();
        assert!(controller.status().is_playing);
        controller.toggle().unwrap();
        assert!(!controller.status().is_playing);
    }
}
