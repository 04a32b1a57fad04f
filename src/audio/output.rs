use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use thiserror::Error;
use tracing::info;

use super::buffer::SampleBuffer;
use super::playback::{PlaybackBackend, PlaybackError};

/// Failure to acquire the audio output device.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The default output stream could not be opened.
    #[error("Failed to open the default audio output: {source}")]
    OpenStream { source: rodio::StreamError },
}

/// Playback backend over the default rodio output stream.
pub struct RodioOutput {
    stream: OutputStream,
    sink: Sink,
    source: Option<SamplesBuffer>,
    volume: f32,
}

impl RodioOutput {
    /// Open the system default output device.
    pub fn open_default() -> Result<Self, ResourceError> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|source| ResourceError::OpenStream { source })?;
        info!("Opened default audio output");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already opened stream.
    pub fn from_stream(stream: OutputStream) -> Self {
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        Self {
            stream,
            sink,
            source: None,
            volume: 1.0,
        }
    }

    /// Queue a fresh copy of the loaded source on a new sink.
    fn rearm(&mut self) -> Result<(), PlaybackError> {
        let source = self.source.clone().ok_or(PlaybackError::NothingLoaded)?;
        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.set_volume(self.volume);
        sink.append(source);
        self.sink = sink;
        Ok(())
    }
}

impl PlaybackBackend for RodioOutput {
    fn load(&mut self, buffer: &SampleBuffer) -> Result<(), PlaybackError> {
        self.sink.stop();
        self.source = Some(SamplesBuffer::new(
            buffer.channel_count() as u16,
            buffer.sample_rate(),
            buffer.interleaved(),
        ));
        self.rearm()
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.sink.empty() {
            self.rearm()?;
        }
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        if self.sink.empty() {
            self.rearm()?;
        }
        self.sink
            .try_seek(Duration::from_secs_f64(seconds.max(0.0)))
            .map_err(|err| PlaybackError::Seek(err.to_string()))
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.sink.set_volume(volume);
    }

    fn position_seconds(&self) -> f64 {
        self.sink.get_pos().as_secs_f64()
    }

    fn is_finished(&self) -> bool {
        self.source.is_some() && self.sink.empty()
    }
}
