use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

use thiserror::Error;
use tracing::{debug, error, warn};

use super::TrackId;
use crate::audio::{DecodeError, SampleBuffer, SampleDecoder};
use crate::selection::TrimSelection;
use crate::trim::{TrimApplier, TrimError, TrimOutcome};
use crate::waveform::{WaveformEnvelope, WaveformReducer};

/// Encoded audio handed to the worker.
pub(crate) enum TrackSource {
    Bytes { bytes: Vec<u8>, hint: Option<String> },
    File(PathBuf),
}

pub(crate) enum EditorJob {
    Decode {
        request_id: u64,
        track_id: TrackId,
        source: TrackSource,
    },
    Apply {
        request_id: u64,
        track_id: TrackId,
        buffer: SampleBuffer,
        selection: TrimSelection,
    },
}

/// Samples plus the envelope computed from them, ready to install.
pub(crate) struct PreparedAudio {
    pub buffer: SampleBuffer,
    pub envelope: WaveformEnvelope,
}

pub(crate) struct AppliedTrim {
    pub outcome: TrimOutcome,
    pub envelope: WaveformEnvelope,
}

/// Why a worker job produced no result.
#[derive(Debug, Error)]
pub(crate) enum JobFailure {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Trim(#[from] TrimError),
    /// The job panicked; the worker keeps serving later jobs.
    #[error("Background job crashed: {0}")]
    Panicked(String),
}

pub(crate) enum JobResult {
    Decoded {
        request_id: u64,
        track_id: TrackId,
        result: Result<PreparedAudio, JobFailure>,
    },
    Applied {
        request_id: u64,
        track_id: TrackId,
        result: Result<AppliedTrim, JobFailure>,
    },
}

pub(crate) struct Worker {
    pub decoder: SampleDecoder,
    pub reducer: WaveformReducer,
    pub applier: TrimApplier,
}

impl Worker {
    fn run(&self, job: EditorJob) -> JobResult {
        match job {
            EditorJob::Decode {
                request_id,
                track_id,
                source,
            } => {
                debug!(request_id, track = %track_id, "Decoding track");
                let result = guarded(|| self.prepare(&source));
                if let Err(err) = &result {
                    warn!(request_id, track = %track_id, "Decode failed: {err}");
                }
                JobResult::Decoded {
                    request_id,
                    track_id,
                    result,
                }
            }
            EditorJob::Apply {
                request_id,
                track_id,
                buffer,
                selection,
            } => {
                let result = guarded(|| self.apply(&buffer, selection));
                if let Err(err) = &result {
                    warn!(request_id, track = %track_id, "Trim failed: {err}");
                }
                JobResult::Applied {
                    request_id,
                    track_id,
                    result,
                }
            }
        }
    }

    fn prepare(&self, source: &TrackSource) -> Result<PreparedAudio, JobFailure> {
        let buffer = match source {
            TrackSource::Bytes { bytes, hint } => self.decoder.decode(bytes, hint.as_deref())?,
            TrackSource::File(path) => self.decoder.decode_file(path)?,
        };
        Ok(PreparedAudio {
            envelope: self.reducer.reduce_buffer(&buffer),
            buffer,
        })
    }

    fn apply(
        &self,
        buffer: &SampleBuffer,
        selection: TrimSelection,
    ) -> Result<AppliedTrim, JobFailure> {
        let outcome = self.applier.apply(buffer, selection)?;
        Ok(AppliedTrim {
            envelope: self.reducer.reduce_buffer(&outcome.buffer),
            outcome,
        })
    }
}

/// Run `job`, turning a panic into [`JobFailure::Panicked`].
fn guarded<T>(job: impl FnOnce() -> Result<T, JobFailure>) -> Result<T, JobFailure> {
    catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
        let message = panic_message(payload);
        error!("Worker job panicked: {message}");
        Err(JobFailure::Panicked(message))
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unknown panic payload".to_string()
    }
}

/// Start the background worker; jobs run one at a time in submission order.
pub(crate) fn spawn_worker(
    worker: Worker,
) -> std::io::Result<(Sender<EditorJob>, Receiver<JobResult>)> {
    let (job_tx, job_rx) = channel::<EditorJob>();
    let (result_tx, result_rx) = channel::<JobResult>();
    thread::Builder::new()
        .name("trackprep-worker".to_string())
        .spawn(move || {
            while let Ok(job) = job_rx.recv() {
                if result_tx.send(worker.run(job)).is_err() {
                    break;
                }
            }
        })?;
    Ok((job_tx, result_rx))
}
