//! Voice capture: the microphone seam, the per-recording chunk accumulator,
//! and a file-backed microphone for the terminal front-end.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot};

use crate::media::AudioClip;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("audio device unavailable: {0}")]
    Device(String),
}

/// Audio capture device. Captured data and the end of capture are delivered
/// out of band, as chunk and stop events fed to the controller.
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Ask for access and begin capturing.
    async fn start(&self) -> Result<(), RecorderError>;

    /// Stop capturing. A stop event follows once the last chunk is out.
    fn stop(&self);
}

/// Chunks captured so far for the current recording.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum RecordingSession {
    #[default]
    Idle,
    Recording {
        chunks: Vec<Vec<u8>>,
    },
    /// Capture was told to stop; trailing chunks may still arrive.
    Stopping {
        chunks: Vec<Vec<u8>>,
    },
}

impl RecordingSession {
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingSession::Recording { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, RecordingSession::Idle)
    }

    pub fn begin(&mut self) {
        *self = RecordingSession::Recording { chunks: Vec::new() };
    }

    /// Recording → Stopping. Other states are left alone.
    pub fn stop(&mut self) {
        if let RecordingSession::Recording { chunks } = std::mem::take(self) {
            *self = RecordingSession::Stopping { chunks };
        }
    }

    /// Append a chunk; returns false when no recording is collecting.
    pub fn push(&mut self, chunk: Vec<u8>) -> bool {
        match self {
            RecordingSession::Recording { chunks } | RecordingSession::Stopping { chunks } => {
                chunks.push(chunk);
                true
            }
            RecordingSession::Idle => false,
        }
    }

    /// Compose the stopped recording and reset to Idle.
    pub fn finish(&mut self) -> Option<AudioClip> {
        match std::mem::take(self) {
            RecordingSession::Stopping { chunks } => Some(AudioClip::compose(chunks)),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// Events emitted by a capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Chunk(Vec<u8>),
    Stopped,
}

const CHUNK_SIZE: usize = 4096;

/// Microphone that "captures" a WAV file: its bytes are streamed out as
/// chunks, and the stop event is sent once both the file is drained and
/// `stop` was called.
pub struct FileMicrophone {
    source: Mutex<Option<PathBuf>>,
    events: mpsc::UnboundedSender<CaptureEvent>,
    active: Mutex<Option<oneshot::Sender<()>>>,
}

impl FileMicrophone {
    pub fn new(events: mpsc::UnboundedSender<CaptureEvent>) -> Self {
        Self {
            source: Mutex::new(None),
            events,
            active: Mutex::new(None),
        }
    }

    /// File to stream on the next `start`.
    pub fn set_source(&self, path: impl Into<PathBuf>) {
        *self.source.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.into());
    }
}

#[async_trait]
impl Microphone for FileMicrophone {
    async fn start(&self) -> Result<(), RecorderError> {
        let path = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| RecorderError::Device("no audio source selected".into()))?;

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            let detail = format!("{}: {}", path.display(), e);
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                RecorderError::PermissionDenied(detail)
            } else {
                RecorderError::Device(detail)
            }
        })?;

        let (stop_tx, stop_rx) = oneshot::channel();
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(stop_tx);

        let events = self.events.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match file.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if events.send(CaptureEvent::Chunk(buf[..n].to_vec())).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "audio source read failed");
                        break;
                    }
                }
            }
            // Sender dropped counts as a stop too.
            let _ = stop_rx.await;
            let _ = events.send(CaptureEvent::Stopped);
        });
        tracing::debug!(source = %path.display(), "capture started");
        Ok(())
    }

    fn stop(&self) {
        if let Some(stop) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = stop.send(());
        }
    }
}
