//! Binary payloads that travel in multipart requests: staged images and
//! composed voice recordings.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// MIME type of composed recordings.
pub const AUDIO_MIME: &str = "audio/wav";
/// File name the recording is uploaded under.
pub const AUDIO_FILE_NAME: &str = "recording.wav";

/// An image file picked by the user and staged for a vision query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            data,
        }
    }

    /// Read an image from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let data = std::fs::read(path).map_err(|source| AttachmentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".into());
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(file_name, mime, data))
    }
}

/// A finished recording: every captured chunk concatenated in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub mime: &'static str,
    pub data: Vec<u8>,
}

impl AudioClip {
    pub fn compose(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            mime: AUDIO_MIME,
            data: chunks.concat(),
        }
    }
}
