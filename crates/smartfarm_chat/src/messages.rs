//! Wire types for the three backend endpoints. Client ↔ server JSON.

use serde::{Deserialize, Serialize};

/// Client → server: body of `POST /query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<&'a str>,
}

impl<'a> QueryRequest<'a> {
    pub fn new(message: &'a str, language: Option<&'a str>) -> Self {
        Self { message, language }
    }
}

/// Server → client: reply from `/query` and `/vision_query`.
///
/// The vision endpoint answers failures with `{"error": ...}` and no
/// `response`, so both fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Reply {
    /// The answer text, if the server sent a non-empty one.
    pub fn answer(&self) -> Option<&str> {
        self.response.as_deref().filter(|r| !r.is_empty())
    }
}

/// Server → client: reply from `/voice_to_text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
}

impl Transcription {
    /// The transcribed text, if the server sent a non-empty one.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}
