//! HTTP client for the SmartFarm backend: `/query`, `/vision_query`, `/voice_to_text`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use thiserror::Error;

use crate::media::{Attachment, AudioClip, AUDIO_FILE_NAME};
use crate::messages::{QueryRequest, Reply, Transcription};

/// Backend client error. Any failure to reach the server or to decode its
/// body as JSON ends up here.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid server URL {0:?}")]
    InvalidUrl(String),
}

/// The three calls the chat controller makes.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Text-only question.
    async fn query(&self, message: &str) -> Result<Reply, ClientError>;

    /// Image plus a description of what to look at.
    async fn vision_query(&self, text: &str, image: &Attachment) -> Result<Reply, ClientError>;

    /// Transcribe a recording.
    async fn voice_to_text(&self, audio: &AudioClip) -> Result<Transcription, ClientError>;
}

/// `ChatBackend` over HTTP. Status codes are not inspected: any JSON body is
/// taken as the server's answer.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    language: Option<String>,
}

impl HttpClient {
    /// Client for the server at `base_url` (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        reqwest::Url::parse(base_url).map_err(|_| ClientError::InvalidUrl(base_url.into()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: None,
        })
    }

    /// Ask the backend to answer in `language` (ISO code, backend default `en`).
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl ChatBackend for HttpClient {
    async fn query(&self, message: &str) -> Result<Reply, ClientError> {
        let body = QueryRequest::new(message, self.language.as_deref());
        let response = self
            .http
            .post(self.endpoint("query"))
            .json(&body)
            .send()
            .await?;
        tracing::debug!(status = %response.status(), "query answered");
        Ok(response.json().await?)
    }

    async fn vision_query(&self, text: &str, image: &Attachment) -> Result<Reply, ClientError> {
        let image_part = Part::bytes(image.data.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime)?;
        let mut form = Form::new()
            .part("image", image_part)
            .text("text", text.to_string());
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }
        let response = self
            .http
            .post(self.endpoint("vision_query"))
            .multipart(form)
            .send()
            .await?;
        tracing::debug!(status = %response.status(), "vision query answered");
        Ok(response.json().await?)
    }

    async fn voice_to_text(&self, audio: &AudioClip) -> Result<Transcription, ClientError> {
        let audio_part = Part::bytes(audio.data.clone())
            .file_name(AUDIO_FILE_NAME)
            .mime_str(audio.mime)?;
        let form = Form::new().part("audio", audio_part);
        let response = self
            .http
            .post(self.endpoint("voice_to_text"))
            .multipart(form)
            .send()
            .await?;
        tracing::debug!(status = %response.status(), "transcription answered");
        Ok(response.json().await?)
    }
}
