//! Chat controller: turns user actions into backend requests and renders
//! every turn on the chat view.
//!
//! The controller is driven from a single UI event loop (`&mut self`). A send
//! renders the user's entry and resets the input synchronously, then hands
//! back a [`Dispatch`] that performs the request and renders the reply. The
//! caller decides whether to await it or run it alongside further events;
//! dispatches are independent of each other and are never queued or
//! cancelled.

use std::sync::Arc;

use crate::client::ChatBackend;
use crate::media::{Attachment, AudioClip};
use crate::messages::Reply;
use crate::recorder::{Microphone, RecordingSession};
use crate::view::{ChatMessage, ChatView};

pub const EMPTY_MESSAGE: &str = "Please type a message.";
pub const EMPTY_IMAGE_DESCRIPTION: &str = "Please provide a description for the image.";
pub const NO_RESPONSE: &str = "No response from the server.";
pub const CONNECTION_ERROR: &str = "Error connecting to server.";
pub const RECORDING_UNAVAILABLE: &str =
    "Could not start recording. Check your microphone permissions.";
pub const TRANSCRIPTION_EMPTY: &str = "Sorry, I couldn't process the audio.";
pub const TRANSCRIPTION_FAILED: &str = "Error processing audio recording.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Other,
}

/// A key event in the message input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub shift: bool,
}

impl KeyPress {
    pub fn enter() -> Self {
        Self {
            key: Key::Enter,
            shift: false,
        }
    }

    /// Enter without Shift sends; Shift+Enter is a newline.
    pub fn is_submit(&self) -> bool {
        self.key == Key::Enter && !self.shift
    }
}

/// What a [`Dispatch`] will ask the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Query { message: String },
    Vision { text: String, image: Arc<Attachment> },
    Transcribe { audio: AudioClip },
}

/// An outbound request plus the rendering of its outcome.
pub struct Dispatch {
    backend: Arc<dyn ChatBackend>,
    view: Arc<dyn ChatView>,
    request: Request,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl Dispatch {
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Perform the request and render the reply. Failures are rendered as
    /// a fixed bot message, never returned.
    pub async fn run(self) {
        let backend = self.backend.as_ref();
        let view = self.view.as_ref();
        match self.request {
            Request::Query { message } => query(backend, view, &message).await,
            Request::Vision { text, image } => {
                tracing::info!(image = %image.file_name, "sending vision query");
                match backend.vision_query(&text, &image).await {
                    Ok(reply) => render_reply(view, reply),
                    Err(e) => {
                        tracing::warn!(error = %e, "vision query failed");
                        view.append(ChatMessage::bot(CONNECTION_ERROR));
                    }
                }
            }
            Request::Transcribe { audio } => {
                tracing::info!(bytes = audio.data.len(), "sending recording for transcription");
                match backend.voice_to_text(&audio).await {
                    Ok(transcription) => match transcription.text() {
                        Some(text) => {
                            view.append(ChatMessage::user(text));
                            query(backend, view, text).await;
                        }
                        None => view.append(ChatMessage::bot(TRANSCRIPTION_EMPTY)),
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "voice-to-text failed");
                        view.append(ChatMessage::bot(TRANSCRIPTION_FAILED));
                    }
                }
            }
        }
    }
}

async fn query(backend: &dyn ChatBackend, view: &dyn ChatView, message: &str) {
    tracing::info!("sending query");
    match backend.query(message).await {
        Ok(reply) => render_reply(view, reply),
        Err(e) => {
            tracing::warn!(error = %e, "query failed");
            view.append(ChatMessage::bot(CONNECTION_ERROR));
        }
    }
}

fn render_reply(view: &dyn ChatView, reply: Reply) {
    if let Some(error) = &reply.error {
        tracing::warn!(%error, "server reported an error");
    }
    view.append(ChatMessage::bot(reply.answer().unwrap_or(NO_RESPONSE)));
}

/// Holds the staged attachment and the recording session between events.
pub struct ChatController {
    backend: Arc<dyn ChatBackend>,
    view: Arc<dyn ChatView>,
    microphone: Arc<dyn Microphone>,
    attachment: Option<Arc<Attachment>>,
    recording: RecordingSession,
}

impl ChatController {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        view: Arc<dyn ChatView>,
        microphone: Arc<dyn Microphone>,
    ) -> Self {
        Self {
            backend,
            view,
            microphone,
            attachment: None,
            recording: RecordingSession::Idle,
        }
    }

    pub fn pending_attachment(&self) -> Option<&Attachment> {
        self.attachment.as_deref()
    }

    pub fn recording(&self) -> &RecordingSession {
        &self.recording
    }

    /// Send button. Returns `None` when validation blocked the send.
    pub fn submit(&mut self, input: &str) -> Option<Dispatch> {
        let text = input.trim();
        let request = match &self.attachment {
            Some(image) => {
                if text.is_empty() {
                    self.view.alert(EMPTY_IMAGE_DESCRIPTION);
                    return None;
                }
                self.view
                    .append(ChatMessage::user_with_image(text, Arc::clone(image)));
                Request::Vision {
                    text: text.to_string(),
                    image: Arc::clone(image),
                }
            }
            None => {
                if text.is_empty() {
                    self.view.alert(EMPTY_MESSAGE);
                    return None;
                }
                self.view.append(ChatMessage::user(text));
                Request::Query {
                    message: text.to_string(),
                }
            }
        };

        self.view.clear_input();
        self.attachment = None;
        self.view.hide_preview();

        Some(self.dispatch(request))
    }

    pub fn key_press(&mut self, key: KeyPress, input: &str) -> Option<Dispatch> {
        if key.is_submit() {
            self.submit(input)
        } else {
            None
        }
    }

    /// Stage an image, replacing any previously staged one.
    pub fn select_attachment(&mut self, attachment: Attachment) {
        tracing::debug!(file = %attachment.file_name, "attachment selected");
        self.view.show_preview(&attachment);
        self.attachment = Some(Arc::new(attachment));
    }

    pub fn cancel_attachment(&mut self) {
        self.attachment = None;
        self.view.hide_preview();
        self.view.reset_file_picker();
    }

    /// Record button.
    pub async fn toggle_recording(&mut self) {
        match self.recording {
            RecordingSession::Idle => match self.microphone.start().await {
                Ok(()) => {
                    self.recording.begin();
                    self.view.set_recording(true);
                    tracing::debug!("recording started");
                }
                Err(e) => {
                    tracing::error!(error = %e, "could not start recording");
                    self.view.alert(RECORDING_UNAVAILABLE);
                }
            },
            RecordingSession::Recording { .. } => {
                self.microphone.stop();
                self.recording.stop();
                self.view.set_recording(false);
                tracing::debug!("recording stopping");
            }
            RecordingSession::Stopping { .. } => {
                tracing::debug!("previous recording still finishing; toggle ignored");
            }
        }
    }

    /// Captured audio from the microphone.
    pub fn audio_chunk(&mut self, chunk: Vec<u8>) {
        if !self.recording.push(chunk) {
            tracing::debug!("audio chunk outside a recording dropped");
        }
    }

    /// Capture finished: compose the recording and send it for transcription.
    pub fn recording_stopped(&mut self) -> Option<Dispatch> {
        let audio = self.recording.finish()?;
        Some(self.dispatch(Request::Transcribe { audio }))
    }

    fn dispatch(&self, request: Request) -> Dispatch {
        Dispatch {
            backend: Arc::clone(&self.backend),
            view: Arc::clone(&self.view),
            request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::messages::Transcription;
    use crate::recorder::RecorderError;
    use crate::view::{ChatLog, Sender};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatBackend for CountingBackend {
        async fn query(&self, message: &str) -> Result<Reply, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Reply {
                response: Some(format!("echo: {}", message)),
                error: None,
            })
        }

        async fn vision_query(&self, _: &str, _: &Attachment) -> Result<Reply, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::default())
        }

        async fn voice_to_text(&self, _: &AudioClip) -> Result<Transcription, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Transcription::default())
        }
    }

    struct DeniedMicrophone;

    #[async_trait]
    impl Microphone for DeniedMicrophone {
        async fn start(&self) -> Result<(), RecorderError> {
            Err(RecorderError::PermissionDenied("denied".into()))
        }

        fn stop(&self) {}
    }

    fn controller() -> (ChatController, Arc<CountingBackend>, Arc<ChatLog>) {
        let backend = Arc::new(CountingBackend::default());
        let log = Arc::new(ChatLog::new());
        let controller = ChatController::new(
            backend.clone(),
            log.clone(),
            Arc::new(DeniedMicrophone),
        );
        (controller, backend, log)
    }

    fn image() -> Attachment {
        Attachment::new("leaf.jpg", "image/jpeg", vec![0xff, 0xd8])
    }

    #[test]
    fn empty_text_is_blocked() {
        let (mut controller, backend, log) = controller();
        assert!(controller.submit("   ").is_none());
        assert_eq!(log.alerts(), vec![EMPTY_MESSAGE]);
        assert!(log.entries().is_empty());
        assert_eq!(log.input_clears(), 0);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_description_keeps_the_attachment() {
        let (mut controller, backend, log) = controller();
        controller.select_attachment(image());
        assert!(controller.submit("").is_none());
        assert_eq!(log.alerts(), vec![EMPTY_IMAGE_DESCRIPTION]);
        assert!(controller.pending_attachment().is_some());
        assert_eq!(log.preview().as_deref(), Some("leaf.jpg"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn send_with_attachment_renders_image_entry_and_clears_state() {
        let (mut controller, _, log) = controller();
        controller.select_attachment(image());
        let dispatch = controller.submit(" is this blight? ").expect("send");

        match dispatch.request() {
            Request::Vision { text, image } => {
                assert_eq!(text, "is this blight?");
                assert_eq!(image.file_name, "leaf.jpg");
            }
            other => panic!("expected vision request, got {:?}", other),
        }
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sender, Sender::User);
        assert!(entries[0].image.is_some());
        assert!(controller.pending_attachment().is_none());
        assert_eq!(log.preview(), None);
        assert_eq!(log.input_clears(), 1);
    }

    #[test]
    fn shift_enter_does_not_send() {
        let (mut controller, _, log) = controller();
        let shift_enter = KeyPress {
            key: Key::Enter,
            shift: true,
        };
        assert!(controller.key_press(shift_enter, "hi").is_none());
        assert!(controller.key_press(KeyPress::enter(), "hi").is_some());
        assert_eq!(log.entries(), vec![ChatMessage::user("hi")]);
    }

    #[test]
    fn cancel_resets_picker_and_routes_to_query() {
        let (mut controller, _, log) = controller();
        controller.select_attachment(image());
        controller.cancel_attachment();
        assert_eq!(log.preview(), None);
        assert_eq!(log.picker_resets(), 1);

        let dispatch = controller.submit("hello").expect("send");
        assert_eq!(
            dispatch.request(),
            &Request::Query {
                message: "hello".into()
            }
        );
    }

    #[tokio::test]
    async fn denied_microphone_stays_idle() {
        let (mut controller, _, log) = controller();
        controller.toggle_recording().await;
        assert!(controller.recording().is_idle());
        assert!(!log.is_recording());
        assert_eq!(log.alerts(), vec![RECORDING_UNAVAILABLE]);
    }

    #[tokio::test]
    async fn dispatch_renders_reply() {
        let (mut controller, backend, log) = controller();
        controller.submit("maize prices").expect("send").run().await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            log.entries(),
            vec![
                ChatMessage::user("maize prices"),
                ChatMessage::bot("echo: maize prices")
            ]
        );
    }
}
