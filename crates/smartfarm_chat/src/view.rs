//! Chat log entries and the rendering surface the controller draws on.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::media::Attachment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn label(self) -> &'static str {
        match self {
            Sender::User => "User",
            Sender::Bot => "Bot",
        }
    }
}

/// One conversational turn. Text is optional only for image entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: Option<String>,
    pub image: Option<Arc<Attachment>>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn user_with_image(text: impl Into<String>, image: Arc<Attachment>) -> Self {
        Self {
            sender: Sender::User,
            text: Some(text.into()),
            image: Some(image),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: Some(text.into()),
            image: None,
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.sender.label())?;
        if let Some(image) = &self.image {
            write!(f, " [image: {}]", image.file_name)?;
        }
        if let Some(text) = &self.text {
            write!(f, " {}", text)?;
        }
        Ok(())
    }
}

/// Rendering surface driven by the controller. Methods take `&self` so a
/// view can be shared with in-flight requests that render their replies.
pub trait ChatView: Send + Sync {
    /// Append an entry to the log and scroll to it.
    fn append(&self, message: ChatMessage);

    /// Blocking notice for the user (validation and microphone failures).
    fn alert(&self, message: &str);

    fn clear_input(&self);

    /// Show the staged image with a cancel affordance.
    fn show_preview(&self, attachment: &Attachment);

    fn hide_preview(&self);

    /// Forget the picked file so the same file can be chosen again.
    fn reset_file_picker(&self);

    /// Flip the record button between microphone and stop icons.
    fn set_recording(&self, recording: bool);
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct LogState {
    entries: Vec<ChatMessage>,
    alerts: Vec<String>,
    scroll_position: usize,
    preview: Option<String>,
    input_clears: usize,
    picker_resets: usize,
    recording: bool,
}

/// In-memory view: keeps the whole log and the visible UI state so it can
/// be inspected.
#[derive(Debug, Default)]
pub struct ChatLog {
    state: Mutex<LogState>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ChatMessage> {
        lock(&self.state).entries.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        lock(&self.state).alerts.clone()
    }

    /// Index one past the last visible entry.
    pub fn scroll_position(&self) -> usize {
        lock(&self.state).scroll_position
    }

    /// File name of the previewed attachment, if the preview is visible.
    pub fn preview(&self) -> Option<String> {
        lock(&self.state).preview.clone()
    }

    pub fn input_clears(&self) -> usize {
        lock(&self.state).input_clears
    }

    pub fn picker_resets(&self) -> usize {
        lock(&self.state).picker_resets
    }

    pub fn is_recording(&self) -> bool {
        lock(&self.state).recording
    }
}

impl ChatView for ChatLog {
    fn append(&self, message: ChatMessage) {
        let mut state = lock(&self.state);
        state.entries.push(message);
        state.scroll_position = state.entries.len();
    }

    fn alert(&self, message: &str) {
        lock(&self.state).alerts.push(message.to_string());
    }

    fn clear_input(&self) {
        lock(&self.state).input_clears += 1;
    }

    fn show_preview(&self, attachment: &Attachment) {
        lock(&self.state).preview = Some(attachment.file_name.clone());
    }

    fn hide_preview(&self) {
        lock(&self.state).preview = None;
    }

    fn reset_file_picker(&self) {
        lock(&self.state).picker_resets += 1;
    }

    fn set_recording(&self, recording: bool) {
        lock(&self.state).recording = recording;
    }
}

/// Line-oriented view: entries and status lines go to `out`, alerts to `err`.
pub struct TerminalView<O, E> {
    out: Mutex<O>,
    err: Mutex<E>,
}

impl TerminalView<std::io::Stdout, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<O: Write + Send, E: Write + Send> TerminalView<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    fn line(&self, text: &str) {
        let mut out = lock(&self.out);
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }
}

impl<O: Write + Send, E: Write + Send> ChatView for TerminalView<O, E> {
    fn append(&self, message: ChatMessage) {
        self.line(&message.to_string());
    }

    fn alert(&self, message: &str) {
        let mut err = lock(&self.err);
        let _ = writeln!(err, "! {}", message);
        let _ = err.flush();
    }

    fn clear_input(&self) {}

    fn show_preview(&self, attachment: &Attachment) {
        self.line(&format!(
            "(attached {}, /cancel to remove)",
            attachment.file_name
        ));
    }

    fn hide_preview(&self) {}

    fn reset_file_picker(&self) {}

    fn set_recording(&self, recording: bool) {
        if recording {
            self.line("(recording, /stop to finish)");
        } else {
            self.line("(recording stopped)");
        }
    }
}
