//! SmartFarm chat client library (backend protocol, chat controller, views).
//! Used by the `smartfarm-chat` terminal front-end.

pub mod client;
pub mod config;
pub mod controller;
pub mod media;
pub mod messages;
pub mod recorder;
pub mod view;

pub use client::{ChatBackend, ClientError, HttpClient};
pub use config::{default_config_path, Config, ConfigError, ServerSection};
pub use controller::{ChatController, Dispatch, Key, KeyPress, Request};
pub use media::{Attachment, AttachmentError, AudioClip};
pub use recorder::{CaptureEvent, FileMicrophone, Microphone, RecorderError, RecordingSession};
pub use view::{ChatLog, ChatMessage, ChatView, Sender, TerminalView};
