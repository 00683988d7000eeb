//! smartfarm-chat: terminal front-end for the SmartFarm assistant.
//! With a question argument it sends one query and prints the reply;
//! otherwise it reads chat lines and `/commands` from stdin until EOF.

use clap::{Parser, ValueEnum};
use futures_util::stream::{FuturesUnordered, StreamExt};
use smartfarm_chat::config::{self, Config, ConfigError, CONFIG_ENV};
use smartfarm_chat::{
    Attachment, CaptureEvent, ChatController, FileMicrophone, HttpClient, TerminalView,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "smartfarm-chat")]
#[command(about = "Chat with the SmartFarm assistant: text, images and voice")]
#[command(version)]
struct Cli {
    /// Config file (default: $SMARTFARM_CHAT_CONFIG or ~/.smartfarm-chat/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides server.base_url
    #[arg(long)]
    server: Option<String>,

    /// Log level written to stderr (default: $RUST_LOG or warn)
    #[arg(short = 'l', long, value_enum)]
    log_level: Option<LogLevel>,

    /// Send this one question and exit
    question: Option<String>,
}

/// One line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Send(&'a str),
    Image(&'a str),
    Cancel,
    Record(&'a str),
    Stop,
    Quit,
    Invalid(String),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Command::Send(line);
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest.trim_end(), ""),
        };
        match (name, arg) {
            ("image", "") => Command::Invalid("usage: /image <path>".into()),
            ("image", path) => Command::Image(path),
            ("cancel", _) => Command::Cancel,
            ("record", "") => Command::Invalid("usage: /record <wav path>".into()),
            ("record", path) => Command::Record(path),
            ("stop", _) => Command::Stop,
            ("quit", _) => Command::Quit,
            (other, _) => Command::Invalid(format!("unknown command /{}", other)),
        }
    }
}

fn init_tracing(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::default().add_directive(LevelFilter::from(level).into()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    // 1. --config <path> flag
    if let Some(path) = explicit {
        return config::load(path);
    }
    // 2. SMARTFARM_CHAT_CONFIG env var
    if let Ok(val) = std::env::var(CONFIG_ENV) {
        return config::load(Path::new(&val));
    }
    // 3. Default path (~/.smartfarm-chat/config.yaml), optional
    match config::default_config_path() {
        Some(path) => config::load_or_default(&path),
        None => Ok(Config::default()),
    }
}

async fn run(question: Option<String>, backend: HttpClient) -> i32 {
    let view = Arc::new(TerminalView::stdio());
    let (capture_tx, mut capture_rx) = mpsc::unbounded_channel();
    let microphone = Arc::new(FileMicrophone::new(capture_tx));
    let mut controller = ChatController::new(Arc::new(backend), view, microphone.clone());

    if let Some(question) = question {
        return match controller.submit(&question) {
            Some(dispatch) => {
                dispatch.run().await;
                0
            }
            None => 1,
        };
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = FuturesUnordered::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("Error: failed to read stdin: {}", e);
                        break;
                    }
                };
                match Command::parse(&line) {
                    Command::Send(text) => {
                        if let Some(dispatch) = controller.submit(text) {
                            in_flight.push(dispatch.run());
                        }
                    }
                    Command::Image(path) => match Attachment::from_path(Path::new(path)) {
                        Ok(attachment) => controller.select_attachment(attachment),
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    Command::Cancel => controller.cancel_attachment(),
                    Command::Record(path) => {
                        if controller.recording().is_idle() {
                            microphone.set_source(path);
                        }
                        controller.toggle_recording().await;
                    }
                    Command::Stop => {
                        if controller.recording().is_recording() {
                            controller.toggle_recording().await;
                        }
                    }
                    Command::Quit => break,
                    Command::Invalid(msg) => eprintln!("Error: {}", msg),
                }
            }
            Some(event) = capture_rx.recv() => match event {
                CaptureEvent::Chunk(chunk) => controller.audio_chunk(chunk),
                CaptureEvent::Stopped => {
                    if let Some(dispatch) = controller.recording_stopped() {
                        in_flight.push(dispatch.run());
                    }
                }
            },
            Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
        }
    }

    // A recording still open at EOF is finished and sent like any other.
    if controller.recording().is_recording() {
        controller.toggle_recording().await;
    }
    while !controller.recording().is_idle() {
        match capture_rx.recv().await {
            Some(CaptureEvent::Chunk(chunk)) => controller.audio_chunk(chunk),
            Some(CaptureEvent::Stopped) => {
                if let Some(dispatch) = controller.recording_stopped() {
                    in_flight.push(dispatch.run());
                }
            }
            None => break,
        }
    }
    while in_flight.next().await.is_some() {}
    0
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    let mut cfg = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to load config: {}", e);
            process::exit(1);
        }
    };
    if let Some(server) = cli.server {
        cfg.server.base_url = Some(server);
    }

    let backend = match HttpClient::new(cfg.base_url()) {
        Ok(client) => client.with_language(cfg.server.language.clone()),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    let code = rt.block_on(run(cli.question, backend));
    process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_sent_verbatim() {
        assert_eq!(Command::parse("how much rain?"), Command::Send("how much rain?"));
        assert_eq!(Command::parse(""), Command::Send(""));
    }

    #[test]
    fn slash_commands_take_arguments() {
        assert_eq!(Command::parse("/image  leaf.png "), Command::Image("leaf.png"));
        assert_eq!(Command::parse("/record voice.wav"), Command::Record("voice.wav"));
        assert_eq!(Command::parse("/cancel"), Command::Cancel);
        assert_eq!(Command::parse("/stop"), Command::Stop);
        assert_eq!(Command::parse("/quit"), Command::Quit);
    }

    #[test]
    fn missing_argument_or_unknown_command_is_invalid() {
        assert!(matches!(Command::parse("/image"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/record "), Command::Invalid(_)));
        assert_eq!(
            Command::parse("/weather"),
            Command::Invalid("unknown command /weather".into())
        );
    }
}
