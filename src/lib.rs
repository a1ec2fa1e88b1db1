//! Video Relay Bot - A Telegram bot that relays videos from YouTube, Instagram, TikTok and more
//!
//! This library accepts a media URL from a chat, resolves and downloads it with yt-dlp,
//! and uploads the resulting file back to the chat while reporting progress on a single
//! status message. Temporary files (downloads and cookie files) never outlive a request.

pub mod bot;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod handler;
pub mod progress;
pub mod transport;
pub mod utils;

pub use bot::{BotRuntime, HandlerSettings};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{FetchOptions, FormatPolicy, MediaBackend, MediaInfo, OutputTemplate};
pub use handler::{handle_message, IncomingRequest, Outcome};
pub use progress::{Clock, ProgressObserver, ProgressReporter, SystemClock};
pub use transport::{ChatTransport, MessageRef, TransportError, VideoUpload};

/// Result type used by the binary and configuration layer
pub type Result<T> = anyhow::Result<T>;

/// Faults raised while handling a single request
#[derive(thiserror::Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Extract(#[from] extractors::ExtractError),

    #[error("Chat transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
}
