use async_trait::async_trait;
use std::path::PathBuf;

use crate::progress::ProgressObserver;

pub mod telegram;

pub use telegram::TelegramTransport;

/// A message in a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

impl MessageRef {
    pub fn new(chat_id: i64, message_id: i32) -> Self {
        Self { chat_id, message_id }
    }
}

/// A video to send back to a chat
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub chat_id: i64,
    pub path: PathBuf,
    pub caption: String,
    pub reply_to: Option<i32>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Edit with identical content, harmless
    #[error("Message is not modified")]
    NotModified,

    #[error("Request entity is too large")]
    EntityTooLarge,

    #[error("{0}")]
    Other(String),
}

/// Outbound side of the chat service
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a text message, threaded under `reply_to`
    async fn reply(&self, chat_id: i64, reply_to: i32, text: &str) -> Result<MessageRef, TransportError>;

    async fn edit(&self, message: MessageRef, text: &str) -> Result<(), TransportError>;

    async fn delete(&self, message: MessageRef) -> Result<(), TransportError>;

    /// Upload a video file, reporting read progress to `progress`
    async fn send_video(
        &self,
        upload: VideoUpload,
        progress: Box<dyn ProgressObserver>,
    ) -> Result<(), TransportError>;
}
