use async_trait::async_trait;
use teloxide::payloads::setters::*;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ReplyParameters};
use teloxide::{ApiError, RequestError};

use super::{ChatTransport, MessageRef, TransportError, VideoUpload};
use crate::progress::{ProgressObserver, ProgressReader};
use crate::utils::truncate_chars;

/// Telegram caption limit in characters
pub const MAX_CAPTION_CHARS: usize = 1024;

/// Telegram Bot API transport built on teloxide
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

/// Map teloxide failures onto the cases the handler distinguishes
pub fn classify_request_error(error: RequestError) -> TransportError {
    if let RequestError::Api(ApiError::MessageNotModified) = error {
        return TransportError::NotModified;
    }

    let text = error.to_string();
    let lower = text.to_lowercase();
    if lower.contains("too large") || lower.contains("too big") {
        TransportError::EntityTooLarge
    } else {
        TransportError::Other(text)
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn reply(&self, chat_id: i64, reply_to: i32, text: &str) -> Result<MessageRef, TransportError> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .reply_parameters(ReplyParameters::new(MessageId(reply_to)))
            .await
            .map_err(classify_request_error)?;

        Ok(MessageRef::new(chat_id, sent.id.0))
    }

    async fn edit(&self, message: MessageRef, text: &str) -> Result<(), TransportError> {
        self.bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .await
            .map_err(classify_request_error)?;
        Ok(())
    }

    async fn delete(&self, message: MessageRef) -> Result<(), TransportError> {
        self.bot
            .delete_message(ChatId(message.chat_id), MessageId(message.message_id))
            .await
            .map_err(classify_request_error)?;
        Ok(())
    }

    async fn send_video(
        &self,
        upload: VideoUpload,
        progress: Box<dyn ProgressObserver>,
    ) -> Result<(), TransportError> {
        let file = tokio::fs::File::open(&upload.path)
            .await
            .map_err(|e| TransportError::Other(format!("Cannot open {}: {}", upload.path.display(), e)))?;
        let total = file
            .metadata()
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?
            .len();

        let file_name = upload
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());
        let video = InputFile::read(ProgressReader::new(file, total, progress)).file_name(file_name);

        let mut request = self
            .bot
            .send_video(ChatId(upload.chat_id), video)
            .caption(truncate_chars(&upload.caption, MAX_CAPTION_CHARS))
            .supports_streaming(true);
        if let Some(reply_to) = upload.reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(reply_to)));
        }

        tracing::debug!("Uploading {} ({} bytes)", upload.path.display(), total);
        request.await.map_err(classify_request_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_modified_is_recognised() {
        assert_eq!(
            classify_request_error(RequestError::Api(ApiError::MessageNotModified)),
            TransportError::NotModified
        );
    }

    #[test]
    fn test_too_large_is_recognised() {
        let error = RequestError::Api(ApiError::Unknown("Bad Request: file is too big".to_string()));
        assert_eq!(classify_request_error(error), TransportError::EntityTooLarge);

        let error = RequestError::Api(ApiError::Unknown("Request Entity Too Large".to_string()));
        assert_eq!(classify_request_error(error), TransportError::EntityTooLarge);
    }

    #[test]
    fn test_other_errors_keep_their_text() {
        let error = RequestError::Api(ApiError::Unknown("Bad Request: chat not found".to_string()));
        assert!(matches!(classify_request_error(error), TransportError::Other(text) if text.contains("chat not found")));
    }
}
