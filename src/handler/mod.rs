use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bot::BotRuntime;
use crate::extractors::{
    exceeds_ceiling, resolve_artifact, ArtifactScope, CookieFile, FetchOptions, FormatPolicy, OutputTemplate,
    MERGE_OUTPUT_FORMAT,
};
use crate::progress::{spawn_status_updater, ProgressReporter, ProgressThrottle};
use crate::transport::{MessageRef, TransportError, VideoUpload};
use crate::utils::{format_duration, format_file_size, is_valid_url};
use crate::BotError;

pub mod messages;

/// An inbound chat message
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub text: Option<String>,
    pub chat_id: i64,
    pub message_id: i32,
}

impl IncomingRequest {
    /// Key shared by every temporary file this request creates
    pub fn scratch_key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.chat_id,
            self.message_id,
            &Uuid::new_v4().simple().to_string()[..8]
        )
    }
}

/// How a pipeline run ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The video was uploaded and the status message removed
    Delivered,
    /// The size check rejected the video before any download
    TooLarge { size: u64 },
}

/// Handle one message from a chat
pub async fn handle_message(runtime: &BotRuntime, request: IncomingRequest) {
    let transport = &runtime.transport;

    if let Some(command) = request.text.as_deref().and_then(|t| t.strip_prefix('/')) {
        let command = command.split(['@', ' ']).next().unwrap_or_default();
        if matches!(command, "start" | "help") {
            if let Err(e) = transport.reply(request.chat_id, request.message_id, messages::GREETING).await {
                tracing::error!("Failed to send greeting to chat {}: {}", request.chat_id, e);
            }
            return;
        }
    }

    let url = match request.text.as_deref() {
        Some(text) if is_valid_url(text) => text.to_string(),
        _ => {
            tracing::debug!("Ignoring non-URL message in chat {}", request.chat_id);
            if let Err(e) = transport.reply(request.chat_id, request.message_id, messages::INVALID_LINK).await {
                tracing::warn!("Failed to reply to chat {}: {}", request.chat_id, e);
            }
            return;
        }
    };

    let status = match transport.reply(request.chat_id, request.message_id, messages::PROCESSING).await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!("Failed to post status message for URL {}: {}", url, e);
            return;
        }
    };

    match run_pipeline(runtime, &request, &url, status).await {
        Ok(Outcome::Delivered) => {
            tracing::info!(chat_id = request.chat_id, "Delivered video for URL: {}", url);
        }
        Ok(Outcome::TooLarge { size }) => {
            tracing::info!(
                chat_id = request.chat_id,
                "Rejected URL {}: {} exceeds the size limit",
                url,
                format_file_size(size)
            );
        }
        Err(e) => {
            tracing::error!(chat_id = request.chat_id, error = ?e, "Failed to process URL {}: {}", url, e);
            if let Err(edit_error) = transport.edit(status, &messages::failure(&e)).await {
                tracing::error!("Failed to report error to chat {}: {}", request.chat_id, edit_error);
            }
        }
    }
}

/// Steps after the status message exists: cookies, probes, size check, download, upload.
///
/// Temporary files are owned by guards local to this function and are removed on every
/// return path, including early rejection and errors.
async fn run_pipeline(
    runtime: &BotRuntime,
    request: &IncomingRequest,
    url: &str,
    status: MessageRef,
) -> Result<Outcome, BotError> {
    let settings = &runtime.settings;
    let transport = &runtime.transport;
    let backend = &runtime.backend;
    let key = request.scratch_key();

    let cookies = CookieFile::provision(settings.cookies.as_deref(), &settings.cookies_dir, &key)?;
    let mut artifacts = ArtifactScope::new(OutputTemplate::new(&settings.downloads_dir, &key));
    let cookie_file = cookies.as_ref().map(|c| c.path().to_path_buf());

    set_status(runtime, status, messages::FETCHING_INFO).await?;
    let info_options = FetchOptions {
        cookie_file: cookie_file.clone(),
        ..FetchOptions::default()
    };
    let info = backend.probe(url, &info_options).await?;
    let policy = FormatPolicy::for_extractor(&info.extractor_key);
    tracing::debug!(
        extractor = %info.extractor_key,
        policy = ?policy,
        duration = ?info.duration.map(|d| format_duration(d.num_seconds() as f64)),
        "Resolved {}",
        url
    );

    let options = FetchOptions {
        format: Some(policy.selector().to_string()),
        output: Some(artifacts.template().clone()),
        cookie_file,
    };
    let sized = backend.probe(url, &options).await?;
    let size = sized.size_estimate();
    if exceeds_ceiling(size, settings.max_file_size) {
        let size = size.unwrap_or_default();
        set_status(runtime, status, &messages::too_large(size, settings.max_file_size)).await?;
        return Ok(Outcome::TooLarge { size });
    }

    set_status(runtime, status, messages::DOWNLOADING).await?;
    let reported = backend.download(url, &options).await?;
    artifacts.adopt(reported.clone());
    let path = resolve_artifact(&reported, MERGE_OUTPUT_FORMAT)?;
    artifacts.adopt(path.clone());

    set_status(runtime, status, messages::UPLOADING).await?;
    upload(runtime, request, status, path, caption_for(info.title.as_deref())).await?;

    if let Err(e) = transport.delete(status).await {
        tracing::warn!("Failed to delete status message in chat {}: {}", status.chat_id, e);
    }

    Ok(Outcome::Delivered)
}

async fn upload(
    runtime: &BotRuntime,
    request: &IncomingRequest,
    status: MessageRef,
    path: PathBuf,
    caption: String,
) -> Result<(), BotError> {
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let throttle = ProgressThrottle::new(Arc::clone(&runtime.clock), runtime.settings.progress_interval);
    let reporter = ProgressReporter::new(throttle, updates_tx);
    let updater = spawn_status_updater(Arc::clone(&runtime.transport), status, updates_rx);

    let upload = VideoUpload {
        chat_id: request.chat_id,
        path,
        caption,
        reply_to: Some(request.message_id),
    };
    let sent = runtime.transport.send_video(upload, Box::new(reporter)).await;

    // No progress edit may land after the status message is replaced or deleted
    updater.abort();
    if let Err(e) = updater.await {
        if e.is_panic() {
            tracing::error!("Progress updater for chat {} panicked: {}", status.chat_id, e);
        }
    }

    sent.map_err(BotError::from)
}

/// Edit the status message; an unchanged text is not an error
async fn set_status(runtime: &BotRuntime, status: MessageRef, text: &str) -> Result<(), BotError> {
    match runtime.transport.edit(status, text).await {
        Ok(()) | Err(TransportError::NotModified) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn caption_for(title: Option<&str>) -> String {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(messages::DEFAULT_CAPTION)
        .to_string()
}
