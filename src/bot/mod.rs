use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;

use crate::config::Config;
use crate::extractors::{MediaBackend, YtDlpBackend};
use crate::handler::{handle_message, IncomingRequest};
use crate::progress::{Clock, SystemClock};
use crate::transport::{ChatTransport, TelegramTransport};
use crate::Result;

/// Per-request limits and scratch locations
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub downloads_dir: PathBuf,
    pub cookies_dir: PathBuf,
    /// Cookie file contents, written to a per-request file when present
    pub cookies: Option<String>,
    pub max_file_size: u64,
    pub progress_interval: Duration,
}

impl HandlerSettings {
    pub fn from_config(config: &Config, cookies: Option<String>) -> Self {
        Self {
            downloads_dir: config.app.downloads_dir.clone(),
            cookies_dir: config.cookies_dir(),
            cookies,
            max_file_size: config.bot.max_file_size_bytes,
            progress_interval: Duration::from_secs(config.bot.progress_interval_secs),
        }
    }
}

/// Everything a handler needs, passed explicitly to every request
pub struct BotRuntime {
    pub transport: Arc<dyn ChatTransport>,
    pub backend: Arc<dyn MediaBackend>,
    pub clock: Arc<dyn Clock>,
    pub settings: HandlerSettings,
}

impl BotRuntime {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        backend: Arc<dyn MediaBackend>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            transport,
            backend,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Connect to Telegram and handle messages until Ctrl-C
pub async fn run(token: String, config: Config, cookies: Option<String>) -> Result<()> {
    fs_err::create_dir_all(&config.app.downloads_dir)
        .context("Failed to create downloads directory")?;

    let transport = TelegramTransport::new(Bot::new(token));
    let bot = transport.bot().clone();
    let backend = YtDlpBackend::new(config.app.yt_dlp_path.clone(), config.app.max_concurrent_jobs);

    if cookies.is_some() {
        tracing::info!("Cookie file contents configured, authenticated extraction enabled");
    }

    let runtime = Arc::new(BotRuntime::new(
        Arc::new(transport),
        Arc::new(backend),
        HandlerSettings::from_config(&config, cookies),
    ));

    let handler = Update::filter_message().endpoint(|msg: Message, runtime: Arc<BotRuntime>| async move {
        let request = IncomingRequest {
            text: msg.text().map(str::to_string),
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
        };
        handle_message(&runtime, request).await;
        respond(())
    });

    tracing::info!("Bot is running...");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![runtime])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("Bot stopped");
    Ok(())
}
