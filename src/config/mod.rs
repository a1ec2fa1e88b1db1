use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the Telegram bot token
pub const TOKEN_ENV: &str = "BOT_TOKEN";

/// Environment variable holding Netscape-format cookie file contents
pub const COOKIES_ENV: &str = "YTDLP_COOKIES";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Request handling limits
    pub bot: BotConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Videos larger than this are rejected before downloading
    pub max_file_size_bytes: u64,

    /// Minimum seconds between two upload progress edits
    pub progress_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scratch directory for downloads
    pub downloads_dir: PathBuf,

    /// Directory for per-request cookie files (system temp dir if not set)
    pub cookies_dir: Option<PathBuf>,

    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Maximum yt-dlp processes running at once
    pub max_concurrent_jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                max_file_size_bytes: 1024 * 1024 * 1024,
                progress_interval_secs: crate::progress::DEFAULT_PROGRESS_INTERVAL.as_secs(),
            },
            app: AppConfig {
                downloads_dir: PathBuf::from("downloads"),
                cookies_dir: None,
                yt_dlp_path: "yt-dlp".to_string(),
                max_concurrent_jobs: 3,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("video-relay-bot").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.bot.max_file_size_bytes == 0 {
            anyhow::bail!("bot.max_file_size_bytes must be greater than zero");
        }

        if self.bot.progress_interval_secs == 0 {
            anyhow::bail!("bot.progress_interval_secs must be greater than zero");
        }

        if self.app.max_concurrent_jobs == 0 {
            anyhow::bail!("app.max_concurrent_jobs must be at least 1");
        }

        if self.app.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("app.yt_dlp_path must not be empty");
        }

        Ok(())
    }

    /// Directory for cookie files
    pub fn cookies_dir(&self) -> PathBuf {
        self.app.cookies_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Max File Size: {}", crate::utils::format_file_size(self.bot.max_file_size_bytes));
        println!("  Progress Interval: {}s", self.bot.progress_interval_secs);
        println!("  Downloads Directory: {}", self.app.downloads_dir.display());
        println!("  Cookies Directory: {}", self.cookies_dir().display());
        println!("  yt-dlp: {}", self.app.yt_dlp_path);
        println!("  Max Concurrent Jobs: {}", self.app.max_concurrent_jobs);
    }
}
