use clap::{Parser, Subcommand};

use crate::config::{COOKIES_ENV, TOKEN_ENV};

#[derive(Parser)]
#[command(
    name = "video-relay-bot",
    about = "Video Relay Bot - Download videos from YouTube, Instagram, TikTok and more straight into Telegram",
    version,
    long_about = "A Telegram bot that accepts a video link, downloads it with yt-dlp and sends the file back to the chat, reporting progress on a single status message."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the bot (long polling)
    Run {
        /// Telegram bot token
        #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
        token: Option<String>,

        /// Netscape cookie file contents passed to yt-dlp for authenticated sites
        #[arg(long, env = COOKIES_ENV, hide_env_values = true)]
        cookies: Option<String>,
    },

    /// Show or locate the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check that yt-dlp and ffmpeg are installed
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_accepts_token_flag() {
        let cli = Cli::try_parse_from(["video-relay-bot", "run", "--token", "123:abc"]).unwrap();
        match cli.command {
            Commands::Run { token, .. } => assert_eq!(token.as_deref(), Some("123:abc")),
            _ => panic!("expected run command"),
        }
    }
}
