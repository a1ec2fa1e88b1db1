use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_relay_bot::config::TOKEN_ENV;
use video_relay_bot::{bot, utils, Cli, Commands, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "video_relay_bot=debug"
    } else {
        "video_relay_bot=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run { token, cookies } => {
            let token = token
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} is not set. Export your Telegram bot token first.", TOKEN_ENV))?;

            let config = Config::load().await?;

            // Check for required external dependencies (non-fatal in Docker)
            let missing_deps = utils::check_dependencies(&config.app.yt_dlp_path).await;
            for dep in missing_deps {
                tracing::warn!("Dependency check warning: {} (continuing anyway)", dep);
            }

            bot::run(token, config, cookies).await?;
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Edit the config file to change settings:");
                println!("  {}", Config::config_path()?.display());
            }
        }
        Commands::Check => {
            let config = Config::load().await?;
            let missing_deps = utils::check_dependencies(&config.app.yt_dlp_path).await;
            if missing_deps.is_empty() {
                println!("All dependencies found.");
            } else {
                println!("Missing dependencies:");
                for dep in missing_deps {
                    println!("  • {}", dep);
                }
            }
        }
    }

    Ok(())
}
