mod config;

use crate::config::ParleyConfig;
use clap::{Parser, Subcommand, ValueEnum};
use parley_agent::{build_backend, LlmBackend};
use parley_channels::{TelegramChannel, UserFilter};
use parley_engine::SessionEngine;
use parley_session::InMemorySessionStore;
use parley_voice::{FfmpegTranscoder, HttpSpeechSynthesizer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley", version, about = "Telegram chat bot with streamed text and voice replies")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "parley.toml")]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Validate the configuration and print it with secrets hidden
    Check,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Ok(path) = dotenvy::dotenv() {
        info!(path = %path.display(), "Loaded environment file");
    }

    let mut config = ParleyConfig::load(&cli.config).await?;
    config.apply_env(|name| std::env::var(name).ok());

    match cli.command {
        Commands::Check => {
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            println!("\nConfiguration OK");
        }
        Commands::Run => {
            config.validate()?;
            run(config).await?;
        }
    }

    Ok(())
}

async fn run(config: ParleyConfig) -> anyhow::Result<()> {
    let token = config
        .bot_token()
        .ok_or_else(|| anyhow::anyhow!("BOT_TOKEN is not set"))?
        .to_string();

    let filter = UserFilter::from_entries(&config.telegram.allowed_users);
    if filter.is_open() {
        warn!("Whole world can talk to your bot. Consider adding your ID to ALLOWED_USERS to make it private");
    } else {
        info!(allowed = ?filter.describe(), "Allowed users");
    }

    let mut channel = TelegramChannel::new(token, filter, config.telegram.event_buffer);
    if let Some(base) = &config.telegram.api_base {
        channel = channel.with_api_base(base.clone());
    }
    let events = channel
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("event receiver already taken"))?;

    if let Err(e) = channel.register_commands().await {
        warn!(error = %e, "Could not register bot commands");
    }

    let transcoder = FfmpegTranscoder::new(config.transcoder.clone());
    if let Err(e) = transcoder.probe_installation().await {
        warn!(error = %e, "ffmpeg unavailable, voice replies will fail");
    }

    info!(
        provider = ?config.model.provider,
        base_url = config.model.base_url(),
        model = %config.model.model_id,
        "Generation backend"
    );
    let backend: Arc<dyn LlmBackend> = Arc::from(build_backend(config.model.clone()));
    let store = Arc::new(InMemorySessionStore::new(config.engine.history_limit));
    let engine = Arc::new(SessionEngine::new(
        config.engine,
        store,
        backend,
        Arc::new(HttpSpeechSynthesizer::new(config.speech)),
        Arc::new(transcoder),
    ));

    let channel = Arc::new(channel);
    let poller = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.poll_updates().await })
    };

    info!("Bot started");
    tokio::select! {
        () = engine.serve(events, channel.clone()) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    poller.abort();

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn about_text_is_plain() {
        let command = Cli::command();
        let about = command.get_about().unwrap().to_string();
        assert_eq!(about, "Telegram chat bot with streamed text and voice replies");
        assert!(about.is_ascii());
    }

    #[test]
    fn parses_check_with_pretty_logs() {
        let cli = Cli::try_parse_from(["parley", "--log-format", "pretty", "-c", "bot.toml", "check"]).unwrap();
        assert!(matches!(cli.command, Commands::Check));
        assert!(matches!(cli.log_format, LogFormat::Pretty));
        assert_eq!(cli.config, PathBuf::from("bot.toml"));
    }
}
