//! Telegram Broadcast Bot - main entry point
//!
//! Long-running bot process: inbound update dispatch plus the background
//! scheduler for queued posts.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use telegram_broadcaster::handlers::{handle_callback, handle_message};
use telegram_broadcaster::{metrics, AppState, Config, Scheduler, Storage, TelegramMessenger};

#[derive(Parser)]
#[command(name = "telegram_broadcaster")]
#[command(about = "Telegram broadcast & scheduling bot", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yml")]
    config: String,

    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("telegram_broadcaster=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = match Config::load_from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            warn!("Failed to load {}: {}. Using defaults", cli.config, err);
            Config::defaults()
        }
    };
    if config.bot_token.is_empty() {
        bail!("Bot token is not set (BOT_TOKEN env var or telegram.bot_token in config)");
    }

    let storage = Arc::new(
        Storage::open(&config.data_file, config.max_channels_per_user)
            .with_context(|| format!("Failed to open storage at {}", config.data_file))?,
    );

    let bot = Bot::new(config.bot_token.clone());
    let messenger = Arc::new(TelegramMessenger::new(bot.clone()));
    let config = Arc::new(config);

    let state = AppState::new(storage.clone(), messenger.clone(), config.clone());

    let scheduler = Scheduler::new(
        storage,
        messenger,
        config.check_interval,
        config.max_send_attempts,
    );
    scheduler.start();

    info!("🚀 Broadcast bot started");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let state = state.clone();
            move |bot: Bot, msg: Message| handle_message(bot, msg, state.clone())
        }))
        .branch(Update::filter_callback_query().endpoint({
            let state = state.clone();
            move |bot: Bot, q: CallbackQuery| handle_callback(bot, q, state.clone())
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    scheduler.stop();
    info!("👋 Broadcast bot stopped");

    Ok(())
}
