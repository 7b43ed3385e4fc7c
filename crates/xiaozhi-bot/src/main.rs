//! Xiaozhi Discord bot
//!
//! Gateway bot answering the `/小智` slash command with Groq completions,
//! remembering a bounded per-user conversation and forgetting it on
//! `/清除記憶`.

mod commands;
mod config;
mod handlers;
mod health;
mod reply;
mod streaming;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use llm_groq::GroqClient;
use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xiaozhi_core::{ChatService, CompletionBackend, SystemEnv};

use crate::config::Config;
use crate::handlers::Handler;
use crate::health::AppState;

/// Xiaozhi Discord bot CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/xiaozhi-bot.toml")]
    config: String,

    /// Discord bot token (overrides config file)
    #[arg(long, env = "DISCORD_TOKEN")]
    bot_token: Option<String>,

    /// Groq API key (overrides config file)
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    groq_api_key: Option<String>,

    /// Completion model (overrides config file)
    #[arg(long, env = "GROQ_MODEL")]
    model: Option<String>,

    /// Disable progressive reply editing
    #[arg(long)]
    no_streaming: bool,

    /// Health check server port
    #[arg(long, env = "HEALTH_CHECK_PORT", default_value = "3001")]
    health_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env is normal; anything else is worth a note once logging is up.
        if !e.not_found() {
            eprintln!("Failed to load .env: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xiaozhi_bot=debug,xiaozhi_core=debug,llm_groq=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Xiaozhi bot");

    let args = Args::parse();

    // Load configuration: file (when present), then environment, then CLI flags
    let mut config = if std::path::Path::new(&args.config).exists() {
        info!("Loading config from file: {}", args.config);
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using environment and defaults");
        Config::default()
    };
    config.apply_env(&SystemEnv);

    if let Some(bot_token) = args.bot_token {
        config.discord.bot_token = bot_token;
    }
    if let Some(api_key) = args.groq_api_key {
        config.groq.api_key = api_key;
    }
    if let Some(model) = args.model {
        config.chat.model = model;
    }
    if args.no_streaming {
        config.discord.streaming = false;
    }
    config.validate()?;

    let backend: Arc<dyn CompletionBackend> = Arc::new(GroqClient::new(config.groq_config()));
    let chat = Arc::new(ChatService::from_config(Some(backend), &config.chat));
    info!(
        "Chat service ready: model={} memory={:?} streaming={}",
        config.chat.model,
        chat.memory_mode(),
        config.discord.streaming
    );

    let health_state = AppState::new(chat.clone());
    let handler = Handler::new(
        chat,
        health_state.clone(),
        config.discord.streaming,
        config.discord.stream_interval(),
    );

    let intents = GatewayIntents::GUILDS;
    let mut client = Client::builder(&config.discord.bot_token, intents)
        .event_handler(handler)
        .await
        .context("Failed to create Discord client")?;

    // Start health check server
    let health_port = args.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_state, health_port).await {
            error!("Health server error: {}", e);
        }
    });

    // Graceful shutdown: close all shards on SIGTERM or Ctrl+C.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping Discord client...");
        shard_manager.shutdown_all().await;
    });

    info!("Starting Discord gateway connection...");

    // Blocks until all shards are stopped
    client.start().await.context("Discord client error")?;

    info!("Xiaozhi bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
