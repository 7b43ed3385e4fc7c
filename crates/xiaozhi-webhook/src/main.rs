use std::sync::Arc;

use anyhow::Context;
use llm_groq::GroqClient;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use xiaozhi_core::{ChatService, CompletionBackend, SystemEnv};
use xiaozhi_webhook::{InteractionHandler, SignatureVerifier, WebhookConfig, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xiaozhi_webhook=debug,xiaozhi_core=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WebhookConfig::from_env(&SystemEnv);

    let verifier = match &config.public_key {
        Some(hex) => Some(SignatureVerifier::from_hex(hex).context("Invalid DISCORD_PUBLIC_KEY")?),
        None => {
            warn!("DISCORD_PUBLIC_KEY not set; every interaction will be rejected");
            None
        }
    };

    let backend: Option<Arc<dyn CompletionBackend>> = match config.groq {
        Some(groq) => Some(Arc::new(GroqClient::new(groq))),
        None => {
            warn!("GROQ_API_KEY not set; chat commands will report the missing key");
            None
        }
    };

    let chat = Arc::new(ChatService::from_config(backend, &config.chat));
    info!(
        model = %config.chat.model,
        memory = ?chat.memory_mode(),
        "Chat service ready"
    );

    let handler = Arc::new(InteractionHandler::new(chat, verifier));
    serve(handler, config.port, shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
