use llm_groq::GroqConfig;
use xiaozhi_core::{ChatConfig, ReadEnv};

const DEFAULT_PORT: u16 = 8080;

/// Configuration for the interactions webhook.
///
/// Resolved from environment variables:
/// - `DISCORD_PUBLIC_KEY`: application public key, hex (every request is rejected with 500 without it)
/// - `XIAOZHI_WEBHOOK_PORT`: HTTP listening port (default: 8080)
/// - `GROQ_API_KEY` / `GROQ_BASE_URL`: see [`GroqConfig`]; a missing key answers chat commands with the unconfigured card
/// - Chat settings: see [`ChatConfig`]
pub struct WebhookConfig {
    pub public_key: Option<String>,
    pub port: u16,
    pub chat: ChatConfig,
    pub groq: Option<GroqConfig>,
}

impl WebhookConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Self {
        Self {
            public_key: env
                .var("DISCORD_PUBLIC_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            port: env
                .var("XIAOZHI_WEBHOOK_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            chat: ChatConfig::from_env(env),
            groq: GroqConfig::from_env(env),
        }
    }
}
