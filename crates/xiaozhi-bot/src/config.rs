//! Configuration management for xiaozhi-bot

#[path = "config_tests.rs"]
mod config_tests;

use std::fs;
use std::time::Duration;

use llm_groq::GroqConfig;
use llm_groq::config::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use xiaozhi_core::ChatConfig;
use xiaozhi_core::env::ReadEnv;
use xiaozhi_core::streaming::DEFAULT_RENDER_INTERVAL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Complete bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordSection,
    #[serde(default)]
    pub groq: GroqSection,
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Discord gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordSection {
    /// Bot token from the Discord developer portal
    #[serde(default)]
    pub bot_token: String,
    /// Edit a placeholder followup while the reply is generated
    #[serde(default = "default_streaming")]
    pub streaming: bool,
    /// Milliseconds between placeholder edits
    #[serde(default = "default_stream_interval_ms")]
    pub stream_interval_ms: u64,
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            streaming: default_streaming(),
            stream_interval_ms: default_stream_interval_ms(),
        }
    }
}

impl DiscordSection {
    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms.max(1))
    }
}

/// Groq API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqSection {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for GroqSection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Overlay environment variables on an already-loaded configuration
    /// (the file, or [`Config::default`] when there is none).
    ///
    /// Only variables that are set (and parse) replace a value: `DISCORD_TOKEN`,
    /// `GROQ_API_KEY`, `GROQ_BASE_URL`, `XIAOZHI_STREAMING`,
    /// `XIAOZHI_STREAM_INTERVAL_MS` and the chat settings read by
    /// [`ChatConfig::apply_env`].
    pub fn apply_env<E: ReadEnv>(&mut self, env: &E) {
        if let Some(token) = non_empty(env, "DISCORD_TOKEN") {
            self.discord.bot_token = token;
        }
        if let Some(streaming) = env.var("XIAOZHI_STREAMING").ok().and_then(|v| parse_bool(&v)) {
            self.discord.streaming = streaming;
        }
        if let Some(ms) = env
            .var("XIAOZHI_STREAM_INTERVAL_MS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .filter(|ms: &u64| *ms > 0)
        {
            self.discord.stream_interval_ms = ms;
        }
        if let Some(api_key) = non_empty(env, "GROQ_API_KEY") {
            self.groq.api_key = api_key;
        }
        if let Some(base_url) = non_empty(env, "GROQ_BASE_URL") {
            self.groq.base_url = base_url;
        }
        self.chat.apply_env(env);
    }

    /// Both credentials must be present before connecting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.bot_token.trim().is_empty() {
            return Err(ConfigError::Missing("DISCORD_TOKEN"));
        }
        if self.groq.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("GROQ_API_KEY"));
        }
        Ok(())
    }

    pub fn groq_config(&self) -> GroqConfig {
        GroqConfig::new(self.groq.api_key.trim())
            .with_base_url(self.groq.base_url.trim_end_matches('/'))
    }
}

fn non_empty<E: ReadEnv>(env: &E, key: &str) -> Option<String> {
    env.var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_streaming() -> bool {
    true
}

fn default_stream_interval_ms() -> u64 {
    DEFAULT_RENDER_INTERVAL.as_millis() as u64
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
