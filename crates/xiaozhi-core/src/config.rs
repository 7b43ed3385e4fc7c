//! Chat behaviour settings shared by the bot and the webhook.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::completion::DEFAULT_TEMPERATURE;
use crate::env::ReadEnv;
use crate::history::HistoryLimits;

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Whether conversation memory is kept between requests.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemoryMode {
    /// Full per-user history store.
    #[default]
    Persistent,
    /// Every request starts from an empty history and nothing is recorded.
    Stateless,
}

impl FromStr for MemoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "persistent" | "memory" | "on" => Ok(Self::Persistent),
            "stateless" | "off" | "none" => Ok(Self::Stateless),
            other => Err(format!("unknown memory mode '{}'", other)),
        }
    }
}

/// Settings for how chat requests are shaped and sent.
///
/// Resolved from environment variables:
/// - `GROQ_MODEL`: completion model (default: `llama-3.3-70b-versatile`)
/// - `XIAOZHI_TEMPERATURE`: sampling temperature (default: 0.7)
/// - `XIAOZHI_TIMEOUT_SECS`: completion deadline in seconds (default: 30)
/// - `XIAOZHI_HISTORY_MAX_TURNS`: turns kept per user (default: 10)
/// - `XIAOZHI_HISTORY_MAX_TOKENS`: approximate tokens kept per user (default: 2000)
/// - `XIAOZHI_MEMORY`: `persistent` or `stateless` (default: `persistent`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub history: HistoryLimits,
    #[serde(default)]
    pub memory: MemoryMode,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            history: HistoryLimits::default(),
            memory: MemoryMode::default(),
        }
    }
}

impl ChatConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Self {
        let mut config = Self::default();
        config.apply_env(env);
        config
    }

    /// Override the fields whose variables are set, keeping the rest.
    ///
    /// Blank or unparseable values are ignored.
    pub fn apply_env<E: ReadEnv>(&mut self, env: &E) {
        if let Some(model) = env.var("GROQ_MODEL").ok().filter(|v| !v.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
        if let Some(temperature) = parsed(env, "XIAOZHI_TEMPERATURE") {
            self.temperature = temperature;
        }
        if let Some(secs) = parsed(env, "XIAOZHI_TIMEOUT_SECS").filter(|secs| *secs > 0) {
            self.timeout_secs = secs;
        }
        if let Some(max_turns) = parsed(env, "XIAOZHI_HISTORY_MAX_TURNS") {
            self.history.max_turns = max_turns;
        }
        if let Some(max_tokens) = parsed(env, "XIAOZHI_HISTORY_MAX_TOKENS") {
            self.history.max_tokens = max_tokens;
        }
        if let Some(memory) = parsed(env, "XIAOZHI_MEMORY") {
            self.memory = memory;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parsed<E: ReadEnv, T: FromStr>(env: &E, key: &str) -> Option<T> {
    env.var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
