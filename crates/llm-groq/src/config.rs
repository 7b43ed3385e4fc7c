use xiaozhi_core::ReadEnv;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Connection settings for the Groq API.
///
/// Resolved from environment variables:
/// - `GROQ_API_KEY`: required; without it there is no backend at all
/// - `GROQ_BASE_URL`: API root (default: `https://api.groq.com/openai/v1`)
#[derive(Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub base_url: String,
}

impl std::fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GroqConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns `None` when `GROQ_API_KEY` is unset or blank.
    pub fn from_env<E: ReadEnv>(env: &E) -> Option<Self> {
        let api_key = env
            .var("GROQ_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())?;

        let base_url = env
            .var("GROQ_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Some(Self { api_key, base_url })
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}
