//! Seam between the chat core and the hosted completion API.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::Turn;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// One call to the completion API.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Failure reported by a completion backend, before classification.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The API answered with a non-success status.
    #[error("completion API returned HTTP {status}: {message}")]
    Api {
        status: u16,
        /// Structured error code from the response body, when present
        /// (e.g. `invalid_api_key`, `rate_limit_exceeded`).
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response.
    #[error("completion transport error: {0}")]
    Transport(String),

    /// A response arrived but could not be understood.
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

impl CompletionError {
    pub fn api(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.map(str::to_owned),
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// A hosted large-language-model text generator.
///
/// Implementations must not retry on their own; classification and user-facing
/// messaging happen in the chat service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate a complete reply.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    /// Generate a reply, sending each text fragment through `chunk_tx` as it
    /// arrives, and return the concatenated text once the stream ends.
    ///
    /// Sending is best-effort: a closed receiver must not fail the call.
    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<String, CompletionError>;
}
