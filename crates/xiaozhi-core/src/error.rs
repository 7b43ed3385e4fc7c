//! Failure taxonomy for a chat request.
//!
//! Every variant maps to a fixed, plain-language message for the end user; raw
//! error text only ever reaches the logs.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, warn};

use crate::completion::CompletionError;

/// Why an inbound message was rejected before any API call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("message is empty")]
    Empty,

    #[error("message is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },
}

/// Coarse kind of a [`ChatError`], for logs and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Unconfigured,
    AuthFailure,
    RateLimited,
    ContextTooLong,
    Timeout,
    Unknown,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("completion API key is not configured")]
    Unconfigured,

    #[error("completion API rejected the credential: {0}")]
    AuthFailure(String),

    #[error("completion API rate limit or quota exceeded: {0}")]
    RateLimited(String),

    #[error("request exceeds the model context window: {0}")]
    ContextTooLong(String),

    #[error("completion did not finish within {0:?}")]
    Timeout(Duration),

    #[error("completion failed: {0}")]
    Unknown(String),
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Unconfigured => ErrorKind::Unconfigured,
            Self::AuthFailure(_) => ErrorKind::AuthFailure,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::ContextTooLong(_) => ErrorKind::ContextTooLong,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Text shown to the Discord user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(InputError::Empty) => "請輸入有效的訊息內容",
            Self::InvalidInput(InputError::TooLong { .. }) => "訊息長度不能超過 2000 字元",
            Self::Unconfigured => "🔐 API key 未設定，請檢查環境變數",
            Self::AuthFailure(_) => "🔐 API 驗證失敗，請檢查 API key 設定",
            Self::RateLimited(_) => "⚠️ API 使用量已達上限，請稍後再試",
            Self::ContextTooLong(_) => "📏 對話內容過長，請使用 /清除記憶 後再試",
            Self::Timeout(_) => "⏰ 抱歉，處理時間過長，請稍後再試",
            Self::Unknown(_) => "❌ 發生錯誤，請稍後再試",
        }
    }

    /// Classify a backend failure.
    ///
    /// Structured status codes and error codes win; otherwise the message text
    /// is matched against known keywords.
    pub fn from_completion(err: &CompletionError) -> Self {
        let detail = err.to_string();

        if let Some(kind) = classify_structured(err.status(), err.code()) {
            return kind.with_detail(detail);
        }

        let lowered = detail.to_lowercase();
        let kind = if lowered.contains("api_key") || lowered.contains("authentication") {
            ErrorKind::AuthFailure
        } else if lowered.contains("rate_limit") || lowered.contains("quota") {
            ErrorKind::RateLimited
        } else if lowered.contains("context_length")
            || lowered.contains("context length")
            || lowered.contains("maximum context")
        {
            ErrorKind::ContextTooLong
        } else {
            ErrorKind::Unknown
        };
        kind.with_detail(detail)
    }

    /// Log at a level matching the severity; unknown failures carry full detail.
    pub fn log(&self, user_id: &str) {
        match self {
            Self::InvalidInput(e) => warn!("Rejected input from user {}: {}", user_id, e),
            Self::Unknown(detail) => {
                error!("Chat request failed for user {}: {}", user_id, detail)
            }
            other => warn!(
                "Chat request failed for user {} [{:?}]: {}",
                user_id,
                other.kind(),
                other
            ),
        }
    }
}

impl From<CompletionError> for ChatError {
    fn from(err: CompletionError) -> Self {
        Self::from_completion(&err)
    }
}

impl ErrorKind {
    fn with_detail(self, detail: String) -> ChatError {
        match self {
            ErrorKind::AuthFailure => ChatError::AuthFailure(detail),
            ErrorKind::RateLimited => ChatError::RateLimited(detail),
            ErrorKind::ContextTooLong => ChatError::ContextTooLong(detail),
            _ => ChatError::Unknown(detail),
        }
    }
}

fn classify_structured(status: Option<u16>, code: Option<&str>) -> Option<ErrorKind> {
    match code {
        Some("invalid_api_key") => return Some(ErrorKind::AuthFailure),
        Some("rate_limit_exceeded") | Some("insufficient_quota") => {
            return Some(ErrorKind::RateLimited);
        }
        Some("context_length_exceeded") => return Some(ErrorKind::ContextTooLong),
        _ => {}
    }
    match status {
        Some(401) | Some(403) => Some(ErrorKind::AuthFailure),
        Some(429) => Some(ErrorKind::RateLimited),
        Some(413) => Some(ErrorKind::ContextTooLong),
        _ => None,
    }
}
