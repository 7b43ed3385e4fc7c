//! Presentation of replies and failures.
//!
//! A [`ReplyCard`] serializes to Discord's embed object, so the webhook can
//! return it verbatim and the gateway bot can translate it field by field.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::prompt::ASSISTANT_NAME;

/// Discord "blurple", used for successful replies.
pub const REPLY_COLOR: u32 = 0x5865F2;

/// Used for every failure card.
pub const ERROR_COLOR: u32 = 0xFF0000;

/// Longest reply body, in characters.
pub const MAX_REPLY_CHARS: usize = 2000;

const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardFooter {
    pub text: String,
}

/// A colored card with an author label, body text and optional footer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyCard {
    pub description: String,
    pub color: u32,
    pub author: CardAuthor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<CardFooter>,
}

impl ReplyCard {
    /// Card for a successful completion: truncated body plus elapsed time.
    pub fn success(text: &str, elapsed: Duration) -> Self {
        Self {
            description: truncate_reply(text),
            color: REPLY_COLOR,
            author: default_author(),
            footer: Some(CardFooter {
                text: format_elapsed(elapsed),
            }),
        }
    }

    /// Red card carrying only the user-facing failure text.
    pub fn failure(err: &ChatError) -> Self {
        Self {
            description: err.user_message().to_string(),
            color: ERROR_COLOR,
            author: default_author(),
            footer: None,
        }
    }

    pub fn with_icon(mut self, icon_url: Option<String>) -> Self {
        self.author.icon_url = icon_url;
        self
    }
}

/// Either plain message content or a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    Plain(String),
    Card(ReplyCard),
}

impl ReplyBody {
    /// Input problems are answered in plain text; everything else as a red card.
    pub fn for_error(err: &ChatError) -> Self {
        match err {
            ChatError::InvalidInput(_) => Self::Plain(err.user_message().to_string()),
            _ => Self::Card(ReplyCard::failure(err)),
        }
    }
}

fn default_author() -> CardAuthor {
    CardAuthor {
        name: ASSISTANT_NAME.to_string(),
        icon_url: None,
    }
}

/// Cap text at [`MAX_REPLY_CHARS`] characters, marking the cut with `...`.
pub fn truncate_reply(text: &str) -> String {
    if text.chars().count() <= MAX_REPLY_CHARS {
        return text.to_string();
    }
    let keep = MAX_REPLY_CHARS - TRUNCATION_MARKER.len();
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Footer text showing how long the reply took, in seconds to two decimals.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("⏱️ 回應時間: {:.2} 秒", elapsed.as_secs_f64())
}
