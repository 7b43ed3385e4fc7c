//! Conversation primitives shared by every crate in the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Speaker of a [`Turn`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message fragment.
///
/// Serializes to the OpenAI-compatible `{"role": …, "content": …}` shape so it
/// can be sent to the completion API as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Approximate token cost of this turn's content.
    pub fn approx_tokens(&self) -> usize {
        approx_tokens(&self.content)
    }
}

/// Crude token estimate: one token per three characters, fractional tokens dropped.
///
/// Counts Unicode scalar values rather than bytes so CJK text is not
/// over-counted.
pub fn approx_tokens(text: &str) -> usize {
    text.chars().count() / 3
}
