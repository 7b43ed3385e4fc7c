//! Slash command names and fixed command replies shared by every adapter.

use crate::prompt::ASSISTANT_NAME;

/// Chat command; takes one required string option, [`MESSAGE_OPTION`].
pub const CHAT_COMMAND: &str = ASSISTANT_NAME;
pub const CHAT_DESCRIPTION: &str = "與小智 AI 助手對話";

pub const MESSAGE_OPTION: &str = "message";
pub const MESSAGE_DESCRIPTION: &str = "你想對小智說的話";

/// Forget the caller's conversation history.
pub const CLEAR_COMMAND: &str = "清除記憶";
pub const CLEAR_DESCRIPTION: &str = "清除你與小智的對話記憶";

/// Which command an interaction invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Chat,
    Clear,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            CHAT_COMMAND => Some(Self::Chat),
            CLEAR_COMMAND => Some(Self::Clear),
            _ => None,
        }
    }
}

/// Ephemeral confirmation for the clear command.
pub fn clear_reply(cleared: bool) -> &'static str {
    if cleared {
        "已清除你的對話記憶"
    } else {
        "目前沒有可清除的對話記憶"
    }
}
