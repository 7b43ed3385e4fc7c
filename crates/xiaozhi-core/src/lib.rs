//! Core of the Xiaozhi Discord bot.
//!
//! Every transport adapter (gateway bot, interactions webhook) funnels into
//! [`ChatService`], which owns the request path:
//!
//! 1. validate the inbound message,
//! 2. compose `[system] + history + [user]` and a token budget,
//! 3. call the completion backend under a deadline (no store lock held),
//! 4. record the exchange in the [`HistoryStore`] only on success.
//!
//! | Concern | Module |
//! |---------|--------|
//! | Per-user bounded memory | [`history`] |
//! | Message list + token budget | [`composer`] |
//! | Completion collaborator seam | [`completion`] |
//! | Failure taxonomy | [`error`] |
//! | Presentation cards | [`reply`] |
//! | Slash command names | [`commands`] |
//! | Latest-value streaming relay | [`streaming`] |
//! | Env-backed configuration | [`config`], [`env`] |

pub mod chat;
pub mod commands;
pub mod completion;
pub mod composer;
pub mod config;
pub mod env;
pub mod error;
pub mod history;
pub mod prompt;
pub mod reply;
pub mod streaming;
pub mod types;
pub mod validate;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use chat::{ChatReply, ChatService};
pub use commands::Command;
pub use completion::{CompletionBackend, CompletionError, CompletionRequest};
pub use composer::{ComposedRequest, Composer};
pub use config::{ChatConfig, MemoryMode};
pub use env::{ReadEnv, SystemEnv};
pub use error::{ChatError, InputError};
pub use history::{HistoryLimits, HistoryStore};
pub use reply::{ReplyBody, ReplyCard};
pub use types::{Role, Turn};
