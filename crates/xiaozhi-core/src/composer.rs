//! Request shaping: builds the message list sent to the completion API and the
//! generation budget derived from how much context it carries.

use std::sync::Arc;

use crate::history::HistoryStore;
use crate::prompt::SystemPrompts;
use crate::types::{Turn, approx_tokens};

/// Model context window the budget is carved from.
pub const CONTEXT_WINDOW_TOKENS: i64 = 4096;

/// Reserved for the system prompt and reply framing.
pub const SAFETY_MARGIN_TOKENS: i64 = 200;

pub const MIN_REPLY_TOKENS: u32 = 512;
pub const MAX_REPLY_TOKENS: u32 = 2048;

/// Generation budget for a request carrying `history_tokens` of stored context
/// and a new message estimated at `estimated_tokens`.
///
/// Always within `[MIN_REPLY_TOKENS, MAX_REPLY_TOKENS]`, however large or small
/// the context is.
pub fn token_budget(history_tokens: usize, estimated_tokens: usize) -> u32 {
    let history = i64::try_from(history_tokens).unwrap_or(i64::MAX);
    let estimated = i64::try_from(estimated_tokens).unwrap_or(i64::MAX);
    let available = CONTEXT_WINDOW_TOKENS
        .saturating_sub(history)
        .saturating_sub(estimated)
        .saturating_sub(SAFETY_MARGIN_TOKENS);
    // Bounds are small positive constants, so the cast cannot truncate.
    available.clamp(MIN_REPLY_TOKENS as i64, MAX_REPLY_TOKENS as i64) as u32
}

/// What the composer hands to the completion collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedRequest {
    /// `[system] + history + [user]`, oldest first.
    pub messages: Vec<Turn>,
    pub max_tokens: u32,
    /// Whether the concise system prompt was chosen.
    pub concise: bool,
    pub history_tokens: usize,
}

/// Composes requests from the history store and records successful exchanges.
///
/// Holds no per-call state. Without a store (stateless mode) every request is
/// composed against an empty history and nothing is recorded.
#[derive(Debug, Clone)]
pub struct Composer {
    store: Option<Arc<HistoryStore>>,
    prompts: SystemPrompts,
}

impl Composer {
    pub fn new(store: Option<Arc<HistoryStore>>, prompts: SystemPrompts) -> Self {
        Self { store, prompts }
    }

    /// A composer with no memory.
    pub fn stateless() -> Self {
        Self::new(None, SystemPrompts::default())
    }

    pub fn store(&self) -> Option<&Arc<HistoryStore>> {
        self.store.as_ref()
    }

    pub fn compose(&self, user_id: &str, new_message: &str) -> ComposedRequest {
        let history = match &self.store {
            Some(store) => store.get(user_id),
            None => Vec::new(),
        };
        compose_with_history(&self.prompts, history, new_message)
    }

    /// Record a completed exchange: user turn first, then the assistant reply.
    ///
    /// Call only after the completion succeeded.
    pub fn record_success(&self, user_id: &str, new_message: &str, reply: &str) {
        if let Some(store) = &self.store {
            store.append_exchange(user_id, new_message, reply);
        }
    }
}

/// Pure composition step over an already-fetched history snapshot.
pub fn compose_with_history(
    prompts: &SystemPrompts,
    history: Vec<Turn>,
    new_message: &str,
) -> ComposedRequest {
    let history_tokens: usize = history.iter().map(Turn::approx_tokens).sum();
    let estimated_tokens = approx_tokens(new_message);
    let concise = SystemPrompts::wants_concise(new_message);

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Turn::system(prompts.select(new_message)));
    messages.extend(history);
    messages.push(Turn::user(new_message));

    ComposedRequest {
        messages,
        max_tokens: token_budget(history_tokens, estimated_tokens),
        concise,
        history_tokens,
    }
}
