//! Per-user short-term conversation memory.
//!
//! Each user owns a bounded, chronologically ordered sequence of turns. After
//! every append the oldest turns are evicted until both the turn-count cap and
//! the approximate-token cap hold again. Memory lives for the lifetime of the
//! process and is never persisted.

#[path = "history_tests.rs"]
mod history_tests;

use std::collections::VecDeque;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Role, Turn};

/// Default maximum number of turns kept per user.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Default maximum approximate token cost kept per user.
pub const DEFAULT_MAX_TOKENS: usize = 2000;

/// Caps enforced after every append.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryLimits {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

/// One user's turns plus their running token total.
#[derive(Debug, Default)]
struct History {
    turns: VecDeque<Turn>,
    tokens: usize,
}

impl History {
    fn push(&mut self, turn: Turn, limits: HistoryLimits) -> usize {
        self.tokens += turn.approx_tokens();
        self.turns.push_back(turn);

        let mut evicted = 0;
        while self.turns.len() > limits.max_turns || self.tokens > limits.max_tokens {
            let Some(oldest) = self.turns.pop_front() else {
                break;
            };
            self.tokens -= oldest.approx_tokens();
            evicted += 1;
        }
        evicted
    }
}

/// Process-wide mapping from user identity to that user's history.
///
/// Entries are sharded, so operations on the same user are serialized by the
/// entry lock while different users proceed independently. No method awaits;
/// callers must not hold any borrowed state across the completion call.
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: DashMap<String, History>,
    limits: HistoryLimits,
}

impl HistoryStore {
    /// Create a store with the default caps (10 turns, 2000 tokens).
    pub fn new() -> Self {
        Self::with_limits(HistoryLimits::default())
    }

    pub fn with_limits(limits: HistoryLimits) -> Self {
        Self {
            entries: DashMap::new(),
            limits,
        }
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    /// Snapshot of the user's turns, oldest first. Creates an empty history if
    /// the user has none yet.
    pub fn get(&self, user_id: &str) -> Vec<Turn> {
        let entry = self.entries.entry(user_id.to_string()).or_default();
        entry.turns.iter().cloned().collect()
    }

    /// Append a turn, then evict from the front until both caps hold.
    pub fn append(&self, user_id: &str, role: Role, content: &str) {
        let mut entry = self.entries.entry(user_id.to_string()).or_default();
        let evicted = entry.push(Turn::new(role, content), self.limits);
        log_eviction(user_id, evicted, &entry);
    }

    /// Append a user turn and the assistant reply to it under a single entry
    /// lock, so concurrent exchanges or a `clear` never land between them.
    ///
    /// Eviction runs after each push, exactly as two `append` calls would.
    pub fn append_exchange(&self, user_id: &str, user_message: &str, reply: &str) {
        let mut entry = self.entries.entry(user_id.to_string()).or_default();
        let evicted = entry.push(Turn::user(user_message), self.limits)
            + entry.push(Turn::assistant(reply), self.limits);
        log_eviction(user_id, evicted, &entry);
    }

    /// Reset the user's history to empty.
    ///
    /// Returns `true` when there was at least one turn to discard. Clearing an
    /// absent or already-empty history is a no-op that returns `false`.
    pub fn clear(&self, user_id: &str) -> bool {
        match self.entries.get_mut(user_id) {
            Some(mut entry) => {
                let had_turns = !entry.turns.is_empty();
                entry.turns.clear();
                entry.tokens = 0;
                had_turns
            }
            None => false,
        }
    }

    /// Sum of approximate token costs currently stored for the user.
    pub fn token_cost(&self, user_id: &str) -> usize {
        self.entries.get(user_id).map_or(0, |entry| entry.tokens)
    }

    /// Number of users with at least one stored turn.
    pub fn active_users(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.turns.is_empty())
            .count()
    }
}

fn log_eviction(user_id: &str, evicted: usize, entry: &History) {
    if evicted > 0 {
        debug!(
            "Evicted {} turn(s) for user {} ({} turns, {} tokens remain)",
            evicted,
            user_id,
            entry.turns.len(),
            entry.tokens
        );
    }
}
