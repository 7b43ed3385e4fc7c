//! The one request path every transport adapter calls into.

#[path = "chat_tests.rs"]
mod chat_tests;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::completion::{CompletionBackend, CompletionRequest};
use crate::composer::{ComposedRequest, Composer};
use crate::config::{ChatConfig, MemoryMode};
use crate::error::ChatError;
use crate::history::HistoryStore;
use crate::prompt::SystemPrompts;
use crate::reply::ReplyCard;
use crate::streaming::StreamPublisher;
use crate::validate::validate_message;

/// Capacity of the fragment channel between backend and accumulator.
const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// A successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Full reply text as generated (not yet truncated for display).
    pub text: String,
    /// Wall-clock time from receiving the message to the reply.
    pub elapsed: Duration,
    /// Generation budget the request was sent with.
    pub max_tokens: u32,
}

impl ChatReply {
    pub fn card(&self) -> ReplyCard {
        ReplyCard::success(&self.text, self.elapsed)
    }
}

/// Validates, composes, calls the completion backend under a deadline and
/// records successful exchanges.
pub struct ChatService {
    backend: Option<Arc<dyn CompletionBackend>>,
    composer: Composer,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl ChatService {
    /// `backend` is `None` when no API key is configured; every request then
    /// fails with [`ChatError::Unconfigured`] after input validation.
    pub fn new(
        backend: Option<Arc<dyn CompletionBackend>>,
        composer: Composer,
        config: &ChatConfig,
    ) -> Self {
        Self {
            backend,
            composer,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.timeout(),
        }
    }

    /// Build a service whose memory follows `config.memory`.
    pub fn from_config(backend: Option<Arc<dyn CompletionBackend>>, config: &ChatConfig) -> Self {
        let store = match config.memory {
            MemoryMode::Persistent => Some(Arc::new(HistoryStore::with_limits(config.history))),
            MemoryMode::Stateless => None,
        };
        Self::new(
            backend,
            Composer::new(store, SystemPrompts::default()),
            config,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn memory_mode(&self) -> MemoryMode {
        match self.composer.store() {
            Some(_) => MemoryMode::Persistent,
            None => MemoryMode::Stateless,
        }
    }

    pub fn history(&self) -> Option<&Arc<HistoryStore>> {
        self.composer.store()
    }

    /// Ask for a complete reply.
    pub async fn ask(&self, user_id: &str, message: &str) -> Result<ChatReply, ChatError> {
        let started = Instant::now();
        let (backend, composed) = self.prepare(user_id, message)?;
        let request = self.request_for(composed);

        let text = match tokio::time::timeout(self.timeout, backend.complete(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(self.fail(user_id, ChatError::from(e))),
            Err(_) => return Err(self.fail(user_id, ChatError::Timeout(self.timeout))),
        };

        Ok(self.succeed(user_id, message, text, request.max_tokens, started))
    }

    /// Ask for a reply, publishing the accumulated text to `publisher` as
    /// fragments arrive. The publisher is finished on every path.
    pub async fn ask_streaming(
        &self,
        user_id: &str,
        message: &str,
        mut publisher: StreamPublisher,
    ) -> Result<ChatReply, ChatError> {
        let started = Instant::now();
        let (backend, composed) = self.prepare(user_id, message)?;
        let request = self.request_for(composed);

        let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(CHUNK_CHANNEL_CAPACITY);
        let call = tokio::time::timeout(
            self.timeout,
            backend.complete_streaming(&request, chunk_tx),
        );
        let drain = async {
            // Ends once the backend future completes or is dropped, since that
            // drops the sender.
            while let Some(fragment) = chunk_rx.recv().await {
                publisher.push(&fragment);
            }
        };
        let (outcome, ()) = tokio::join!(call, drain);
        publisher.finish();

        let text = match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(self.fail(user_id, ChatError::from(e))),
            Err(_) => return Err(self.fail(user_id, ChatError::Timeout(self.timeout))),
        };

        Ok(self.succeed(user_id, message, text, request.max_tokens, started))
    }

    /// Forget the user's conversation. Returns whether anything was cleared.
    pub fn clear(&self, user_id: &str) -> bool {
        let cleared = self
            .composer
            .store()
            .is_some_and(|store| store.clear(user_id));
        info!("Cleared history for user {}: {}", user_id, cleared);
        cleared
    }

    fn prepare(
        &self,
        user_id: &str,
        message: &str,
    ) -> Result<(&Arc<dyn CompletionBackend>, ComposedRequest), ChatError> {
        if let Err(e) = validate_message(message) {
            let err = ChatError::from(e);
            err.log(user_id);
            return Err(err);
        }
        let Some(backend) = &self.backend else {
            let err = ChatError::Unconfigured;
            err.log(user_id);
            return Err(err);
        };

        let composed = self.composer.compose(user_id, message);
        debug!(
            "Composed request for user {}: {} messages, {} history tokens, budget {}, concise={}",
            user_id,
            composed.messages.len(),
            composed.history_tokens,
            composed.max_tokens,
            composed.concise
        );
        Ok((backend, composed))
    }

    fn request_for(&self, composed: ComposedRequest) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: composed.messages,
            temperature: self.temperature,
            max_tokens: composed.max_tokens,
        }
    }

    fn succeed(
        &self,
        user_id: &str,
        message: &str,
        text: String,
        max_tokens: u32,
        started: Instant,
    ) -> ChatReply {
        self.composer.record_success(user_id, message, &text);
        let elapsed = started.elapsed();
        info!(
            "Replied to user {} with {} chars in {:.2}s",
            user_id,
            text.chars().count(),
            elapsed.as_secs_f64()
        );
        ChatReply {
            text,
            elapsed,
            max_tokens,
        }
    }

    fn fail(&self, user_id: &str, err: ChatError) -> ChatError {
        err.log(user_id);
        err
    }
}
