//! In-memory completion backend for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::completion::{CompletionBackend, CompletionError, CompletionRequest};

/// One scripted outcome.
#[derive(Debug)]
pub enum MockOutcome {
    /// Reply with these fragments (concatenated for non-streaming calls).
    Reply(Vec<String>),
    Fail(CompletionError),
    /// Never answer within any reasonable deadline.
    Hang,
}

/// Backend that replays scripted outcomes in order and records every request.
///
/// Once the script is exhausted it answers `"ok"`.
///
/// # Example
/// ```rust,ignore
/// let mock = MockBackend::new().reply("你好");
/// let service = ChatService::new(Some(Arc::new(mock.clone())), composer, settings);
/// service.ask("user", "hi").await.unwrap();
/// assert_eq!(mock.requests().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockBackend {
    script: Arc<Mutex<VecDeque<MockOutcome>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(MockOutcome::Reply(vec![text.into()]))
    }

    pub fn reply_in_fragments(self, fragments: &[&str]) -> Self {
        self.push(MockOutcome::Reply(
            fragments.iter().map(|f| f.to_string()).collect(),
        ))
    }

    pub fn fail(self, err: CompletionError) -> Self {
        self.push(MockOutcome::Fail(err))
    }

    pub fn hang(self) -> Self {
        self.push(MockOutcome::Hang)
    }

    fn push(self, outcome: MockOutcome) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    /// Snapshot of all requests received, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &CompletionRequest) -> MockOutcome {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockOutcome::Reply(vec!["ok".to_string()]))
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        match self.next(request) {
            MockOutcome::Reply(fragments) => Ok(fragments.concat()),
            MockOutcome::Fail(err) => Err(err),
            MockOutcome::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(CompletionError::Transport("mock hang elapsed".into()))
            }
        }
    }

    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<String, CompletionError> {
        match self.next(request) {
            MockOutcome::Reply(fragments) => {
                let mut full = String::new();
                for fragment in fragments {
                    full.push_str(&fragment);
                    let _ = chunk_tx.send(fragment).await;
                }
                Ok(full)
            }
            MockOutcome::Fail(err) => Err(err),
            MockOutcome::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(CompletionError::Transport("mock hang elapsed".into()))
            }
        }
    }
}
