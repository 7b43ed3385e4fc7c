//! HTTP client for Groq's chat-completions endpoint.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use xiaozhi_core::types::Turn;
use xiaozhi_core::{CompletionBackend, CompletionError, CompletionRequest};

use crate::config::GroqConfig;

/// Groq API client
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    config: GroqConfig,
}

impl GroqClient {
    pub fn new(config: GroqConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &GroqConfig {
        &self.config
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<Response, CompletionError> {
        let body = GroqRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };

        debug!(
            "Sending request to Groq: model={} messages={} max_tokens={} stream={}",
            request.model,
            request.messages.len(),
            request.max_tokens,
            stream
        );

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, &text));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for GroqClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let response = self.send(request, false).await?;
        let parsed: GroqResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Malformed("response has no choices".into()))
    }

    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<String, CompletionError> {
        let mut response = self.send(request, true).await?;

        let mut accumulated = String::new();
        // Bytes, not text: a multi-byte character may straddle two chunks.
        let mut line_buf: Vec<u8> = Vec::new();
        let mut done = false;

        while !done {
            let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| CompletionError::Transport(e.to_string()))?
            else {
                break;
            };
            line_buf.extend_from_slice(&chunk);

            while let Some(pos) = line_buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = line_buf.drain(..=pos).collect();
                match parse_sse_line(&line)? {
                    SseLine::Fragment(text) => {
                        accumulated.push_str(&text);
                        // Best-effort; the receiver may already be gone.
                        let _ = chunk_tx.send(text).await;
                    }
                    SseLine::Done => {
                        done = true;
                        break;
                    }
                    SseLine::Skip => {}
                }
            }
        }

        if !done {
            warn!("Groq stream ended without [DONE] marker");
        }
        debug!(
            "Streaming complete: {} chars accumulated",
            accumulated.chars().count()
        );
        Ok(accumulated)
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Fragment(String),
    Done,
    Skip,
}

fn parse_sse_line(raw: &[u8]) -> Result<SseLine, CompletionError> {
    let line = String::from_utf8_lossy(raw);
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let event: StreamChunk = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => {
            debug!("Ignoring unparseable stream event: {}", e);
            return Ok(SseLine::Skip);
        }
    };
    if let Some(err) = event.error {
        return Err(CompletionError::Api {
            status: 200,
            code: err.code,
            message: err.message,
        });
    }

    Ok(event
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty())
        .map_or(SseLine::Skip, SseLine::Fragment))
}

fn api_error(status: u16, body: &str) -> CompletionError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => CompletionError::Api {
            status,
            code: envelope.error.code.or(envelope.error.error_type),
            message: envelope.error.message,
        },
        Err(_) => CompletionError::Api {
            status,
            code: None,
            message: body.to_string(),
        },
    }
}

/// Groq chat-completions request body
#[derive(Debug, Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ── SSE streaming types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

// ── Error bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
