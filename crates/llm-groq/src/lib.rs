//! Groq chat-completions client.
//!
//! [`GroqClient`] implements [`xiaozhi_core::CompletionBackend`] against the
//! OpenAI-compatible `/chat/completions` endpoint, with and without SSE
//! streaming.

pub mod client;
pub mod config;

pub use client::GroqClient;
pub use config::GroqConfig;
