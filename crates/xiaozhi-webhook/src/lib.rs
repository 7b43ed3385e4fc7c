//! # xiaozhi-webhook
//!
//! Discord interactions endpoint for the Xiaozhi bot, for deployments that
//! receive slash commands over HTTP instead of the gateway.
//!
//! ## How it works
//!
//! 1. Discord sends `POST /interactions` with `X-Signature-Ed25519` and
//!    `X-Signature-Timestamp` headers plus a JSON interaction.
//! 2. The Ed25519 signature over `timestamp + body` is checked against
//!    `DISCORD_PUBLIC_KEY`.
//! 3. PINGs are answered with a PONG; the chat command runs through
//!    [`xiaozhi_core::ChatService`] and is answered synchronously with an
//!    embed; the clear command answers with an ephemeral confirmation.
//!
//! ## Configuration (env vars)
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `DISCORD_PUBLIC_KEY` | (none) | Application public key, hex |
//! | `XIAOZHI_WEBHOOK_PORT` | `8080` | HTTP listening port |
//! | `GROQ_API_KEY` | (none) | Groq API key |
//! | `GROQ_MODEL` | `llama-3.3-70b-versatile` | Completion model |
//! | `XIAOZHI_MEMORY` | `persistent` | `persistent` or `stateless` |

pub mod config;
pub mod interactions;
pub mod server;
pub mod signature;

pub use config::WebhookConfig;
pub use interactions::{InteractionHandler, InteractionResponse};
pub use server::{router, serve};
pub use signature::{SignatureError, SignatureVerifier, verify};
