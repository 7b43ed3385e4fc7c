//! Discord interaction handling, independent of the HTTP framework.
//!
//! [`InteractionHandler::handle`] takes the two signature headers and the raw
//! body and produces a status code plus JSON body; the axum layer in
//! [`crate::server`] only moves bytes in and out.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use xiaozhi_core::commands::{self, Command, MESSAGE_OPTION};
use xiaozhi_core::{ChatService, ReplyBody};

use crate::signature::SignatureVerifier;

const PING: u64 = 1;
const APPLICATION_COMMAND: u64 = 2;

const RESPONSE_PONG: u64 = 1;
const RESPONSE_CHANNEL_MESSAGE: u64 = 4;

/// Message flag that shows a reply only to the invoking user.
const EPHEMERAL: u64 = 1 << 6;

/// Used for history when an interaction carries no user at all.
const ANONYMOUS_USER: &str = "anonymous";

/// Status code and JSON body to send back to Discord.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResponse {
    pub status: u16,
    pub body: Value,
}

impl InteractionResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }

    fn message(data: Value) -> Self {
        Self::ok(json!({ "type": RESPONSE_CHANNEL_MESSAGE, "data": data }))
    }
}

pub struct InteractionHandler {
    chat: Arc<ChatService>,
    verifier: Option<SignatureVerifier>,
}

impl InteractionHandler {
    /// `verifier` is `None` when no public key is configured; every request
    /// is then answered with 500.
    pub fn new(chat: Arc<ChatService>, verifier: Option<SignatureVerifier>) -> Self {
        Self { chat, verifier }
    }

    pub async fn handle(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> InteractionResponse {
        let Some(verifier) = &self.verifier else {
            warn!("DISCORD_PUBLIC_KEY not configured");
            return InteractionResponse::error(500, "DISCORD_PUBLIC_KEY not configured");
        };

        let verified = match (signature, timestamp) {
            (Some(sig), Some(ts)) => verifier.verify(ts, body, sig),
            _ => {
                warn!("Missing signature headers");
                return InteractionResponse::error(401, "Invalid signature");
            }
        };
        if let Err(e) = verified {
            warn!("Rejected interaction: {}", e);
            return InteractionResponse::error(401, "Invalid signature");
        }

        let interaction: Interaction = match serde_json::from_slice(body) {
            Ok(interaction) => interaction,
            Err(e) => {
                warn!("Invalid interaction JSON: {}", e);
                return InteractionResponse::error(400, "Invalid JSON");
            }
        };

        match interaction.kind {
            Some(PING) => {
                debug!("Answering PING");
                InteractionResponse::ok(json!({ "type": RESPONSE_PONG }))
            }
            Some(APPLICATION_COMMAND) => self.handle_command(&interaction).await,
            other => {
                warn!("Unsupported interaction type: {:?}", other);
                InteractionResponse::error(400, "Unsupported interaction type")
            }
        }
    }

    async fn handle_command(&self, interaction: &Interaction) -> InteractionResponse {
        let name = interaction
            .data
            .as_ref()
            .map(|d| d.name.as_str())
            .unwrap_or_default();
        let user_id = interaction.user_id();

        match Command::from_name(name) {
            Some(Command::Chat) => {
                let message = interaction.message_option();
                info!("Chat command from user {}", user_id);
                match self.chat.ask(user_id, &message).await {
                    Ok(reply) => InteractionResponse::message(json!({ "embeds": [reply.card()] })),
                    Err(err) => match ReplyBody::for_error(&err) {
                        ReplyBody::Plain(text) => {
                            InteractionResponse::message(json!({ "content": text }))
                        }
                        ReplyBody::Card(card) => {
                            InteractionResponse::message(json!({ "embeds": [card] }))
                        }
                    },
                }
            }
            Some(Command::Clear) => {
                let cleared = self.chat.clear(user_id);
                InteractionResponse::message(json!({
                    "content": commands::clear_reply(cleared),
                    "flags": EPHEMERAL,
                }))
            }
            None => {
                warn!("Unknown command: {}", name);
                InteractionResponse::error(400, "Unknown command")
            }
        }
    }
}

// ── Inbound interaction shape (only the fields we read) ────────────────────

#[derive(Debug, Deserialize)]
struct Interaction {
    #[serde(rename = "type")]
    kind: Option<u64>,
    data: Option<CommandData>,
    member: Option<Member>,
    user: Option<User>,
}

impl Interaction {
    /// Guild interactions carry the user under `member`, DMs under `user`.
    fn user_id(&self) -> &str {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
            .map(|u| u.id.as_str())
            .unwrap_or(ANONYMOUS_USER)
    }

    /// Value of the `message` option (or the first option), empty when absent.
    fn message_option(&self) -> String {
        let Some(data) = &self.data else {
            return String::new();
        };
        data.options
            .iter()
            .find(|o| o.name == MESSAGE_OPTION)
            .or(data.options.first())
            .and_then(|o| o.value.as_ref())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct CommandData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
struct CommandOption {
    name: String,
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Member {
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Interaction {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn guild_user_comes_from_member() {
        let interaction = parse(
            r#"{"type":2,"member":{"user":{"id":"111"}},"user":{"id":"222"},"data":{"name":"小智"}}"#,
        );
        assert_eq!(interaction.user_id(), "111");
    }

    #[test]
    fn dm_user_comes_from_user() {
        let interaction = parse(r#"{"type":2,"user":{"id":"222"},"data":{"name":"小智"}}"#);
        assert_eq!(interaction.user_id(), "222");
    }

    #[test]
    fn missing_user_is_anonymous() {
        assert_eq!(parse(r#"{"type":2}"#).user_id(), ANONYMOUS_USER);
    }

    #[test]
    fn message_option_prefers_named_option() {
        let interaction = parse(
            r#"{"type":2,"data":{"name":"小智","options":[{"name":"other","value":"x"},{"name":"message","value":"你好"}]}}"#,
        );
        assert_eq!(interaction.message_option(), "你好");
    }

    #[test]
    fn message_option_falls_back_to_first_or_empty() {
        let first = parse(r#"{"type":2,"data":{"name":"小智","options":[{"name":"text","value":"hi"}]}}"#);
        assert_eq!(first.message_option(), "hi");

        let none = parse(r#"{"type":2,"data":{"name":"小智"}}"#);
        assert_eq!(none.message_option(), "");

        let numeric = parse(r#"{"type":2,"data":{"name":"小智","options":[{"name":"message","value":3}]}}"#);
        assert_eq!(numeric.message_option(), "");
    }
}
