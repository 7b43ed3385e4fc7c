//! Progressive edits of a followup message while a reply streams in.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::all::{CommandInteraction, CreateInteractionResponseFollowup, Http, MessageId};
use tracing::{debug, warn};
use xiaozhi_core::reply::truncate_reply;
use xiaozhi_core::streaming::RenderTarget;

const MAX_RETRIES: u32 = 3;

/// Edits one followup message in place.
pub struct FollowupEditor {
    http: Arc<Http>,
    interaction: CommandInteraction,
    message_id: MessageId,
}

impl FollowupEditor {
    pub fn new(http: Arc<Http>, interaction: CommandInteraction, message_id: MessageId) -> Self {
        Self {
            http,
            interaction,
            message_id,
        }
    }
}

#[async_trait]
impl RenderTarget for FollowupEditor {
    async fn render_partial(&self, text: &str) -> anyhow::Result<()> {
        let builder = CreateInteractionResponseFollowup::new().content(truncate_reply(text));
        edit_followup_with_retry(&self.http, &self.interaction, self.message_id, builder).await
    }
}

/// Edit a followup message with exponential-backoff retry.
pub async fn edit_followup_with_retry(
    http: &Http,
    interaction: &CommandInteraction,
    message_id: MessageId,
    builder: CreateInteractionResponseFollowup,
) -> anyhow::Result<()> {
    let builder = &builder;
    with_retry(&format!("Edit of followup {}", message_id), move || {
        interaction.edit_followup(http, message_id, builder.clone())
    })
    .await?;
    Ok(())
}

/// Run `attempt` up to [`MAX_RETRIES`] times, sleeping 100 ms, then 200 ms,
/// between failures.
async fn with_retry<T, E, F, Fut>(what: &str, mut attempt: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match attempt().await {
            Ok(value) => {
                debug!("{} succeeded (attempt {})", what, attempts);
                return Ok(value);
            }
            Err(e) if attempts < MAX_RETRIES => {
                warn!("{} failed (attempt {}): {}. Retrying...", what, attempts, e);
                tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempts - 1))).await;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "{} failed after {} attempts: {}",
                    what,
                    MAX_RETRIES,
                    e
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_with_backoff() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = with_retry("edit", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err("503 Service Unavailable")
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_does_not_sleep() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = with_retry("edit", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, &str>(()) }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let err = with_retry("Edit of followup 42", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("500 Internal Server Error") }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES);
        let message = err.to_string();
        assert!(message.contains("after 3 attempts"));
        assert!(message.contains("500 Internal Server Error"));
    }
}
