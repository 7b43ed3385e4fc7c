//! Serenity event handler implementation

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use serenity::all::{
    ActivityData, Command, CommandInteraction, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, Interaction, Ready,
};
use serenity::async_trait;
use serenity::prelude::*;
use tracing::{error, info, warn};
use xiaozhi_core::commands::{self as slash, Command as SlashCommand};
use xiaozhi_core::streaming::{self, STREAM_CURSOR, run_renderer};
use xiaozhi_core::validate::validate_message;
use xiaozhi_core::{ChatError, ChatService, ReplyBody};

use crate::commands;
use crate::health::AppState;
use crate::reply;
use crate::streaming::{FollowupEditor, edit_followup_with_retry};

const PRESENCE: &str = "正在幫助用戶";

pub struct Handler {
    chat: Arc<ChatService>,
    health: AppState,
    streaming: bool,
    stream_interval: Duration,
}

impl Handler {
    pub fn new(
        chat: Arc<ChatService>,
        health: AppState,
        streaming: bool,
        stream_interval: Duration,
    ) -> Self {
        Self {
            chat,
            health,
            streaming,
            stream_interval,
        }
    }

    async fn handle_chat(&self, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
        let user_id = cmd.user.id.to_string();
        let message = commands::message_option(&cmd.data.options);

        cmd.defer(&ctx.http)
            .await
            .context("Failed to defer interaction")?;
        let icon_url = ctx.cache.current_user().avatar_url();

        // Input problems are answered before any placeholder is posted.
        if let Err(e) = validate_message(&message) {
            let err = ChatError::from(e);
            err.log(&user_id);
            cmd.create_followup(&ctx.http, reply::followup(ReplyBody::for_error(&err), None))
                .await
                .context("Failed to send input error")?;
            return Ok(());
        }

        if !self.streaming {
            let body = match self.chat.ask(&user_id, &message).await {
                Ok(answer) => ReplyBody::Card(answer.card()),
                Err(err) => ReplyBody::for_error(&err),
            };
            cmd.create_followup(&ctx.http, reply::followup(body, icon_url))
                .await
                .context("Failed to send reply")?;
            return Ok(());
        }

        let placeholder = cmd
            .create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new().content(STREAM_CURSOR),
            )
            .await
            .context("Failed to send streaming placeholder")?;

        let (publisher, watcher) = streaming::channel();
        let editor = FollowupEditor::new(ctx.http.clone(), cmd.clone(), placeholder.id);
        let renderer = tokio::spawn(run_renderer(watcher, self.stream_interval, editor));

        let outcome = self.chat.ask_streaming(&user_id, &message, publisher).await;

        // The final edit must land after the last partial one.
        if let Err(e) = renderer.await {
            warn!("Renderer task failed: {}", e);
        }

        let body = match outcome {
            Ok(answer) => ReplyBody::Card(answer.card()),
            Err(err) => ReplyBody::for_error(&err),
        };
        let final_reply = reply::followup(body, icon_url);
        if let Err(e) =
            edit_followup_with_retry(&ctx.http, cmd, placeholder.id, final_reply.clone()).await
        {
            // The placeholder may be stuck mid-stream; post the reply fresh instead.
            warn!("{:#}; sending the reply as a new followup", e);
            cmd.create_followup(&ctx.http, final_reply)
                .await
                .context("Failed to send final reply")?;
        }
        Ok(())
    }

    async fn handle_clear(&self, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
        let cleared = self.chat.clear(&cmd.user.id.to_string());
        let response = CreateInteractionResponseMessage::new()
            .content(slash::clear_reply(cleared))
            .ephemeral(true);
        cmd.create_response(&ctx.http, CreateInteractionResponse::Message(response))
            .await
            .context("Failed to confirm clear")?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);
        self.health.set_bot_username(ready.user.name.clone()).await;

        match Command::set_global_commands(&ctx.http, commands::definitions()).await {
            Ok(registered) => {
                info!("Registered {} slash command(s)", registered.len());
                for command in &registered {
                    info!("  - /{}", command.name);
                }
            }
            Err(e) => error!("Failed to register slash commands: {}", e),
        }

        ctx.set_activity(Some(ActivityData::watching(PRESENCE)));
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(cmd) = interaction else {
            // Components, autocomplete and modals are not used
            return;
        };

        let result = match SlashCommand::from_name(&cmd.data.name) {
            Some(SlashCommand::Chat) => self.handle_chat(&ctx, &cmd).await,
            Some(SlashCommand::Clear) => self.handle_clear(&ctx, &cmd).await,
            None => {
                warn!("Ignoring unknown command /{}", cmd.data.name);
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Failed to handle /{}: {:#}", cmd.data.name, e);
        }
    }
}
