//! Translate core reply cards into serenity builders.

use serenity::all::{
    CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateInteractionResponseFollowup,
};
use xiaozhi_core::{ReplyBody, ReplyCard};

/// Followup carrying either plain text or a single embed.
///
/// Content is always set so an edit replaces the streaming placeholder text.
pub fn followup(body: ReplyBody, icon_url: Option<String>) -> CreateInteractionResponseFollowup {
    match body {
        ReplyBody::Plain(text) => CreateInteractionResponseFollowup::new().content(text),
        ReplyBody::Card(card) => CreateInteractionResponseFollowup::new()
            .content("")
            .embed(embed(&card.with_icon(icon_url))),
    }
}

pub fn embed(card: &ReplyCard) -> CreateEmbed {
    let mut author = CreateEmbedAuthor::new(&card.author.name);
    if let Some(icon) = &card.author.icon_url {
        author = author.icon_url(icon);
    }

    let mut embed = CreateEmbed::new()
        .description(&card.description)
        .colour(card.color)
        .author(author);
    if let Some(footer) = &card.footer {
        embed = embed.footer(CreateEmbedFooter::new(&footer.text));
    }
    embed
}
