//! Discord reply helpers and length limits
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use serenity::builder::CreateEmbed;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;
/// Discord embed field value limit
pub const FIELD_LIMIT: usize = 1024;
/// Discord embed description limit
pub const EMBED_LIMIT: usize = 4096;

/// Truncate text to `limit` bytes on a UTF-8 boundary, adding an ellipsis
pub fn truncate_to(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit.saturating_sub(3);
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Truncate text to fit message content
pub fn truncate_for_message(text: &str) -> String {
    truncate_to(text, MESSAGE_LIMIT)
}

/// Truncate text to fit an embed field value
pub fn truncate_for_field(text: &str) -> String {
    truncate_to(text, FIELD_LIMIT)
}

/// Reply to a slash command with plain text
pub async fn reply(
    serenity_ctx: &Context,
    command: &ApplicationCommandInteraction,
    content: &str,
    ephemeral: bool,
) -> Result<()> {
    let content = truncate_for_message(content);
    command
        .create_interaction_response(&serenity_ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|msg| msg.content(content).ephemeral(ephemeral))
        })
        .await?;
    Ok(())
}

/// Reply to a slash command with a single embed
pub async fn reply_embed(
    serenity_ctx: &Context,
    command: &ApplicationCommandInteraction,
    embed: CreateEmbed,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_interaction_response(&serenity_ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|msg| msg.add_embed(embed).ephemeral(ephemeral))
        })
        .await?;
    Ok(())
}

/// Acknowledge a slow command; answer later with `edit_reply`
pub async fn defer(
    serenity_ctx: &Context,
    command: &ApplicationCommandInteraction,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_interaction_response(&serenity_ctx.http, |response| {
            response
                .kind(InteractionResponseType::DeferredChannelMessageWithSource)
                .interaction_response_data(|msg| msg.ephemeral(ephemeral))
        })
        .await?;
    Ok(())
}

/// Replace a deferred response with plain text
pub async fn edit_reply(
    serenity_ctx: &Context,
    command: &ApplicationCommandInteraction,
    content: &str,
) -> Result<()> {
    let content = truncate_for_message(content);
    command
        .edit_original_interaction_response(&serenity_ctx.http, |response| {
            response.content(content)
        })
        .await?;
    Ok(())
}

/// Replace a deferred response with text and an embed
pub async fn edit_reply_embed(
    serenity_ctx: &Context,
    command: &ApplicationCommandInteraction,
    content: &str,
    embed: CreateEmbed,
) -> Result<()> {
    let content = truncate_for_message(content);
    command
        .edit_original_interaction_response(&serenity_ctx.http, |response| {
            response.content(content).add_embed(embed)
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_untouched() {
        assert_eq!(truncate_for_message("short text"), "short text");
    }

    #[test]
    fn test_truncate_long() {
        let result = truncate_for_field(&"a".repeat(5000));
        assert!(result.len() <= FIELD_LIMIT);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_utf8_safe() {
        let text = "世界".repeat(1000);
        let result = truncate_for_message(&text);
        assert!(result.len() <= MESSAGE_LIMIT);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_exactly_at_limit() {
        let text = "a".repeat(MESSAGE_LIMIT);
        assert_eq!(truncate_for_message(&text).len(), MESSAGE_LIMIT);
    }
}
