//! Slash command handler trait
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use super::context::CommandContext;

/// Trait for slash command handlers
///
/// Each handler processes one or more slash commands. Handlers are
/// registered with a CommandRegistry and dispatched by command name.
///
/// User mistakes (bad durations, failed saves, foreign reminder ids) are
/// answered inside `handle`; an `Err` means something broke and the
/// dispatcher sends a generic error reply.
///
/// # Example
///
/// ```ignore
/// pub struct StatsHandler;
///
/// #[async_trait]
/// impl SlashCommandHandler for StatsHandler {
///     fn command_names(&self) -> &'static [&'static str] {
///         &["stats"]
///     }
///
///     async fn handle(
///         &self,
///         ctx: Arc<CommandContext>,
///         serenity_ctx: &Context,
///         command: &ApplicationCommandInteraction,
///     ) -> Result<()> {
///         let record = ctx.tracker.stats(command.user.id.0).await?;
///         reply(serenity_ctx, command, &format!("{} screams", record.total_count), true).await
///     }
/// }
/// ```
#[async_trait]
pub trait SlashCommandHandler: Send + Sync {
    /// Command name(s) this handler processes
    ///
    /// A handler can process multiple commands if they share logic.
    fn command_names(&self) -> &'static [&'static str];

    /// Handle the slash command
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared context with the store, scheduler, tracker and settings
    /// * `serenity_ctx` - Serenity context for Discord API calls
    /// * `command` - The slash command interaction to handle
    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that the trait is object-safe (can be used with dyn)
    fn _assert_object_safe(_: &dyn SlashCommandHandler) {}
}
