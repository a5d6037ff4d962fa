//! Per-command handler implementations
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

pub mod courses;
pub mod remind;
pub mod setup;
pub mod streaks;

use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::permissions::Permissions;
use std::sync::Arc;

use super::handler::SlashCommandHandler;

/// Whether the invoker may run server-wide admin commands
///
/// Requires a guild invocation with Manage Server (or Administrator).
/// Direct messages carry no member permissions and are always refused.
pub fn is_guild_manager(in_guild: bool, permissions: Option<Permissions>) -> bool {
    match (in_guild, permissions) {
        (true, Some(perms)) => {
            perms.contains(Permissions::MANAGE_GUILD) || perms.contains(Permissions::ADMINISTRATOR)
        }
        _ => false,
    }
}

pub(crate) fn invoked_by_manager(command: &ApplicationCommandInteraction) -> bool {
    is_guild_manager(
        command.guild_id.is_some(),
        command.member.as_ref().and_then(|m| m.permissions),
    )
}

/// Create all registered command handlers
///
/// Returns a vector of handlers ready to be registered with CommandRegistry.
pub fn create_all_handlers() -> Vec<Arc<dyn SlashCommandHandler>> {
    vec![
        Arc::new(remind::RemindHandler),
        Arc::new(streaks::StreakHandler),
        Arc::new(courses::CourseHandler),
        Arc::new(setup::SetupHandler),
    ]
}
