//! Setup command handler
//!
//! Handles: setup_statistics, setup_course
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::{
    get_bool_option, get_channel_option, get_integer_option, get_role_option, get_string_option,
};
use crate::core::{reply, CourseError};
use crate::features::courses::{CourseConfig, CourseConfigUpdate};
use crate::features::streaks::{SettingsRow, SettingsUpdate};

/// Handler for per-guild statistics and course configuration
pub struct SetupHandler;

#[async_trait]
impl SlashCommandHandler for SetupHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["setup_statistics", "setup_course"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let Some(guild_id) = command.guild_id else {
            return reply(
                serenity_ctx,
                command,
                "❌ Setup only works inside a server.",
                true,
            )
            .await;
        };

        if command.data.name == "setup_course" {
            return self
                .handle_setup_course(&ctx, serenity_ctx, command, guild_id.0)
                .await;
        }

        let update = update_from_options(&command.data.options);
        let current = ctx.settings.row_or_default(guild_id.0).await?;

        if let Err(reason) = current.apply(&update) {
            debug!("Rejected /setup_statistics in guild {guild_id}: {reason}");
            return reply(serenity_ctx, command, &format!("❌ {reason}"), true).await;
        }

        let settings = ctx.settings.update(guild_id.0, &update).await?;
        info!(
            "Statistics settings updated for guild {guild_id} by {}",
            command.user.id
        );

        reply(serenity_ctx, command, &summary_text(&settings.row), true).await
    }
}

impl SetupHandler {
    async fn handle_setup_course(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
        guild_id: u64,
    ) -> Result<()> {
        let options = &command.data.options;
        let update = CourseConfigUpdate {
            auto_delete: get_bool_option(options, "auto_delete"),
            auto_delete_ignore_admins: get_bool_option(options, "auto_delete_ignore_admins"),
            codes: get_string_option(options, "codes"),
        };

        match ctx.courses.update_config(guild_id, &update).await {
            Ok(config) => {
                info!(
                    "Course settings updated for guild {guild_id} by {}",
                    command.user.id
                );
                reply(serenity_ctx, command, &course_summary_text(&config), true).await
            }
            Err(CourseError::Internal(e)) => Err(e),
            Err(reason) => {
                debug!("Rejected /setup_course in guild {guild_id}: {reason}");
                reply(serenity_ctx, command, &format!("❌ {reason}"), true).await
            }
        }
    }
}

fn update_from_options(options: &[CommandDataOption]) -> SettingsUpdate {
    SettingsUpdate {
        channel_id: get_channel_option(options, "channel"),
        primary_pattern: get_string_option(options, "primary_pattern"),
        secondary_pattern: get_string_option(options, "secondary_pattern"),
        minor_threshold: get_integer_option(options, "minor_threshold"),
        major_threshold: get_integer_option(options, "major_threshold"),
        minor_role_id: get_role_option(options, "minor_role"),
        major_role_id: get_role_option(options, "major_role"),
    }
}

fn summary_text(row: &SettingsRow) -> String {
    let channel = row
        .channel_id
        .map(|id| format!("<#{id}>"))
        .unwrap_or_else(|| "not set (tracking is off)".to_string());
    let secondary = row
        .secondary_pattern
        .as_deref()
        .map(|p| format!("`{p}`"))
        .unwrap_or_else(|| "none".to_string());
    let role = |id: Option<u64>| {
        id.map(|id| format!("<@&{id}>"))
            .unwrap_or_else(|| "none".to_string())
    };

    format!(
        "✅ **Statistics settings updated**\n\
         **Channel:** {channel}\n\
         **Primary pattern:** `{}`\n\
         **Secondary pattern:** {secondary}\n\
         **Minor threshold:** {} day(s), role {}\n\
         **Major threshold:** {} day(s), role {}",
        row.primary_pattern,
        row.minor_threshold,
        role(row.minor_role_id),
        row.major_threshold,
        role(row.major_role_id),
    )
}

fn course_summary_text(config: &CourseConfig) -> String {
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    let codes = if config.descriptors.is_empty() {
        "none (nobody can enrol yet)".to_string()
    } else {
        config.descriptors.join(", ")
    };

    format!(
        "✅ **Course settings updated**\n\
         **Delete empty chats:** {}\n\
         **Ignore admins when deleting:** {}\n\
         **Course codes:** {codes}",
        yes_no(config.auto_delete),
        yes_no(config.auto_delete_ignore_admins),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_handler_commands() {
        assert_eq!(
            SetupHandler.command_names(),
            &["setup_statistics", "setup_course"]
        );
    }

    #[test]
    fn test_summary_text() {
        let mut row = SettingsRow::defaults(1);
        let text = summary_text(&row);
        assert!(text.contains("not set (tracking is off)"));
        assert!(text.contains("`:scream1:`"));
        assert!(text.contains("**Minor threshold:** 100 day(s), role none"));

        row.channel_id = Some(5);
        row.major_role_id = Some(9);
        row.secondary_pattern = None;
        let text = summary_text(&row);
        assert!(text.contains("<#5>"));
        assert!(text.contains("role <@&9>"));
        assert!(text.contains("**Secondary pattern:** none"));
    }

    #[test]
    fn test_course_summary_text() {
        let mut config = CourseConfig::defaults(1);
        let text = course_summary_text(&config);
        assert!(text.contains("**Delete empty chats:** yes"));
        assert!(text.contains("**Ignore admins when deleting:** no"));
        assert!(text.contains("none (nobody can enrol yet)"));

        config.descriptors = vec!["CSSE".to_string(), "MATH".to_string()];
        assert!(course_summary_text(&config).contains("**Course codes:** CSSE, MATH"));
    }
}
