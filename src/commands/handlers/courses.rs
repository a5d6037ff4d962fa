//! Course command handlers
//!
//! Handles: course, enrollment
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use serenity::builder::CreateEmbed;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::commands::handlers::invoked_by_manager;
use crate::commands::slash::{get_bool_option, get_channel_option, get_string_option, get_user_option, subcommand};
use crate::core::response::{defer, edit_reply, edit_reply_embed, reply, truncate_to, EMBED_LIMIT};
use crate::core::CourseError;
use crate::features::courses::model::CourseChannelRow;
use crate::features::courses::{CourseSummary, DropOutcome, ResetReport, SerenityGuild, SyncReport};

const LIST_COLOR: u32 = 0x3498DB;

/// Subcommands of /course anyone may run
const MEMBER_SUBCOMMANDS: &[&str] = &["enrol", "drop", "show"];

/// Handler for course chats and enrollment records
pub struct CourseHandler;

#[async_trait]
impl SlashCommandHandler for CourseHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["course", "enrollment"]
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
                "❌ Course chats only exist inside a server.",
                true,
            )
            .await;
        };
        let Some((name, options)) = subcommand(&command.data.options) else {
            return reply(serenity_ctx, command, "❌ Missing subcommand.", true).await;
        };

        let admin_only = command.data.name == "enrollment" || !MEMBER_SUBCOMMANDS.contains(&name);
        if admin_only && !invoked_by_manager(command) {
            debug!(
                "Refused /{} {name} for {} in guild {guild_id}",
                command.data.name, command.user.id
            );
            return reply(
                serenity_ctx,
                command,
                "❌ Only server managers can do that.",
                true,
            )
            .await;
        }

        // channel work can outlast the three second answer window
        defer(serenity_ctx, command, true).await?;

        let guild = SerenityGuild::new(serenity_ctx, guild_id);
        let courses = &ctx.courses;
        let (guild_id, user_id) = (guild_id.0, command.user.id.0);

        let outcome: Result<String, CourseError> = match (command.data.name.as_str(), name) {
            ("course", "enrol") => match course_code(options) {
                Ok(code) => courses
                    .enrol(&guild, guild_id, user_id, &code)
                    .await
                    .map(|summary| enrolled_text(&summary)),
                Err(e) => Err(e),
            },
            ("course", "drop") => match course_code(options) {
                Ok(code) => courses
                    .drop_course(&guild, guild_id, user_id, &code)
                    .await
                    .map(|outcome| dropped_text(&outcome)),
                Err(e) => Err(e),
            },
            ("course", "show") => match course_code(options) {
                Ok(code) => courses
                    .show(&guild, &code)
                    .await
                    .map(|summary| show_text(&code, summary.as_ref())),
                Err(e) => Err(e),
            },
            ("course", "reset") => {
                let channel = required_channel(options)?;
                courses
                    .reset(&guild, guild_id, channel)
                    .await
                    .map(|fresh| format!("🧹 Cleared the history of <#{}>.", fresh.id))
            }
            ("course", "reset_exception") => {
                let channel = required_channel(options)?;
                let exception = get_bool_option(options, "exception").unwrap_or(true);
                courses
                    .set_reset_exception(guild_id, channel, exception)
                    .await
                    .map(|()| exception_text(channel, exception))
            }
            ("course", "reset_all") => courses
                .reset_all(&guild, guild_id)
                .await
                .map(|report| reset_all_text(&report)),
            ("course", "sync") => courses
                .sync(&guild, guild_id)
                .await
                .map(|report| sync_text(&report)),
            ("course", "clean") => courses
                .clean(&guild, guild_id)
                .await
                .map(|deleted| clean_text(&deleted)),
            ("course", "delete") => {
                let channel = required_channel(options)?;
                courses
                    .delete(&guild, guild_id, channel)
                    .await
                    .map(|name| format!("🗑️ Deleted **{name}**."))
            }
            ("enrollment", "list") => {
                let target = get_user_option(options, "user").unwrap_or(user_id);
                let rows = courses.list_enrollments(guild_id, target).await?;
                let embed = enrollment_embed(target, &rows);
                info!("Listed {} enrollment(s) of {target} in guild {guild_id}", rows.len());
                return edit_reply_embed(serenity_ctx, command, "", embed).await;
            }
            ("enrollment", "purge") => {
                let target = get_user_option(options, "user").unwrap_or(user_id);
                let removed = courses.purge_enrollments(guild_id, target).await?;
                Ok(format!("🧹 Forgot {removed} enrollment(s) of <@{target}>."))
            }
            (command_name, other) => {
                debug!("Unknown subcommand /{command_name} {other}");
                Ok("❌ Unknown subcommand.".to_string())
            }
        };

        match outcome {
            Ok(text) => edit_reply(serenity_ctx, command, &text).await,
            Err(CourseError::Internal(e)) => Err(e),
            Err(rejected) => {
                debug!(
                    "Rejected /{} {name} for {user_id}: {rejected}",
                    command.data.name
                );
                edit_reply(serenity_ctx, command, &format!("❌ {}", capitalize(&rejected.to_string())))
                    .await
            }
        }
    }
}

fn course_code(options: &[CommandDataOption]) -> Result<String, CourseError> {
    get_string_option(options, "course_code")
        .ok_or_else(|| CourseError::InvalidCode(String::new()))
}

fn required_channel(options: &[CommandDataOption]) -> Result<u64> {
    get_channel_option(options, "channel").ok_or_else(|| anyhow::anyhow!("Missing channel parameter"))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn people(count: usize) -> String {
    if count == 1 {
        "1 person".to_string()
    } else {
        format!("{count} people")
    }
}

fn enrolled_text(summary: &CourseSummary) -> String {
    format!(
        "✅ You're in <#{}>. {} enrolled so far.",
        summary.channel_id,
        people(summary.members)
    )
}

fn dropped_text(outcome: &DropOutcome) -> String {
    let name = &outcome.summary.name;
    match (outcome.channel_deleted, outcome.category_deleted) {
        (true, true) => format!("👋 Dropped **{name}**. You were the last one, so the chat and its category are gone."),
        (true, false) => format!("👋 Dropped **{name}**. You were the last one, so the chat is gone."),
        _ => format!(
            "👋 Dropped **{name}**. {} still enrolled.",
            people(outcome.summary.members)
        ),
    }
}

fn show_text(code: &str, summary: Option<&CourseSummary>) -> String {
    match summary {
        Some(summary) => format!(
            "📚 <#{}> has {} enrolled.",
            summary.channel_id,
            people(summary.members)
        ),
        None => format!(
            "📚 Nobody has joined {} yet. Use `/course enrol` to start the chat.",
            code.trim().to_ascii_uppercase()
        ),
    }
}

fn exception_text(channel: u64, exception: bool) -> String {
    if exception {
        format!("🛡️ <#{channel}> will be skipped by `/course reset_all`.")
    } else {
        format!("🧹 <#{channel}> will be cleared by `/course reset_all` again.")
    }
}

fn reset_all_text(report: &ResetReport) -> String {
    format!(
        "🧹 Cleared {} course chat(s), skipped {} exception(s).",
        report.reset, report.skipped
    )
}

fn sync_text(report: &SyncReport) -> String {
    if *report == SyncReport::default() {
        return "🔄 Course records already match the server.".to_string();
    }
    format!(
        "🔄 Synced course records: {} channel(s) added, {} removed, {} enrollment(s) added, {} removed.",
        report.channels_added,
        report.channels_removed,
        report.enrollments_added,
        report.enrollments_removed
    )
}

fn clean_text(deleted: &[String]) -> String {
    if deleted.is_empty() {
        "🧹 Every course chat has members, nothing to clean.".to_string()
    } else {
        let names: Vec<String> = deleted.iter().map(|n| format!("**{n}**")).collect();
        format!("🧹 Deleted {} empty course chat(s): {}", deleted.len(), names.join(", "))
    }
}

fn enrollment_embed(user_id: u64, rows: &[CourseChannelRow]) -> CreateEmbed {
    let description = if rows.is_empty() {
        format!("<@{user_id}> is not enrolled in any course chat.")
    } else {
        let lines: Vec<String> = rows
            .iter()
            .map(|row| format!("• <#{}> ({})", row.channel_id, row.name))
            .collect();
        truncate_to(&format!("<@{user_id}>\n{}", lines.join("\n")), EMBED_LIMIT)
    };

    let mut embed = CreateEmbed::default();
    embed
        .title(format!("📚 Enrollments ({})", rows.len()))
        .description(description)
        .color(LIST_COLOR);
    embed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(members: usize) -> CourseSummary {
        CourseSummary {
            channel_id: 42,
            name: "csse1001".to_string(),
            members,
        }
    }

    #[test]
    fn test_course_handler_commands() {
        assert_eq!(CourseHandler.command_names(), &["course", "enrollment"]);
        assert!(MEMBER_SUBCOMMANDS.contains(&"enrol"));
        assert!(!MEMBER_SUBCOMMANDS.contains(&"reset_all"));
    }

    #[test]
    fn test_enrol_and_show_text() {
        assert_eq!(
            enrolled_text(&summary(1)),
            "✅ You're in <#42>. 1 person enrolled so far."
        );
        assert!(show_text("csse1001", Some(&summary(3))).contains("3 people"));
        assert!(show_text(" csse1001", None).contains("CSSE1001"));
    }

    #[test]
    fn test_dropped_text() {
        let kept = DropOutcome {
            summary: summary(2),
            channel_deleted: false,
            category_deleted: false,
        };
        assert!(dropped_text(&kept).ends_with("2 people still enrolled."));

        let gone = DropOutcome {
            channel_deleted: true,
            category_deleted: true,
            ..kept
        };
        assert!(dropped_text(&gone).contains("its category"));
    }

    #[test]
    fn test_report_texts() {
        assert!(sync_text(&SyncReport::default()).contains("already match"));
        let report = SyncReport {
            channels_added: 1,
            enrollments_removed: 4,
            ..Default::default()
        };
        assert!(sync_text(&report).contains("1 channel(s) added"));
        assert!(sync_text(&report).contains("4 removed."));

        assert!(clean_text(&[]).contains("nothing to clean"));
        assert!(clean_text(&["csse9999".to_string()]).contains("**csse9999**"));
        assert_eq!(
            reset_all_text(&ResetReport { reset: 2, skipped: 1 }),
            "🧹 Cleared 2 course chat(s), skipped 1 exception(s)."
        );
    }

    #[test]
    fn test_rejections_read_as_sentences() {
        let err = CourseError::NotEnrolled("CSSE1001".to_string());
        assert_eq!(capitalize(&err.to_string()), "You are not enrolled in CSSE1001");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_enrollment_embed() {
        let empty = enrollment_embed(7, &[]);
        let description = empty.0.get("description").unwrap().as_str().unwrap();
        assert!(description.contains("not enrolled"));

        let row = CourseChannelRow {
            channel_id: 42,
            guild_id: 1,
            name: "csse1001".to_string(),
            is_category: false,
            do_not_reset: false,
        };
        let listed = enrollment_embed(7, &[row]);
        let description = listed.0.get("description").unwrap().as_str().unwrap();
        assert!(description.contains("<#42> (csse1001)"));
    }
}
