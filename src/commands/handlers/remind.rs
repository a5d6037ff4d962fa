//! Reminder command handlers
//!
//! Handles: remind, reminders, all_reminders
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serenity::builder::CreateEmbed;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::commands::handlers::invoked_by_manager;
use crate::commands::slash::{get_bool_option, get_integer_option, get_string_option};
use crate::core::response::{reply, reply_embed, truncate_for_field, truncate_to, EMBED_LIMIT};
use crate::core::time::{discord_timestamp, format_duration, TimestampStyle};
use crate::core::ReminderError;
use crate::features::reminders::{CancelOutcome, Reminder};

const CONFIRM_COLOR: u32 = 0x2ECC71;
const LIST_COLOR: u32 = 0x3498DB;

/// Handler for reminder-related commands
pub struct RemindHandler;

#[async_trait]
impl SlashCommandHandler for RemindHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["remind", "reminders", "all_reminders"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        match command.data.name.as_str() {
            "remind" => self.handle_remind(&ctx, serenity_ctx, command).await,
            "reminders" => self.handle_reminders(&ctx, serenity_ctx, command).await,
            "all_reminders" => self.handle_all_reminders(&ctx, serenity_ctx, command).await,
            _ => Ok(()),
        }
    }
}

impl RemindHandler {
    /// Handle /remind command - create a new reminder
    async fn handle_remind(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let time_str = get_string_option(&command.data.options, "time")
            .ok_or_else(|| anyhow::anyhow!("Missing time parameter"))?;
        let message = get_string_option(&command.data.options, "message")
            .ok_or_else(|| anyhow::anyhow!("Missing message parameter"))?;
        let repeat = get_bool_option(&command.data.options, "repeat").unwrap_or(false);

        let created = ctx
            .scheduler
            .create(
                command.user.id.0,
                command.channel_id.0,
                &time_str,
                &message,
                repeat,
            )
            .await;

        match created {
            Ok(reminder) => {
                info!(
                    "Created reminder #{} for user {} (repeat: {})",
                    reminder.id, reminder.owner, reminder.repeat
                );
                reply_embed(serenity_ctx, command, confirmation_embed(&reminder), false).await
            }
            Err(ReminderError::Validation(reason)) => {
                debug!("Rejected /remind from {}: {reason}", command.user.id);
                reply(serenity_ctx, command, &format!("❌ {reason}"), true).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Handle /reminders command - list or cancel reminders
    async fn handle_reminders(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let action = get_string_option(&command.data.options, "action")
            .unwrap_or_else(|| "list".to_string());

        match action.as_str() {
            "cancel" => self.handle_cancel_reminder(ctx, serenity_ctx, command).await,
            _ => self.handle_list_reminders(ctx, serenity_ctx, command).await,
        }
    }

    /// Cancel a specific reminder
    async fn handle_cancel_reminder(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let Some(id) = get_integer_option(&command.data.options, "id") else {
            return reply(
                serenity_ctx,
                command,
                "❌ Please provide a reminder ID to cancel. Use `/reminders` to see your reminder IDs.",
                true,
            )
            .await;
        };

        let content = match ctx.scheduler.cancel(id, command.user.id.0).await {
            Ok(CancelOutcome::Cancelled(_)) => format!("✅ Cancelled reminder #{id}."),
            Ok(CancelOutcome::AlreadyGone) => {
                format!("ℹ️ Reminder #{id} no longer exists. It may have already fired.")
            }
            Err(ReminderError::NotAuthorized { id }) => {
                format!("❌ Reminder #{id} doesn't belong to you.")
            }
            Err(e) => return Err(e.into()),
        };

        reply(serenity_ctx, command, &content, true).await
    }

    /// List the caller's pending reminders
    async fn handle_list_reminders(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let reminders = ctx.database.get_user_reminders(command.user.id.0).await?;

        if reminders.is_empty() {
            return reply(
                serenity_ctx,
                command,
                "📋 You don't have any pending reminders.\n\nUse `/remind <time> <message>` to create one!",
                true,
            )
            .await;
        }

        let embed = list_embed(
            "Your Reminders",
            &reminders,
            Utc::now(),
            false,
            Some("Use /reminders cancel <id> to cancel a reminder."),
        );
        reply_embed(serenity_ctx, command, embed, true).await
    }

    /// Handle /all_reminders command - every pending reminder (admin)
    async fn handle_all_reminders(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        if !invoked_by_manager(command) {
            debug!(
                "Refused /all_reminders for {} (guild: {:?})",
                command.user.id, command.guild_id
            );
            return reply(
                serenity_ctx,
                command,
                "❌ Only server managers can list every reminder, and only inside a server.",
                true,
            )
            .await;
        }

        let reminders = ctx.database.get_all_reminders().await?;

        if reminders.is_empty() {
            return reply(serenity_ctx, command, "📋 There are no pending reminders.", true).await;
        }

        let embed = list_embed("All Reminders", &reminders, Utc::now(), true, None);
        reply_embed(serenity_ctx, command, embed, true).await
    }
}

fn confirmation_embed(reminder: &Reminder) -> CreateEmbed {
    let mut embed = CreateEmbed::default();
    embed.title("✅ Reminder Set");
    embed.color(CONFIRM_COLOR);
    embed.description(confirmation_text(reminder));
    embed.field("Message", truncate_for_field(&reminder.message), false);
    embed.footer(|f| f.text(format!("Reminder ID: {}", reminder.id)));
    embed
}

fn confirmation_text(reminder: &Reminder) -> String {
    let due = discord_timestamp(reminder.send_time, TimestampStyle::Relative);
    if reminder.repeat {
        format!(
            "I'll remind you {due}, then every {}.",
            format_duration(reminder.interval().num_seconds())
        )
    } else {
        format!("I'll remind you {due}.")
    }
}

fn list_embed(
    title: &str,
    reminders: &[Reminder],
    now: DateTime<Utc>,
    show_owner: bool,
    footer: Option<&str>,
) -> CreateEmbed {
    let mut embed = CreateEmbed::default();
    embed.title(title);
    embed.color(LIST_COLOR);
    embed.description(list_text(reminders, now, show_owner));
    if let Some(footer) = footer {
        embed.footer(|f| f.text(footer));
    }
    embed
}

/// One block per reminder, cut to the embed description limit
fn list_text(reminders: &[Reminder], now: DateTime<Utc>, show_owner: bool) -> String {
    let mut text = format!("{} pending reminder(s)\n\n", reminders.len());

    for reminder in reminders {
        let due = discord_timestamp(reminder.next_fire_at(now), TimestampStyle::Relative);
        let repeat = if reminder.repeat {
            format!(
                " • 🔁 every {}",
                format_duration(reminder.interval().num_seconds())
            )
        } else {
            String::new()
        };
        let owner = if show_owner {
            format!(" • <@{}>", reminder.owner)
        } else {
            String::new()
        };

        text.push_str(&format!(
            "**#{}** • due {due}{repeat}{owner} • <#{}>\n> {}\n\n",
            reminder.id,
            reminder.destination,
            truncate_to(&reminder.message, 200)
        ));
    }

    truncate_to(text.trim_end(), EMBED_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn reminder(id: i64, repeat: bool) -> Reminder {
        let requested = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        Reminder {
            id,
            owner: 42,
            destination: 7,
            message: format!("task {id}"),
            send_time: requested + Duration::hours(12),
            requested_time: requested,
            repeat,
        }
    }

    #[test]
    fn test_remind_handler_commands() {
        let handler = RemindHandler;
        let names = handler.command_names();

        assert!(names.contains(&"remind"));
        assert!(names.contains(&"reminders"));
        assert!(names.contains(&"all_reminders"));
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_confirmation_text() {
        let one_off = reminder(1, false);
        let text = confirmation_text(&one_off);
        assert_eq!(
            text,
            format!("I'll remind you <t:{}:R>.", one_off.send_time.timestamp())
        );

        assert!(confirmation_text(&reminder(2, true)).ends_with("then every 12 hours."));
    }

    #[test]
    fn test_list_text_owner_column() {
        let reminders = vec![reminder(1, false), reminder(2, true)];
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();

        let own = list_text(&reminders, now, false);
        assert!(own.starts_with("2 pending reminder(s)"));
        assert!(own.contains("**#1**"));
        assert!(own.contains("🔁 every 12 hours"));
        assert!(!own.contains("<@42>"));

        let all = list_text(&reminders, now, true);
        assert!(all.contains("<@42>"));
        assert!(all.contains("<#7>"));
    }

    #[test]
    fn test_list_text_fits_embed() {
        let reminders: Vec<Reminder> = (1..=200).map(|id| reminder(id, false)).collect();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert!(list_text(&reminders, now, true).len() <= EMBED_LIMIT);
    }
}
