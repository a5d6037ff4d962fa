//! # Event Dispatch
//!
//! Slash commands go through the handler registry; guild messages go through
//! the scream listener.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use crate::commands::context::CommandContext;
use crate::commands::handlers::create_all_handlers;
use crate::commands::registry::CommandRegistry;
use crate::core::reply;
use crate::features::streaks::{EventMatch, SettingsRow, StreakUpdate};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serenity::http::Http;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::prelude::Context;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct CommandHandler {
    ctx: Arc<CommandContext>,
    registry: CommandRegistry,
}

impl CommandHandler {
    pub fn new(ctx: CommandContext) -> Self {
        let mut registry = CommandRegistry::new();
        for handler in create_all_handlers() {
            registry.register(handler);
        }
        debug!("Registered {} slash command handlers", registry.len());

        Self {
            ctx: Arc::new(ctx),
            registry,
        }
    }

    pub async fn handle_slash_command(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let request_id = Uuid::new_v4();
        let guild_id = command
            .guild_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "DM".to_string());

        info!(
            "[{}] 📥 Slash command received | Command: {} | User: {} | Channel: {} | Guild: {}",
            request_id, command.data.name, command.user.id, command.channel_id, guild_id
        );

        let Some(handler) = self.registry.get(&command.data.name) else {
            warn!("[{}] ❓ No handler for command: {}", request_id, command.data.name);
            return reply(ctx, command, "❌ Unknown command.", true).await;
        };

        handler.handle(Arc::clone(&self.ctx), ctx, command).await?;
        info!("[{request_id}] ✅ Slash command completed");
        Ok(())
    }

    /// Count screams posted in a guild's statistics channel
    pub async fn handle_message(&self, ctx: &Context, msg: &Message) -> Result<()> {
        if msg.author.bot {
            return Ok(());
        }
        let Some(guild_id) = msg.guild_id else {
            return Ok(());
        };
        let Some(settings) = self.ctx.settings.get(guild_id.0).await? else {
            return Ok(());
        };

        match settings.classify(msg.channel_id.0, &msg.content) {
            EventMatch::Ignored => Ok(()),
            EventMatch::MentionOnly => {
                let record = self.ctx.tracker.record_mention(msg.author.id.0).await?;
                debug!(
                    "📣 Counted mention for {} (total {})",
                    msg.author.id, record.total_count
                );
                Ok(())
            }
            EventMatch::Qualifying => {
                let update = self
                    .ctx
                    .tracker
                    .record_event(msg.author.id.0, message_time(msg))
                    .await?;
                debug!(
                    "😱 Counted scream for {} (streak {}, total {})",
                    msg.author.id, update.record.current_streak, update.record.total_count
                );

                if update.new_day {
                    let outlet = SerenityOutlet {
                        http: &ctx.http,
                        channel_id: msg.channel_id,
                        guild_id,
                        user_id: msg.author.id,
                    };
                    celebrate(&outlet, &update, &settings.row).await;
                }
                Ok(())
            }
        }
    }
}

/// Where milestone messages and role grants go
#[async_trait]
trait MilestoneOutlet: Send + Sync {
    async fn announce(&self, line: &str) -> Result<()>;
    async fn grant_role(&self, role_id: u64) -> Result<()>;
}

/// Posts in the scream channel and grants roles to the author
struct SerenityOutlet<'a> {
    http: &'a Http,
    channel_id: ChannelId,
    guild_id: GuildId,
    user_id: UserId,
}

#[async_trait]
impl MilestoneOutlet for SerenityOutlet<'_> {
    async fn announce(&self, line: &str) -> Result<()> {
        self.channel_id.say(self.http, line).await?;
        Ok(())
    }

    async fn grant_role(&self, role_id: u64) -> Result<()> {
        self.http
            .add_member_role(
                self.guild_id.0,
                self.user_id.0,
                role_id,
                Some("Reached a scream streak milestone"),
            )
            .await?;
        Ok(())
    }
}

/// Announce the day's scream and grant threshold roles
///
/// Every step is best-effort: a failed message never blocks a role grant.
async fn celebrate(outlet: &dyn MilestoneOutlet, update: &StreakUpdate, row: &SettingsRow) {
    let user = update.record.user_id;

    for line in milestone_messages(update, row) {
        if let Err(e) = outlet.announce(&line).await {
            warn!("⚠️ Failed to post milestone message for {user}: {e:#}");
        }
    }

    for role_id in roles_to_grant(update, row) {
        match outlet.grant_role(role_id).await {
            Ok(()) => info!("🏅 Granted role {} to {user}", RoleId(role_id)),
            Err(e) => warn!("⚠️ Failed to grant role {role_id} to {user}: {e:#}"),
        }
    }
}

/// When Discord says the message was sent, falling back to now
fn message_time(msg: &Message) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(msg.timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}

/// Messages posted after the first scream of a day
fn milestone_messages(update: &StreakUpdate, row: &SettingsRow) -> Vec<String> {
    let user = update.record.user_id;
    let streak = update.record.current_streak;
    let mut lines = vec![format!(
        "Congrats <@{user}> on your first scream of the day.\nYour current streak is: {streak}."
    )];

    for threshold in [row.minor_threshold, row.major_threshold] {
        if update.crossed(threshold) && !lines.iter().any(|l| l.ends_with(&format!("{threshold}!"))) {
            lines.push(format!("Congrats on reaching {threshold}!"));
        }
    }
    lines
}

/// Configured roles whose threshold this update crossed
fn roles_to_grant(update: &StreakUpdate, row: &SettingsRow) -> Vec<u64> {
    [
        (row.minor_threshold, row.minor_role_id),
        (row.major_threshold, row.major_role_id),
    ]
    .into_iter()
    .filter(|(threshold, _)| update.crossed(*threshold))
    .filter_map(|(_, role)| role)
    .collect()
}
