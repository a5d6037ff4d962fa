//! Streak command handlers
//!
//! Handles: stats, didiscream, leaderboard, save_streak
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use log::debug;
use serenity::builder::CreateEmbed;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::get_user_option;
use crate::core::time::{discord_timestamp, TimestampStyle};
use crate::core::{reply, reply_embed, StreakError};
use crate::database::LeaderboardEntry;
use crate::features::streaks::{Leaderboards, StreakRecord};

const LEADERBOARD_SIZE: usize = 5;
const STREAK_COLOR: u32 = 0xE67E22;

/// Handler for streak-related commands
pub struct StreakHandler;

#[async_trait]
impl SlashCommandHandler for StreakHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["stats", "didiscream", "leaderboard", "save_streak"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        match command.data.name.as_str() {
            "stats" => self.handle_stats(&ctx, serenity_ctx, command).await,
            "didiscream" => self.handle_did_i_scream(&ctx, serenity_ctx, command).await,
            "leaderboard" => self.handle_leaderboard(&ctx, serenity_ctx, command).await,
            "save_streak" => self.handle_save_streak(&ctx, serenity_ctx, command).await,
            _ => Ok(()),
        }
    }
}

impl StreakHandler {
    /// Handle /stats command - the caller's counters
    async fn handle_stats(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let record = ctx.tracker.stats(command.user.id.0).await?;

        let mut embed = CreateEmbed::default();
        embed.title(format!("📊 Scream stats for {}", command.user.name));
        embed.color(STREAK_COLOR);
        embed.description(stats_text(&record, Utc::now(), ctx.tracker.offset()));
        reply_embed(serenity_ctx, command, embed, false).await
    }

    /// Handle /didiscream command - whether a user counted today
    async fn handle_did_i_scream(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let target = get_user_option(&command.data.options, "user").unwrap_or(command.user.id.0);
        let screamed = ctx.tracker.counted_today(target, Utc::now()).await?;
        let is_self = target == command.user.id.0;

        let content = match (screamed, is_self) {
            (true, true) => "✅ Yes, you screamed today.".to_string(),
            (false, true) => "❌ Not yet today. Go scream!".to_string(),
            (true, false) => format!("✅ Yes, <@{target}> screamed today."),
            (false, false) => format!("❌ <@{target}> hasn't screamed today."),
        };

        reply(serenity_ctx, command, &content, true).await
    }

    /// Handle /leaderboard command - top screamers three ways
    async fn handle_leaderboard(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let boards = ctx.tracker.leaderboards(LEADERBOARD_SIZE as i64).await?;
        reply_embed(serenity_ctx, command, leaderboard_embed(&boards), false).await
    }

    /// Handle /save_streak command - the streak saver
    async fn handle_save_streak(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let content = match ctx.tracker.save_streak(command.user.id.0, Utc::now()).await {
            Ok(record) => format!(
                "🛟 Streak saved! It cost {} days and your streak is now **{}**. Scream today to keep it going.",
                ctx.tracker.rules().cost,
                record.current_streak
            ),
            Err(StreakError::Persistence(e)) => return Err(e),
            Err(rejected) => {
                debug!("Streak save rejected for {}: {rejected}", command.user.id);
                save_rejection_text(&rejected)
            }
        };

        reply(serenity_ctx, command, &content, true).await
    }
}

fn stats_text(record: &StreakRecord, now: DateTime<Utc>, offset: FixedOffset) -> String {
    let mut text = format!(
        "**Total screams:** {}\n**Current streak:** {} day(s)\n**Best streak:** {} day(s)",
        record.total_count, record.current_streak, record.best_streak
    );

    if record.current_streak > 0 {
        let missed = record.missed_days(now, offset);
        if missed > 0 && record.save_covers_gap(now, offset) {
            text.push_str("\n\n🛟 Your streak is saved. Scream by tomorrow to keep it going.");
        } else if missed > 0 {
            text.push_str(&format!(
                "\n\n⚠️ You missed {missed} day(s). Scream today to restart, or try `/save_streak`."
            ));
        }
    }
    text
}

fn save_rejection_text(error: &StreakError) -> String {
    match error {
        StreakError::TooRecent { next_allowed } => format!(
            "❌ You already saved a streak recently. Your next save is available {}.",
            discord_timestamp(*next_allowed, TimestampStyle::Relative)
        ),
        other => {
            let mut message = other.to_string();
            if let Some(first) = message.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            format!("❌ {message}.")
        }
    }
}

fn leaderboard_embed(boards: &Leaderboards) -> CreateEmbed {
    let mut embed = CreateEmbed::default();
    embed.title("🏆 Scream Leaderboard");
    embed.color(STREAK_COLOR);
    embed.field("Total screams", ranking_text(&boards.total), true);
    embed.field("Current streak", ranking_text(&boards.current), true);
    embed.field("Best streak", ranking_text(&boards.best), true);
    embed
}

/// Top rows, padded to a fixed length with placeholders
fn ranking_text(entries: &[LeaderboardEntry]) -> String {
    let mut lines: Vec<String> = entries
        .iter()
        .take(LEADERBOARD_SIZE)
        .map(|entry| format!("{}. <@{}> ({})", entry.rank, entry.user_id, entry.value))
        .collect();

    while lines.len() < LEADERBOARD_SIZE {
        lines.push(format!("{}. This could be you!", lines.len() + 1));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    fn brisbane() -> FixedOffset {
        FixedOffset::east_opt(10 * 3600).unwrap()
    }

    #[test]
    fn test_streak_handler_commands() {
        let names = StreakHandler.command_names();
        assert_eq!(names, &["stats", "didiscream", "leaderboard", "save_streak"]);
    }

    #[test]
    fn test_ranking_pads_with_placeholders() {
        let entries = vec![
            LeaderboardEntry {
                rank: 1,
                user_id: 10,
                value: 50,
            },
            LeaderboardEntry {
                rank: 1,
                user_id: 11,
                value: 50,
            },
        ];
        let text = ranking_text(&entries);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), LEADERBOARD_SIZE);
        assert_eq!(lines[0], "1. <@10> (50)");
        assert_eq!(lines[1], "1. <@11> (50)");
        assert_eq!(lines[2], "3. This could be you!");
        assert_eq!(lines[4], "5. This could be you!");
    }

    #[test]
    fn test_ranking_empty_board() {
        assert_eq!(ranking_text(&[]).matches("This could be you!").count(), 5);
    }

    #[test]
    fn test_stats_text_warns_about_missed_days() {
        let mut record = StreakRecord::new(1);
        record.total_count = 12;
        record.current_streak = 4;
        record.best_streak = 9;
        record.last_qualifying_day = (Utc::now() - Duration::days(3))
            .with_timezone(&brisbane())
            .date_naive();

        let text = stats_text(&record, Utc::now(), brisbane());
        assert!(text.contains("**Total screams:** 12"));
        assert!(text.contains("**Best streak:** 9 day(s)"));
        assert!(text.contains("You missed 2 day(s)"));
    }

    #[test]
    fn test_stats_text_no_warning_when_current() {
        let mut record = StreakRecord::new(1);
        record.current_streak = 4;
        record.last_qualifying_day = Utc::now().with_timezone(&brisbane()).date_naive();
        assert!(!stats_text(&record, Utc::now(), brisbane()).contains("missed"));
    }

    #[test]
    fn test_stats_text_after_save_drops_save_hint() {
        let now = Utc::now();
        let mut record = StreakRecord::new(1);
        record.current_streak = 40;
        record.last_qualifying_day = (now - Duration::days(2))
            .with_timezone(&brisbane())
            .date_naive();
        record.streak_saved_at = now - Duration::minutes(5);

        let text = stats_text(&record, now, brisbane());
        assert!(!text.contains("/save_streak"));
        assert!(text.contains("Your streak is saved"));

        // a save older than the gap does not count
        record.streak_saved_at = now - Duration::days(30);
        assert!(stats_text(&record, now, brisbane()).contains("/save_streak"));
    }

    #[test]
    fn test_save_rejection_text() {
        let text = save_rejection_text(&StreakError::TooShort {
            streak: 3,
            required: 30,
        });
        assert!(text.starts_with("❌ Your streak is 3 days"));

        let text = save_rejection_text(&StreakError::TooRecent {
            next_allowed: DateTime::<Utc>::UNIX_EPOCH,
        });
        assert!(text.contains("<t:0:R>"));
    }
}
