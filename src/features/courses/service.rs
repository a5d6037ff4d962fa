//! # Course Channel Provisioning
//!
//! Members enrol in course chats by code; the bot creates the channel (and
//! its category) on first use, grants access, and cleans up after the last
//! member leaves.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Every operation takes the guild as a `GuildChannels` so the rules here
//! run the same against Discord and against an in-memory guild.

use crate::core::CourseError;
use crate::database::Database;
use crate::features::courses::guild::GuildChannels;
use crate::features::courses::model::{
    category_position, channel_position, course_text_channels, descriptor_of, enrolled_members,
    plan_sync, should_auto_delete, ChannelInfo, ChannelKind, CourseChannelRow, CourseCode,
    CourseConfig, CourseConfigUpdate, LiveCourseChannel,
};
use crate::features::courses::verifier::CourseVerifier;
use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;

/// A course channel and how many people are enrolled in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub channel_id: u64,
    pub name: String,
    pub members: usize,
}

/// What `/course drop` did besides removing access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOutcome {
    pub summary: CourseSummary,
    pub channel_deleted: bool,
    pub category_deleted: bool,
}

/// Counts reported by `/course reset_all`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub reset: usize,
    pub skipped: usize,
}

/// Counts reported by `/course sync`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub channels_added: usize,
    pub channels_removed: usize,
    pub enrollments_added: usize,
    pub enrollments_removed: usize,
}

#[derive(Clone)]
pub struct CourseService {
    database: Database,
    verifier: Arc<dyn CourseVerifier>,
}

impl CourseService {
    pub fn new(database: Database, verifier: Arc<dyn CourseVerifier>) -> Self {
        Self { database, verifier }
    }

    /// Stored settings, or the defaults for a guild that never ran setup
    pub async fn config(&self, guild_id: u64) -> Result<CourseConfig> {
        Ok(self
            .database
            .get_course_config(guild_id)
            .await?
            .unwrap_or_else(|| CourseConfig::defaults(guild_id)))
    }

    pub async fn update_config(
        &self,
        guild_id: u64,
        update: &CourseConfigUpdate,
    ) -> Result<CourseConfig, CourseError> {
        let next = self.config(guild_id).await?.apply(update)?;
        self.database.save_course_config(&next).await?;
        info!(
            "📚 Course settings for guild {guild_id}: auto_delete={}, ignore_admins={}, codes=[{}]",
            next.auto_delete,
            next.auto_delete_ignore_admins,
            next.descriptors.join(", ")
        );
        Ok(next)
    }

    /// Parse and look up a code typed by a member
    async fn verified_code(&self, raw: &str) -> Result<CourseCode, CourseError> {
        let code = CourseCode::parse(raw)?;
        if !self.verifier.verify(&code).await? {
            return Err(CourseError::UnknownCourse(code.to_string()));
        }
        Ok(code)
    }

    /// Give `user_id` access to the course chat, creating it if needed
    pub async fn enrol(
        &self,
        guild: &dyn GuildChannels,
        guild_id: u64,
        user_id: u64,
        raw_code: &str,
    ) -> Result<CourseSummary, CourseError> {
        let code = self.verified_code(raw_code).await?;
        let config = self.config(guild_id).await?;
        config.check_allowed(&code)?;

        let channel = self.get_or_create_channel(guild, guild_id, &code, &config).await?;
        let members = guild.members(channel.id).await?;
        if members.iter().any(|m| m.user_id == user_id) {
            return Err(CourseError::AlreadyEnrolled(code.to_string()));
        }

        guild.grant_access(channel.id, user_id).await?;
        self.database
            .add_enrollment(guild_id, channel.id, user_id)
            .await?;
        info!("📚 {user_id} enrolled in {code} (guild {guild_id})");

        self.summary(guild, &channel).await
    }

    /// Take away `user_id`'s access, deleting the chat once nobody is left
    pub async fn drop_course(
        &self,
        guild: &dyn GuildChannels,
        guild_id: u64,
        user_id: u64,
        raw_code: &str,
    ) -> Result<DropOutcome, CourseError> {
        let code = self.verified_code(raw_code).await?;
        let channels = guild.channels().await?;
        let channel = find_text_channel(&channels, &code.channel_name())
            .cloned()
            .ok_or_else(|| CourseError::NoSuchChannel(code.to_string()))?;

        let members = guild.members(channel.id).await?;
        if !members.iter().any(|m| m.user_id == user_id) {
            return Err(CourseError::NotEnrolled(code.to_string()));
        }

        guild.revoke_access(channel.id, user_id).await?;
        self.database
            .remove_enrollment(guild_id, channel.id, user_id)
            .await?;
        info!("📚 {user_id} dropped {code} (guild {guild_id})");

        let remaining: Vec<_> = members
            .into_iter()
            .filter(|m| m.user_id != user_id)
            .collect();
        let summary = CourseSummary {
            channel_id: channel.id,
            name: channel.name.clone(),
            members: enrolled_members(&remaining).len(),
        };

        let config = self.config(guild_id).await?;
        if !should_auto_delete(&config, &remaining) {
            return Ok(DropOutcome {
                summary,
                channel_deleted: false,
                category_deleted: false,
            });
        }

        self.remove_channel(guild, guild_id, channel.id).await?;
        info!("🗑️ Deleted empty course channel #{}", channel.name);

        // the category goes too once its last course is gone
        let empty_category = channel.parent_id.filter(|&parent| {
            let is_course_category = channels.iter().any(|c| {
                c.id == parent && c.name.eq_ignore_ascii_case(code.category_name())
            });
            let has_siblings = channels
                .iter()
                .any(|c| c.parent_id == Some(parent) && c.id != channel.id);
            is_course_category && !has_siblings
        });
        let category_deleted = match empty_category {
            Some(parent) => {
                self.remove_channel(guild, guild_id, parent).await?;
                info!("🗑️ Deleted empty course category {}", code.category_name());
                true
            }
            None => false,
        };

        Ok(DropOutcome {
            summary,
            channel_deleted: true,
            category_deleted,
        })
    }

    /// Member count of a course chat; `None` when it does not exist yet
    pub async fn show(
        &self,
        guild: &dyn GuildChannels,
        raw_code: &str,
    ) -> Result<Option<CourseSummary>, CourseError> {
        let code = self.verified_code(raw_code).await?;
        let channels = guild.channels().await?;
        match find_text_channel(&channels, &code.channel_name()) {
            Some(channel) => Ok(Some(self.summary(guild, channel).await?)),
            None => Ok(None),
        }
    }

    /// Clear a course chat's history by recreating it
    pub async fn reset(
        &self,
        guild: &dyn GuildChannels,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<ChannelInfo, CourseError> {
        let row = self
            .database
            .get_course_channel(guild_id, channel_id)
            .await?
            .filter(|row| !row.is_category)
            .ok_or(CourseError::NotACourseChannel(channel_id))?;
        self.reset_row(guild, guild_id, &row).await
    }

    async fn reset_row(
        &self,
        guild: &dyn GuildChannels,
        guild_id: u64,
        row: &CourseChannelRow,
    ) -> Result<ChannelInfo, CourseError> {
        let fresh = guild.recreate_channel(row.channel_id).await?;
        self.database
            .replace_course_channel(guild_id, row.channel_id, fresh.id)
            .await?;
        info!("🧹 Reset course channel #{} ({} -> {})", row.name, row.channel_id, fresh.id);
        Ok(fresh)
    }

    /// Reset every managed course chat except the exceptions
    pub async fn reset_all(
        &self,
        guild: &dyn GuildChannels,
        guild_id: u64,
    ) -> Result<ResetReport, CourseError> {
        let live: Vec<u64> = guild.channels().await?.iter().map(|c| c.id).collect();
        let mut report = ResetReport::default();

        for row in self.database.get_course_channels(guild_id).await? {
            if row.is_category || !live.contains(&row.channel_id) {
                continue;
            }
            if row.do_not_reset {
                report.skipped += 1;
                continue;
            }
            self.reset_row(guild, guild_id, &row).await?;
            report.reset += 1;
        }
        Ok(report)
    }

    /// Mark or unmark a course chat as skipped by `reset_all`
    pub async fn set_reset_exception(
        &self,
        guild_id: u64,
        channel_id: u64,
        exception: bool,
    ) -> Result<(), CourseError> {
        if self
            .database
            .set_do_not_reset(guild_id, channel_id, exception)
            .await?
        {
            Ok(())
        } else {
            Err(CourseError::NotACourseChannel(channel_id))
        }
    }

    /// Bring the stored channels and enrollments in line with the guild
    pub async fn sync(
        &self,
        guild: &dyn GuildChannels,
        guild_id: u64,
    ) -> Result<SyncReport, CourseError> {
        let config = self.config(guild_id).await?;
        let channels = guild.channels().await?;
        let stored = self.database.get_course_channels(guild_id).await?;
        let enrollments = self.database.get_guild_enrollments(guild_id).await?;

        let course_ids: Vec<u64> = course_text_channels(&channels, &config)
            .iter()
            .map(|c| c.id)
            .collect();
        let mut live = Vec::new();
        for channel in &channels {
            let stored_here = stored.iter().any(|row| row.channel_id == channel.id);
            let course_category =
                channel.kind == ChannelKind::Category && config.is_course_descriptor(&channel.name);
            if !stored_here && !course_category && !course_ids.contains(&channel.id) {
                continue;
            }
            let members = if channel.kind == ChannelKind::Text {
                enrolled_members(&guild.members(channel.id).await?)
            } else {
                Vec::new()
            };
            live.push(LiveCourseChannel {
                channel: channel.clone(),
                members,
            });
        }

        let plan = plan_sync(guild_id, &stored, &enrollments, &live);
        if plan.is_empty() {
            debug!("Course bookkeeping for guild {guild_id} already in sync");
        } else {
            self.database.apply_course_sync(guild_id, &plan).await?;
        }

        let report = SyncReport {
            channels_added: plan.added_channels.len(),
            channels_removed: plan.removed_channels.len(),
            enrollments_added: plan.added_enrollments.len(),
            enrollments_removed: plan.removed_enrollments.len(),
        };
        info!("🔄 Synced courses for guild {guild_id}: {report:?}");
        Ok(report)
    }

    /// Delete course chats nobody is enrolled in; returns their names
    pub async fn clean(
        &self,
        guild: &dyn GuildChannels,
        guild_id: u64,
    ) -> Result<Vec<String>, CourseError> {
        let config = self.config(guild_id).await?;
        let channels = guild.channels().await?;
        let enrollments = self.database.get_guild_enrollments(guild_id).await?;

        let mut deleted = Vec::new();
        for channel in course_text_channels(&channels, &config) {
            if enrollments.get(&channel.id).is_some_and(|users| !users.is_empty()) {
                continue;
            }
            self.remove_channel(guild, guild_id, channel.id).await?;
            deleted.push(channel.name.clone());
        }
        info!("🧹 Cleaned {} empty course channel(s) in guild {guild_id}", deleted.len());
        Ok(deleted)
    }

    /// Delete a course chat or a whole course category
    pub async fn delete(
        &self,
        guild: &dyn GuildChannels,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<String, CourseError> {
        let config = self.config(guild_id).await?;
        let channels = guild.channels().await?;
        let channel = channels
            .iter()
            .find(|c| c.id == channel_id)
            .ok_or(CourseError::NotACourseChannel(channel_id))?;

        let is_category = channel.kind == ChannelKind::Category;
        let is_course = descriptor_of(&channel.name, is_category)
            .is_some_and(|descriptor| config.is_course_descriptor(&descriptor));
        if !is_course || channel.kind == ChannelKind::Other {
            return Err(CourseError::NotACourseChannel(channel_id));
        }

        if is_category {
            for child in channels.iter().filter(|c| c.parent_id == Some(channel_id)) {
                self.remove_channel(guild, guild_id, child.id).await?;
            }
        }
        self.remove_channel(guild, guild_id, channel_id).await?;
        info!("🗑️ Deleted course channel {} in guild {guild_id}", channel.name);
        Ok(channel.name.clone())
    }

    /// Forget every enrollment of a user; access overwrites stay in place
    pub async fn purge_enrollments(&self, guild_id: u64, user_id: u64) -> Result<i64> {
        let removed = self.database.purge_enrollments(guild_id, user_id).await?;
        info!("🧹 Purged {removed} enrollment(s) of {user_id} in guild {guild_id}");
        Ok(removed)
    }

    pub async fn list_enrollments(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<CourseChannelRow>> {
        self.database.get_user_enrollments(guild_id, user_id).await
    }

    async fn summary(
        &self,
        guild: &dyn GuildChannels,
        channel: &ChannelInfo,
    ) -> Result<CourseSummary, CourseError> {
        let members = guild.members(channel.id).await?;
        Ok(CourseSummary {
            channel_id: channel.id,
            name: channel.name.clone(),
            members: enrolled_members(&members).len(),
        })
    }

    /// The course chat, found by stored id, then by name, else created
    async fn get_or_create_channel(
        &self,
        guild: &dyn GuildChannels,
        guild_id: u64,
        code: &CourseCode,
        config: &CourseConfig,
    ) -> Result<ChannelInfo, CourseError> {
        let name = code.channel_name();
        let channels = guild.channels().await?;

        if let Some(row) = self.database.find_course_channel(guild_id, &name).await? {
            if let Some(channel) = channels.iter().find(|c| c.id == row.channel_id) {
                return Ok(channel.clone());
            }
            warn!("⚠️ Stored channel {} for {code} is gone, forgetting it", row.channel_id);
            self.database
                .remove_course_channel(guild_id, row.channel_id)
                .await?;
        }

        if let Some(channel) = find_text_channel(&channels, &name) {
            self.database
                .add_course_channel(&CourseChannelRow::new(guild_id, channel))
                .await?;
            return Ok(channel.clone());
        }

        let category = match channels.iter().find(|c| {
            c.kind == ChannelKind::Category && c.name.eq_ignore_ascii_case(code.category_name())
        }) {
            Some(category) => category.clone(),
            None => {
                let position = category_position(&channels, config, code.category_name());
                let category = guild.create_category(code.category_name(), position).await?;
                self.database
                    .add_course_channel(&CourseChannelRow::new(guild_id, &category))
                    .await?;
                info!("📁 Created course category {} at {position}", category.name);
                category
            }
        };

        let position = channel_position(&channels, category.id, &name);
        let channel = guild
            .create_text_channel(&name, category.id, position)
            .await?;
        guild.move_channel(channel.id, position).await?;
        self.database
            .add_course_channel(&CourseChannelRow::new(guild_id, &channel))
            .await?;
        info!("📁 Created course channel #{name} at {position}");
        Ok(channel)
    }

    /// Delete a channel from the guild and from the bookkeeping
    async fn remove_channel(
        &self,
        guild: &dyn GuildChannels,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<()> {
        guild.delete_channel(channel_id).await?;
        self.database
            .remove_course_channel(guild_id, channel_id)
            .await?;
        Ok(())
    }
}

fn find_text_channel<'a>(channels: &'a [ChannelInfo], name: &str) -> Option<&'a ChannelInfo> {
    channels
        .iter()
        .find(|c| c.kind == ChannelKind::Text && c.name == name)
}
