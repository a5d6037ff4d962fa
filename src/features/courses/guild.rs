//! Guild channel operations used by course provisioning
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Enrolment is a member permission overwrite granting View Channel on the
//! course channel. Course categories hide themselves from @everyone and stay
//! visible to the bot.

use crate::features::courses::model::{ChannelInfo, ChannelKind, ChannelMember};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use serenity::model::channel::{
    ChannelType, GuildChannel, PermissionOverwrite, PermissionOverwriteType,
};
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::model::permissions::Permissions;
use serenity::prelude::Context;

/// The channel operations course provisioning needs from one guild
#[async_trait]
pub trait GuildChannels: Send + Sync {
    async fn channels(&self) -> Result<Vec<ChannelInfo>>;

    /// New category hidden from @everyone
    async fn create_category(&self, name: &str, position: u32) -> Result<ChannelInfo>;

    /// New text channel carrying its category's permissions
    async fn create_text_channel(&self, name: &str, category: u64, position: u32)
        -> Result<ChannelInfo>;

    async fn move_channel(&self, channel: u64, position: u32) -> Result<()>;

    async fn delete_channel(&self, channel: u64) -> Result<()>;

    /// Delete and create again under the same name, parent, position and
    /// permissions, leaving an empty history
    async fn recreate_channel(&self, channel: u64) -> Result<ChannelInfo>;

    /// Users given access through a member overwrite
    async fn members(&self, channel: u64) -> Result<Vec<ChannelMember>>;

    async fn grant_access(&self, channel: u64, user: u64) -> Result<()>;

    async fn revoke_access(&self, channel: u64, user: u64) -> Result<()>;
}

/// `GuildChannels` over the Discord REST API and the gateway cache
pub struct SerenityGuild<'a> {
    ctx: &'a Context,
    guild_id: GuildId,
}

impl<'a> SerenityGuild<'a> {
    pub fn new(ctx: &'a Context, guild_id: GuildId) -> Self {
        Self { ctx, guild_id }
    }

    async fn guild_channel(&self, channel: u64) -> Result<GuildChannel> {
        ChannelId(channel)
            .to_channel(self.ctx)
            .await?
            .guild()
            .ok_or_else(|| anyhow!("Channel {channel} is not a guild channel"))
    }

    fn is_admin(&self, user: UserId) -> bool {
        let Some(guild) = self.guild_id.to_guild_cached(&self.ctx.cache) else {
            return false;
        };
        let Some(member) = guild.members.get(&user) else {
            return false;
        };
        member
            .permissions(&self.ctx.cache)
            .map_or(false, |p| p.contains(Permissions::ADMINISTRATOR))
    }
}

fn channel_info(channel: &GuildChannel) -> ChannelInfo {
    let kind = match channel.kind {
        ChannelType::Text => ChannelKind::Text,
        ChannelType::Category => ChannelKind::Category,
        _ => ChannelKind::Other,
    };
    ChannelInfo {
        id: channel.id.0,
        name: channel.name.clone(),
        kind,
        parent_id: channel.parent_id.map(|p| p.0),
    }
}

fn view_overwrite(kind: PermissionOverwriteType, visible: bool) -> PermissionOverwrite {
    let (allow, deny) = if visible {
        (Permissions::VIEW_CHANNEL, Permissions::empty())
    } else {
        (Permissions::empty(), Permissions::VIEW_CHANNEL)
    };
    PermissionOverwrite { allow, deny, kind }
}

#[async_trait]
impl GuildChannels for SerenityGuild<'_> {
    async fn channels(&self) -> Result<Vec<ChannelInfo>> {
        let channels = self.guild_id.channels(&self.ctx.http).await?;
        Ok(channels.values().map(channel_info).collect())
    }

    async fn create_category(&self, name: &str, position: u32) -> Result<ChannelInfo> {
        let everyone = RoleId(self.guild_id.0);
        let bot = self.ctx.cache.current_user_id();
        let overwrites = vec![
            view_overwrite(PermissionOverwriteType::Role(everyone), false),
            view_overwrite(PermissionOverwriteType::Member(bot), true),
        ];

        let category = self
            .guild_id
            .create_channel(&self.ctx.http, |c| {
                c.name(name)
                    .kind(ChannelType::Category)
                    .position(position)
                    .permissions(overwrites)
            })
            .await?;
        Ok(channel_info(&category))
    }

    async fn create_text_channel(
        &self,
        name: &str,
        category: u64,
        position: u32,
    ) -> Result<ChannelInfo> {
        let overwrites = self.guild_channel(category).await?.permission_overwrites;
        let channel = self
            .guild_id
            .create_channel(&self.ctx.http, |c| {
                c.name(name)
                    .kind(ChannelType::Text)
                    .category(ChannelId(category))
                    .position(position)
                    .permissions(overwrites)
            })
            .await?;
        Ok(channel_info(&channel))
    }

    async fn move_channel(&self, channel: u64, position: u32) -> Result<()> {
        ChannelId(channel)
            .edit(&self.ctx.http, |c| c.position(position.into()))
            .await?;
        Ok(())
    }

    async fn delete_channel(&self, channel: u64) -> Result<()> {
        ChannelId(channel).delete(&self.ctx.http).await?;
        Ok(())
    }

    async fn recreate_channel(&self, channel: u64) -> Result<ChannelInfo> {
        let old = self.guild_channel(channel).await?;
        let position = u32::try_from(old.position).unwrap_or(0);
        let topic = old.topic.clone().unwrap_or_default();

        ChannelId(channel).delete(&self.ctx.http).await?;
        let fresh = self
            .guild_id
            .create_channel(&self.ctx.http, |c| {
                c.name(&old.name)
                    .kind(old.kind)
                    .position(position)
                    .topic(topic)
                    .permissions(old.permission_overwrites.clone());
                if let Some(parent) = old.parent_id {
                    c.category(parent);
                }
                c
            })
            .await?;

        // creation at a position does not shift the neighbours
        ChannelId(fresh.id.0)
            .edit(&self.ctx.http, |c| c.position(position.into()))
            .await?;
        Ok(channel_info(&fresh))
    }

    async fn members(&self, channel: u64) -> Result<Vec<ChannelMember>> {
        let bot = self.ctx.cache.current_user_id();
        let overwrites = self.guild_channel(channel).await?.permission_overwrites;

        let mut members = Vec::new();
        for overwrite in overwrites {
            let PermissionOverwriteType::Member(user_id) = overwrite.kind else {
                continue;
            };
            if user_id == bot || !overwrite.allow.contains(Permissions::VIEW_CHANNEL) {
                continue;
            }
            match self.guild_id.member(self.ctx, user_id).await {
                Ok(member) => members.push(ChannelMember {
                    user_id: user_id.0,
                    bot: member.user.bot,
                    admin: self.is_admin(user_id),
                }),
                // left the guild; the overwrite no longer grants anyone access
                Err(e) => debug!("Skipping overwrite for {user_id} in {channel}: {e}"),
            }
        }
        Ok(members)
    }

    async fn grant_access(&self, channel: u64, user: u64) -> Result<()> {
        let overwrite = view_overwrite(PermissionOverwriteType::Member(UserId(user)), true);
        ChannelId(channel)
            .create_permission(&self.ctx.http, &overwrite)
            .await?;
        Ok(())
    }

    async fn revoke_access(&self, channel: u64, user: u64) -> Result<()> {
        ChannelId(channel)
            .delete_permission(
                &self.ctx.http,
                PermissionOverwriteType::Member(UserId(user)),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_overwrite() {
        let hidden = view_overwrite(PermissionOverwriteType::Role(RoleId(1)), false);
        assert_eq!(hidden.deny, Permissions::VIEW_CHANNEL);
        assert!(hidden.allow.is_empty());

        let shown = view_overwrite(PermissionOverwriteType::Member(UserId(2)), true);
        assert_eq!(shown.allow, Permissions::VIEW_CHANNEL);
        assert!(shown.deny.is_empty());
    }
}
