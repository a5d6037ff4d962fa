//! Per-community statistics settings
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Each guild carries its own channel, patterns, thresholds and roles. The
//! compiled form is cached per guild and handed to the message listener.

use crate::database::Database;
use anyhow::{anyhow, Result};
use dashmap::DashMap;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_PRIMARY_PATTERN: &str = r"[aA][arRgGAhH]{3,}";
pub const DEFAULT_SECONDARY_PATTERN: &str = r":scream1:";
pub const DEFAULT_MINOR_THRESHOLD: i64 = 100;
pub const DEFAULT_MAJOR_THRESHOLD: i64 = 250;

/// Persisted settings row, patterns kept as source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRow {
    pub guild_id: u64,
    pub channel_id: Option<u64>,
    pub primary_pattern: String,
    pub secondary_pattern: Option<String>,
    pub minor_threshold: i64,
    pub major_threshold: i64,
    pub minor_role_id: Option<u64>,
    pub major_role_id: Option<u64>,
}

impl SettingsRow {
    pub fn defaults(guild_id: u64) -> Self {
        Self {
            guild_id,
            channel_id: None,
            primary_pattern: DEFAULT_PRIMARY_PATTERN.to_string(),
            secondary_pattern: Some(DEFAULT_SECONDARY_PATTERN.to_string()),
            minor_threshold: DEFAULT_MINOR_THRESHOLD,
            major_threshold: DEFAULT_MAJOR_THRESHOLD,
            minor_role_id: None,
            major_role_id: None,
        }
    }

    /// Merge an update into this row, rejecting invalid values
    pub fn apply(&self, update: &SettingsUpdate) -> Result<SettingsRow> {
        let mut next = self.clone();

        if let Some(channel) = update.channel_id {
            next.channel_id = Some(channel);
        }
        if let Some(pattern) = &update.primary_pattern {
            Regex::new(pattern).map_err(|e| anyhow!("Primary pattern is invalid: {e}"))?;
            next.primary_pattern = pattern.clone();
        }
        if let Some(pattern) = &update.secondary_pattern {
            Regex::new(pattern).map_err(|e| anyhow!("Secondary pattern is invalid: {e}"))?;
            next.secondary_pattern = Some(pattern.clone());
        }
        if let Some(minor) = update.minor_threshold {
            if minor < 0 {
                return Err(anyhow!("Minor threshold must not be negative"));
            }
            next.minor_threshold = minor;
        }
        if let Some(major) = update.major_threshold {
            if major < 0 {
                return Err(anyhow!("Major threshold must not be negative"));
            }
            next.major_threshold = major;
        }
        if next.minor_threshold > next.major_threshold {
            return Err(anyhow!(
                "Minor threshold ({}) must not exceed major threshold ({})",
                next.minor_threshold,
                next.major_threshold
            ));
        }
        if let Some(role) = update.minor_role_id {
            next.minor_role_id = Some(role);
        }
        if let Some(role) = update.major_role_id {
            next.major_role_id = Some(role);
        }

        Ok(next)
    }
}

/// Fields supplied to `/setup_statistics`; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub channel_id: Option<u64>,
    pub primary_pattern: Option<String>,
    pub secondary_pattern: Option<String>,
    pub minor_threshold: Option<i64>,
    pub major_threshold: Option<i64>,
    pub minor_role_id: Option<u64>,
    pub major_role_id: Option<u64>,
}

/// How a message relates to the streak feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventMatch {
    /// Matches the primary pattern: counts toward the streak
    Qualifying,
    /// Matches only the secondary pattern: counts toward the total
    MentionOnly,
    Ignored,
}

/// Compiled settings for one guild
#[derive(Debug, Clone)]
pub struct StreakSettings {
    pub row: SettingsRow,
    primary: Regex,
    secondary: Option<Regex>,
}

impl StreakSettings {
    pub fn compile(row: SettingsRow) -> Result<Self> {
        let primary = Regex::new(&row.primary_pattern)?;
        let secondary = row
            .secondary_pattern
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Regex::new)
            .transpose()?;
        Ok(Self {
            row,
            primary,
            secondary,
        })
    }

    /// Classify a message posted in `channel_id`
    pub fn classify(&self, channel_id: u64, content: &str) -> EventMatch {
        if self.row.channel_id != Some(channel_id) {
            return EventMatch::Ignored;
        }
        if self.primary.is_match(content) {
            EventMatch::Qualifying
        } else if self
            .secondary
            .as_ref()
            .is_some_and(|secondary| secondary.is_match(content))
        {
            EventMatch::MentionOnly
        } else {
            EventMatch::Ignored
        }
    }
}

/// Lazily loaded, per-guild settings cache over the store
#[derive(Clone)]
pub struct SettingsStore {
    database: Database,
    cache: Arc<DashMap<u64, Option<Arc<StreakSettings>>>>,
}

impl SettingsStore {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Compiled settings for a guild, or `None` when the guild never set up statistics
    pub async fn get(&self, guild_id: u64) -> Result<Option<Arc<StreakSettings>>> {
        if let Some(cached) = self.cache.get(&guild_id) {
            return Ok(cached.clone());
        }

        let loaded = match self.database.get_statistics_settings(guild_id).await? {
            Some(row) => match StreakSettings::compile(row) {
                Ok(settings) => Some(Arc::new(settings)),
                Err(e) => {
                    warn!("Ignoring invalid statistics settings for guild {guild_id}: {e}");
                    None
                }
            },
            None => None,
        };

        self.cache.insert(guild_id, loaded.clone());
        Ok(loaded)
    }

    /// Current row for a guild, falling back to defaults
    pub async fn row_or_default(&self, guild_id: u64) -> Result<SettingsRow> {
        Ok(self
            .database
            .get_statistics_settings(guild_id)
            .await?
            .unwrap_or_else(|| SettingsRow::defaults(guild_id)))
    }

    /// Validate, persist and cache an update
    pub async fn update(&self, guild_id: u64, update: &SettingsUpdate) -> Result<Arc<StreakSettings>> {
        let row = self.row_or_default(guild_id).await?.apply(update)?;
        let settings = Arc::new(StreakSettings::compile(row.clone())?);
        self.database.save_statistics_settings(&row).await?;
        self.cache.insert(guild_id, Some(settings.clone()));
        Ok(settings)
    }
}
