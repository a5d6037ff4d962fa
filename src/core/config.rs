//! Process configuration loaded from the environment
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{anyhow, Context as _, Result};
use chrono::FixedOffset;
use std::time::Duration;

const DEFAULT_DATABASE_PATH: &str = "hubbot.db";
const DEFAULT_LOG_LEVEL: &str = "info";
/// Australia/Brisbane, which does not observe daylight saving
const DEFAULT_UTC_OFFSET_HOURS: i32 = 10;
const DEFAULT_RETRY_SECONDS: u64 = 60;
const DEFAULT_MAX_DAYS: i64 = 365;
const DEFAULT_MIN_REPEAT_HOURS: i64 = 12;
const DEFAULT_CATALOGUE_URL: &str =
    "https://my.uq.edu.au/programs-courses/course.html?course_code=";
const DEFAULT_CATALOGUE_CACHE_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub discord_guild_id: Option<String>,
    pub database_path: String,
    pub log_level: String,
    /// Offset whose midnight starts a new streak day
    pub streak_offset: FixedOffset,
    /// Retry delay for one-off reminders after a transient delivery failure.
    /// `None` leaves the row for the next rehydration instead.
    pub reminder_retry: Option<Duration>,
    pub reminder_max_days: i64,
    pub reminder_min_repeat_hours: i64,
    /// Course page URL prefix; the course code is appended. `None` accepts
    /// any well-formed code without asking the catalogue.
    pub course_catalogue_url: Option<String>,
    /// How long a catalogue answer is reused
    pub course_cache_days: i64,
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("DISCORD_TOKEN must be set"))?;

        let discord_guild_id = lookup("DISCORD_GUILD_ID").filter(|g| !g.trim().is_empty());

        let database_path =
            lookup("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let offset_hours: i32 = parse_var(&lookup, "STREAK_UTC_OFFSET_HOURS")?
            .unwrap_or(DEFAULT_UTC_OFFSET_HOURS);
        let streak_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            anyhow!("STREAK_UTC_OFFSET_HOURS out of range: {offset_hours}")
        })?;

        let retry_seconds: u64 =
            parse_var(&lookup, "REMINDER_RETRY_SECONDS")?.unwrap_or(DEFAULT_RETRY_SECONDS);
        let reminder_retry = (retry_seconds > 0).then(|| Duration::from_secs(retry_seconds));

        let reminder_max_days: i64 =
            parse_var(&lookup, "REMINDER_MAX_DAYS")?.unwrap_or(DEFAULT_MAX_DAYS);
        let reminder_min_repeat_hours: i64 =
            parse_var(&lookup, "REMINDER_MIN_REPEAT_HOURS")?.unwrap_or(DEFAULT_MIN_REPEAT_HOURS);

        // unset means the default catalogue, set but empty turns lookups off
        let course_catalogue_url = match lookup("COURSE_CATALOGUE_URL") {
            None => Some(DEFAULT_CATALOGUE_URL.to_string()),
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url.trim().to_string()),
        };
        let course_cache_days: i64 =
            parse_var(&lookup, "COURSE_CACHE_DAYS")?.unwrap_or(DEFAULT_CATALOGUE_CACHE_DAYS);

        if reminder_max_days <= 0 {
            return Err(anyhow!("REMINDER_MAX_DAYS must be positive"));
        }
        if reminder_min_repeat_hours <= 0 {
            return Err(anyhow!("REMINDER_MIN_REPEAT_HOURS must be positive"));
        }

        Ok(Config {
            discord_token,
            discord_guild_id,
            database_path,
            log_level,
            streak_offset,
            reminder_retry,
            reminder_max_days,
            reminder_min_repeat_hours,
            course_catalogue_url,
            course_cache_days: course_cache_days.max(0),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Invalid value for {key}: {raw}")),
        _ => Ok(None),
    }
}
