//! # SQLite Store
//!
//! Reminder rows, streak records, per-guild statistics settings and course
//! channel bookkeeping.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! One connection behind an async mutex, shared by every component through
//! cheap clones. Statements never outlive the lock guard and never cross an
//! await point.

use crate::features::courses::model::{CourseChannelRow, CourseConfig, SyncPlan};
use crate::features::reminders::model::{NewReminder, Reminder};
use crate::features::streaks::model::StreakRecord;
use crate::features::streaks::settings::SettingsRow;
use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::{info, warn};
use sqlite::{Connection, State, Statement};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const BUSY_TIMEOUT_MS: usize = 5_000;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ranking column for the streak leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardColumn {
    Total,
    CurrentStreak,
    BestStreak,
}

impl LeaderboardColumn {
    fn column(self) -> &'static str {
        match self {
            LeaderboardColumn::Total => "total_count",
            LeaderboardColumn::CurrentStreak => "current_streak",
            LeaderboardColumn::BestStreak => "best_streak",
        }
    }
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: u64,
    pub value: i64,
}

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists
    ///
    /// `":memory:"` gives a private in-memory database.
    pub async fn new(path: &str) -> Result<Self> {
        let mut connection =
            sqlite::open(path).with_context(|| format!("Failed to open database at {path}"))?;
        connection.set_busy_timeout(BUSY_TIMEOUT_MS)?;

        let database = Database {
            connection: Arc::new(Mutex::new(connection)),
        };
        database.init_tables().await?;
        info!("Database ready at {path}");
        Ok(database)
    }

    async fn init_tables(&self) -> Result<()> {
        let conn = self.connection.lock().await;

        conn.execute("PRAGMA journal_mode = WAL;")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS reminders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                message TEXT NOT NULL,
                send_time TEXT NOT NULL,
                requested_time TEXT NOT NULL,
                repeat INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_reminders_user ON reminders(user_id);

            CREATE TABLE IF NOT EXISTS streaks (
                user_id TEXT PRIMARY KEY,
                total_count INTEGER NOT NULL DEFAULT 0,
                current_streak INTEGER NOT NULL DEFAULT 0,
                best_streak INTEGER NOT NULL DEFAULT 0,
                last_qualifying_day TEXT NOT NULL,
                streak_saved_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS statistics_settings (
                guild_id TEXT PRIMARY KEY,
                channel_id TEXT,
                primary_pattern TEXT NOT NULL,
                secondary_pattern TEXT,
                minor_threshold INTEGER NOT NULL,
                major_threshold INTEGER NOT NULL,
                minor_role_id TEXT,
                major_role_id TEXT
            );

            CREATE TABLE IF NOT EXISTS course_config (
                guild_id TEXT PRIMARY KEY,
                auto_delete INTEGER NOT NULL DEFAULT 1,
                auto_delete_ignore_admins INTEGER NOT NULL DEFAULT 0,
                descriptors TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS course_channels (
                channel_id TEXT NOT NULL,
                guild_id TEXT NOT NULL,
                name TEXT NOT NULL,
                is_category INTEGER NOT NULL DEFAULT 0,
                do_not_reset INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (channel_id, guild_id)
            );

            CREATE TABLE IF NOT EXISTS course_enrollments (
                user_id TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                guild_id TEXT NOT NULL,
                PRIMARY KEY (user_id, channel_id, guild_id)
            );
            CREATE INDEX IF NOT EXISTS idx_course_enrollments_channel
                ON course_enrollments(guild_id, channel_id);",
        )?;

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reminders
    // ---------------------------------------------------------------------

    /// Insert a reminder and return it with its assigned id
    pub async fn add_reminder(&self, reminder: &NewReminder) -> Result<Reminder> {
        let conn = self.connection.lock().await;

        let mut stmt = conn.prepare(
            "INSERT INTO reminders (user_id, channel_id, message, send_time, requested_time, repeat)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        stmt.bind((1, reminder.owner.to_string().as_str()))?;
        stmt.bind((2, reminder.destination.to_string().as_str()))?;
        stmt.bind((3, reminder.message.as_str()))?;
        stmt.bind((4, format_timestamp(reminder.send_time).as_str()))?;
        stmt.bind((5, format_timestamp(reminder.requested_time).as_str()))?;
        stmt.bind((6, reminder.repeat as i64))?;
        stmt.next()?;
        drop(stmt);

        let id = scalar_i64(&conn, "SELECT last_insert_rowid()")?;
        Ok(reminder.clone().with_id(id))
    }

    pub async fn get_reminder(&self, id: i64) -> Result<Option<Reminder>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, channel_id, message, send_time, requested_time, repeat
             FROM reminders WHERE id = ?",
        )?;
        stmt.bind((1, id))?;

        if let State::Row = stmt.next()? {
            Ok(Some(read_reminder(&stmt)?))
        } else {
            Ok(None)
        }
    }

    /// Every stored reminder, oldest id first
    pub async fn get_all_reminders(&self) -> Result<Vec<Reminder>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, channel_id, message, send_time, requested_time, repeat
             FROM reminders ORDER BY id",
        )?;
        collect_reminders(&mut stmt)
    }

    /// Reminders owned by one user, soonest first
    pub async fn get_user_reminders(&self, owner: u64) -> Result<Vec<Reminder>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, channel_id, message, send_time, requested_time, repeat
             FROM reminders WHERE user_id = ? ORDER BY send_time",
        )?;
        stmt.bind((1, owner.to_string().as_str()))?;
        collect_reminders(&mut stmt)
    }

    /// Delete a reminder row; returns false when it was already gone
    pub async fn delete_reminder(&self, id: i64) -> Result<bool> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare("DELETE FROM reminders WHERE id = ?")?;
        stmt.bind((1, id))?;
        stmt.next()?;
        drop(stmt);

        Ok(scalar_i64(&conn, "SELECT changes()")? > 0)
    }

    // ---------------------------------------------------------------------
    // Streaks
    // ---------------------------------------------------------------------

    pub async fn get_streak(&self, user_id: u64) -> Result<Option<StreakRecord>> {
        let conn = self.connection.lock().await;
        select_streak(&conn, user_id)
    }

    /// Read, modify and write one user's record inside a single transaction
    ///
    /// A missing record starts from `StreakRecord::new`. When `modify` rejects
    /// the change the transaction is rolled back and the rejection returned in
    /// the inner result.
    pub async fn modify_streak<T, E, F>(
        &self,
        user_id: u64,
        modify: F,
    ) -> Result<std::result::Result<T, E>>
    where
        F: FnOnce(&mut StreakRecord) -> std::result::Result<T, E>,
    {
        let conn = self.connection.lock().await;

        // IMMEDIATE takes the write lock up front so two processes cannot
        // interleave their read-modify-write on the same row.
        conn.execute("BEGIN IMMEDIATE")?;

        match modify_streak_in_tx(&conn, user_id, modify) {
            Ok(Err(rejected)) => {
                conn.execute("ROLLBACK")?;
                Ok(Err(rejected))
            }
            outcome => finish_transaction(&conn, outcome),
        }
    }

    /// Top users by a column; ties share a rank
    pub async fn streak_leaderboard(
        &self,
        column: LeaderboardColumn,
        top: i64,
    ) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.connection.lock().await;
        let col = column.column();
        let mut stmt = conn.prepare(format!(
            "SELECT user_id, value, rank FROM (
                 SELECT user_id, {col} AS value, RANK() OVER (ORDER BY {col} DESC) AS rank
                 FROM streaks
             ) WHERE rank <= ? ORDER BY rank, user_id"
        ))?;
        stmt.bind((1, top))?;

        let mut entries = Vec::new();
        while let State::Row = stmt.next()? {
            entries.push(LeaderboardEntry {
                rank: stmt.read::<i64, _>("rank")?,
                user_id: parse_id(&stmt.read::<String, _>("user_id")?)?,
                value: stmt.read::<i64, _>("value")?,
            });
        }
        Ok(entries)
    }

    // ---------------------------------------------------------------------
    // Statistics settings
    // ---------------------------------------------------------------------

    pub async fn get_statistics_settings(&self, guild_id: u64) -> Result<Option<SettingsRow>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT guild_id, channel_id, primary_pattern, secondary_pattern,
                    minor_threshold, major_threshold, minor_role_id, major_role_id
             FROM statistics_settings WHERE guild_id = ?",
        )?;
        stmt.bind((1, guild_id.to_string().as_str()))?;

        if let State::Row = stmt.next()? {
            Ok(Some(SettingsRow {
                guild_id,
                channel_id: read_optional_id(&stmt, "channel_id")?,
                primary_pattern: stmt.read::<String, _>("primary_pattern")?,
                secondary_pattern: stmt.read::<Option<String>, _>("secondary_pattern")?,
                minor_threshold: stmt.read::<i64, _>("minor_threshold")?,
                major_threshold: stmt.read::<i64, _>("major_threshold")?,
                minor_role_id: read_optional_id(&stmt, "minor_role_id")?,
                major_role_id: read_optional_id(&stmt, "major_role_id")?,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn save_statistics_settings(&self, row: &SettingsRow) -> Result<()> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "INSERT INTO statistics_settings (guild_id, channel_id, primary_pattern, secondary_pattern,
                                              minor_threshold, major_threshold, minor_role_id, major_role_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(guild_id) DO UPDATE SET
                channel_id = excluded.channel_id,
                primary_pattern = excluded.primary_pattern,
                secondary_pattern = excluded.secondary_pattern,
                minor_threshold = excluded.minor_threshold,
                major_threshold = excluded.major_threshold,
                minor_role_id = excluded.minor_role_id,
                major_role_id = excluded.major_role_id",
        )?;

        let channel_id = row.channel_id.map(|id| id.to_string());
        let minor_role_id = row.minor_role_id.map(|id| id.to_string());
        let major_role_id = row.major_role_id.map(|id| id.to_string());

        stmt.bind((1, row.guild_id.to_string().as_str()))?;
        stmt.bind((2, channel_id.as_deref()))?;
        stmt.bind((3, row.primary_pattern.as_str()))?;
        stmt.bind((4, row.secondary_pattern.as_deref()))?;
        stmt.bind((5, row.minor_threshold))?;
        stmt.bind((6, row.major_threshold))?;
        stmt.bind((7, minor_role_id.as_deref()))?;
        stmt.bind((8, major_role_id.as_deref()))?;
        stmt.next()?;

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Courses
    // ---------------------------------------------------------------------

    pub async fn get_course_config(&self, guild_id: u64) -> Result<Option<CourseConfig>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT auto_delete, auto_delete_ignore_admins, descriptors
             FROM course_config WHERE guild_id = ?",
        )?;
        stmt.bind((1, guild_id.to_string().as_str()))?;

        if let State::Row = stmt.next()? {
            let descriptors = stmt.read::<String, _>("descriptors")?;
            Ok(Some(CourseConfig {
                guild_id,
                auto_delete: stmt.read::<i64, _>("auto_delete")? != 0,
                auto_delete_ignore_admins: stmt.read::<i64, _>("auto_delete_ignore_admins")? != 0,
                descriptors: descriptors
                    .split(',')
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect(),
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn save_course_config(&self, config: &CourseConfig) -> Result<()> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "INSERT INTO course_config (guild_id, auto_delete, auto_delete_ignore_admins, descriptors)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(guild_id) DO UPDATE SET
                auto_delete = excluded.auto_delete,
                auto_delete_ignore_admins = excluded.auto_delete_ignore_admins,
                descriptors = excluded.descriptors",
        )?;
        stmt.bind((1, config.guild_id.to_string().as_str()))?;
        stmt.bind((2, config.auto_delete as i64))?;
        stmt.bind((3, config.auto_delete_ignore_admins as i64))?;
        stmt.bind((4, config.descriptors.join(",").as_str()))?;
        stmt.next()?;
        Ok(())
    }

    /// Record a managed channel; an existing row keeps its reset exception
    pub async fn add_course_channel(&self, row: &CourseChannelRow) -> Result<()> {
        let conn = self.connection.lock().await;
        insert_course_channel(&conn, row)
    }

    /// Every managed channel and category of a guild
    pub async fn get_course_channels(&self, guild_id: u64) -> Result<Vec<CourseChannelRow>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT channel_id, guild_id, name, is_category, do_not_reset
             FROM course_channels WHERE guild_id = ? ORDER BY name",
        )?;
        stmt.bind((1, guild_id.to_string().as_str()))?;
        collect_course_channels(&mut stmt)
    }

    pub async fn get_course_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<Option<CourseChannelRow>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT channel_id, guild_id, name, is_category, do_not_reset
             FROM course_channels WHERE guild_id = ? AND channel_id = ?",
        )?;
        stmt.bind((1, guild_id.to_string().as_str()))?;
        stmt.bind((2, channel_id.to_string().as_str()))?;
        Ok(collect_course_channels(&mut stmt)?.into_iter().next())
    }

    /// The managed text channel with this name
    pub async fn find_course_channel(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<CourseChannelRow>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT channel_id, guild_id, name, is_category, do_not_reset
             FROM course_channels WHERE guild_id = ? AND name = ? AND is_category = 0",
        )?;
        stmt.bind((1, guild_id.to_string().as_str()))?;
        stmt.bind((2, name))?;
        Ok(collect_course_channels(&mut stmt)?.into_iter().next())
    }

    /// Forget a channel and every enrollment in it
    pub async fn remove_course_channel(&self, guild_id: u64, channel_id: u64) -> Result<bool> {
        let conn = self.connection.lock().await;
        conn.execute("BEGIN IMMEDIATE")?;
        let outcome = delete_course_channel(&conn, guild_id, channel_id);
        finish_transaction(&conn, outcome)
    }

    /// Point a channel's row and enrollments at its replacement
    pub async fn replace_course_channel(
        &self,
        guild_id: u64,
        old_id: u64,
        new_id: u64,
    ) -> Result<()> {
        let conn = self.connection.lock().await;
        conn.execute("BEGIN IMMEDIATE")?;
        let outcome = (|| -> Result<()> {
            for table in ["course_channels", "course_enrollments"] {
                let mut stmt = conn.prepare(format!(
                    "UPDATE {table} SET channel_id = ? WHERE guild_id = ? AND channel_id = ?"
                ))?;
                stmt.bind((1, new_id.to_string().as_str()))?;
                stmt.bind((2, guild_id.to_string().as_str()))?;
                stmt.bind((3, old_id.to_string().as_str()))?;
                stmt.next()?;
            }
            Ok(())
        })();
        finish_transaction(&conn, outcome)
    }

    /// Returns false when the channel is not managed
    pub async fn set_do_not_reset(
        &self,
        guild_id: u64,
        channel_id: u64,
        do_not_reset: bool,
    ) -> Result<bool> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "UPDATE course_channels SET do_not_reset = ? WHERE guild_id = ? AND channel_id = ?",
        )?;
        stmt.bind((1, do_not_reset as i64))?;
        stmt.bind((2, guild_id.to_string().as_str()))?;
        stmt.bind((3, channel_id.to_string().as_str()))?;
        stmt.next()?;
        drop(stmt);

        Ok(scalar_i64(&conn, "SELECT changes()")? > 0)
    }

    pub async fn add_enrollment(&self, guild_id: u64, channel_id: u64, user_id: u64) -> Result<()> {
        let conn = self.connection.lock().await;
        insert_enrollment(&conn, guild_id, channel_id, user_id)
    }

    /// Returns false when there was nothing to remove
    pub async fn remove_enrollment(
        &self,
        guild_id: u64,
        channel_id: u64,
        user_id: u64,
    ) -> Result<bool> {
        let conn = self.connection.lock().await;
        delete_enrollment(&conn, guild_id, channel_id, user_id)?;
        Ok(scalar_i64(&conn, "SELECT changes()")? > 0)
    }

    /// Enrolled users per channel, for every channel of a guild
    pub async fn get_guild_enrollments(&self, guild_id: u64) -> Result<HashMap<u64, Vec<u64>>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT channel_id, user_id FROM course_enrollments
             WHERE guild_id = ? ORDER BY channel_id, user_id",
        )?;
        stmt.bind((1, guild_id.to_string().as_str()))?;

        let mut enrollments: HashMap<u64, Vec<u64>> = HashMap::new();
        while let State::Row = stmt.next()? {
            let channel_id = parse_id(&stmt.read::<String, _>("channel_id")?)?;
            let user_id = parse_id(&stmt.read::<String, _>("user_id")?)?;
            enrollments.entry(channel_id).or_default().push(user_id);
        }
        Ok(enrollments)
    }

    /// Managed channels a user is enrolled in, by name
    pub async fn get_user_enrollments(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<CourseChannelRow>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT c.channel_id, c.guild_id, c.name, c.is_category, c.do_not_reset
             FROM course_enrollments e
             JOIN course_channels c ON c.guild_id = e.guild_id AND c.channel_id = e.channel_id
             WHERE e.guild_id = ? AND e.user_id = ?
             ORDER BY c.name",
        )?;
        stmt.bind((1, guild_id.to_string().as_str()))?;
        stmt.bind((2, user_id.to_string().as_str()))?;
        collect_course_channels(&mut stmt)
    }

    /// Drop every enrollment a user has in a guild; returns how many
    pub async fn purge_enrollments(&self, guild_id: u64, user_id: u64) -> Result<i64> {
        let conn = self.connection.lock().await;
        let mut stmt =
            conn.prepare("DELETE FROM course_enrollments WHERE guild_id = ? AND user_id = ?")?;
        stmt.bind((1, guild_id.to_string().as_str()))?;
        stmt.bind((2, user_id.to_string().as_str()))?;
        stmt.next()?;
        drop(stmt);

        scalar_i64(&conn, "SELECT changes()")
    }

    /// Apply a `/course sync` plan in one transaction
    pub async fn apply_course_sync(&self, guild_id: u64, plan: &SyncPlan) -> Result<()> {
        let conn = self.connection.lock().await;
        conn.execute("BEGIN IMMEDIATE")?;
        let outcome = apply_sync_in_tx(&conn, guild_id, plan);
        finish_transaction(&conn, outcome)
    }
}

/// Commit a successful transaction and roll back a failed one
///
/// A COMMIT that fails (busy database, deferred constraint) leaves the
/// transaction open, so it is rolled back before the error is returned and
/// the shared connection is usable for the next caller.
fn finish_transaction<T>(conn: &Connection, outcome: Result<T>) -> Result<T> {
    let failure = match outcome {
        Ok(value) => match conn.execute("COMMIT") {
            Ok(()) => return Ok(value),
            Err(e) => anyhow::Error::from(e).context("Failed to commit transaction"),
        },
        Err(e) => e,
    };

    if let Err(rollback) = conn.execute("ROLLBACK") {
        warn!("Rollback after failed transaction also failed: {rollback}");
    }
    Err(failure)
}

fn modify_streak_in_tx<T, E, F>(
    conn: &Connection,
    user_id: u64,
    modify: F,
) -> Result<std::result::Result<T, E>>
where
    F: FnOnce(&mut StreakRecord) -> std::result::Result<T, E>,
{
    let mut record = select_streak(conn, user_id)?.unwrap_or_else(|| StreakRecord::new(user_id));
    let outcome = modify(&mut record);
    if outcome.is_ok() {
        upsert_streak(conn, &record)?;
    }
    Ok(outcome)
}

fn apply_sync_in_tx(conn: &Connection, guild_id: u64, plan: &SyncPlan) -> Result<()> {
    for channel_id in &plan.removed_channels {
        delete_course_channel(conn, guild_id, *channel_id)?;
    }
    for (channel_id, name) in &plan.renamed_channels {
        let mut stmt = conn.prepare(
            "UPDATE course_channels SET name = ? WHERE guild_id = ? AND channel_id = ?",
        )?;
        stmt.bind((1, name.as_str()))?;
        stmt.bind((2, guild_id.to_string().as_str()))?;
        stmt.bind((3, channel_id.to_string().as_str()))?;
        stmt.next()?;
    }
    for row in &plan.added_channels {
        insert_course_channel(conn, row)?;
    }
    for (channel_id, user_id) in &plan.removed_enrollments {
        delete_enrollment(conn, guild_id, *channel_id, *user_id)?;
    }
    for (channel_id, user_id) in &plan.added_enrollments {
        insert_enrollment(conn, guild_id, *channel_id, *user_id)?;
    }
    Ok(())
}

fn insert_course_channel(conn: &Connection, row: &CourseChannelRow) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO course_channels (channel_id, guild_id, name, is_category, do_not_reset)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(channel_id, guild_id) DO UPDATE SET
            name = excluded.name,
            is_category = excluded.is_category",
    )?;
    stmt.bind((1, row.channel_id.to_string().as_str()))?;
    stmt.bind((2, row.guild_id.to_string().as_str()))?;
    stmt.bind((3, row.name.as_str()))?;
    stmt.bind((4, row.is_category as i64))?;
    stmt.bind((5, row.do_not_reset as i64))?;
    stmt.next()?;
    Ok(())
}

fn delete_course_channel(conn: &Connection, guild_id: u64, channel_id: u64) -> Result<bool> {
    let mut removed = false;
    for table in ["course_enrollments", "course_channels"] {
        let mut stmt = conn.prepare(format!(
            "DELETE FROM {table} WHERE guild_id = ? AND channel_id = ?"
        ))?;
        stmt.bind((1, guild_id.to_string().as_str()))?;
        stmt.bind((2, channel_id.to_string().as_str()))?;
        stmt.next()?;
        drop(stmt);
        removed = scalar_i64(conn, "SELECT changes()")? > 0;
    }
    Ok(removed)
}

fn insert_enrollment(conn: &Connection, guild_id: u64, channel_id: u64, user_id: u64) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO course_enrollments (user_id, channel_id, guild_id) VALUES (?, ?, ?)",
    )?;
    stmt.bind((1, user_id.to_string().as_str()))?;
    stmt.bind((2, channel_id.to_string().as_str()))?;
    stmt.bind((3, guild_id.to_string().as_str()))?;
    stmt.next()?;
    Ok(())
}

fn delete_enrollment(conn: &Connection, guild_id: u64, channel_id: u64, user_id: u64) -> Result<()> {
    let mut stmt = conn.prepare(
        "DELETE FROM course_enrollments WHERE guild_id = ? AND channel_id = ? AND user_id = ?",
    )?;
    stmt.bind((1, guild_id.to_string().as_str()))?;
    stmt.bind((2, channel_id.to_string().as_str()))?;
    stmt.bind((3, user_id.to_string().as_str()))?;
    stmt.next()?;
    Ok(())
}

fn collect_course_channels(stmt: &mut Statement<'_>) -> Result<Vec<CourseChannelRow>> {
    let mut rows = Vec::new();
    while let State::Row = stmt.next()? {
        rows.push(CourseChannelRow {
            channel_id: parse_id(&stmt.read::<String, _>("channel_id")?)?,
            guild_id: parse_id(&stmt.read::<String, _>("guild_id")?)?,
            name: stmt.read::<String, _>("name")?,
            is_category: stmt.read::<i64, _>("is_category")? != 0,
            do_not_reset: stmt.read::<i64, _>("do_not_reset")? != 0,
        });
    }
    Ok(rows)
}

fn select_streak(conn: &Connection, user_id: u64) -> Result<Option<StreakRecord>> {
    let mut stmt = conn.prepare(
        "SELECT total_count, current_streak, best_streak, last_qualifying_day, streak_saved_at
         FROM streaks WHERE user_id = ?",
    )?;
    stmt.bind((1, user_id.to_string().as_str()))?;

    if let State::Row = stmt.next()? {
        Ok(Some(StreakRecord {
            user_id,
            total_count: stmt.read::<i64, _>("total_count")?,
            current_streak: stmt.read::<i64, _>("current_streak")?,
            best_streak: stmt.read::<i64, _>("best_streak")?,
            last_qualifying_day: parse_date(&stmt.read::<String, _>("last_qualifying_day")?)?,
            streak_saved_at: parse_timestamp(&stmt.read::<String, _>("streak_saved_at")?)?,
        }))
    } else {
        Ok(None)
    }
}

fn upsert_streak(conn: &Connection, record: &StreakRecord) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO streaks (user_id, total_count, current_streak, best_streak,
                              last_qualifying_day, streak_saved_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
            total_count = excluded.total_count,
            current_streak = excluded.current_streak,
            best_streak = excluded.best_streak,
            last_qualifying_day = excluded.last_qualifying_day,
            streak_saved_at = excluded.streak_saved_at",
    )?;
    stmt.bind((1, record.user_id.to_string().as_str()))?;
    stmt.bind((2, record.total_count))?;
    stmt.bind((3, record.current_streak))?;
    stmt.bind((4, record.best_streak))?;
    stmt.bind((5, record.last_qualifying_day.format(DATE_FORMAT).to_string().as_str()))?;
    stmt.bind((6, format_timestamp(record.streak_saved_at).as_str()))?;
    stmt.next()?;
    Ok(())
}

fn collect_reminders(stmt: &mut Statement<'_>) -> Result<Vec<Reminder>> {
    let mut reminders = Vec::new();
    while let State::Row = stmt.next()? {
        reminders.push(read_reminder(stmt)?);
    }
    Ok(reminders)
}

fn read_reminder(stmt: &Statement<'_>) -> Result<Reminder> {
    Ok(Reminder {
        id: stmt.read::<i64, _>("id")?,
        owner: parse_id(&stmt.read::<String, _>("user_id")?)?,
        destination: parse_id(&stmt.read::<String, _>("channel_id")?)?,
        message: stmt.read::<String, _>("message")?,
        send_time: parse_timestamp(&stmt.read::<String, _>("send_time")?)?,
        requested_time: parse_timestamp(&stmt.read::<String, _>("requested_time")?)?,
        repeat: stmt.read::<i64, _>("repeat")? != 0,
    })
}

fn read_optional_id(stmt: &Statement<'_>, column: &str) -> Result<Option<u64>> {
    stmt.read::<Option<String>, _>(column)?
        .map(|raw| parse_id(&raw))
        .transpose()
}

fn scalar_i64(conn: &Connection, query: &str) -> Result<i64> {
    let mut stmt = conn.prepare(query)?;
    stmt.next()?;
    Ok(stmt.read::<i64, _>(0)?)
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .with_context(|| format!("Invalid snowflake in database: {raw}"))
}

/// RFC 3339 in UTC with millisecond precision; sorts lexically by time
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid timestamp in database: {raw}"))?
        .with_timezone(&Utc))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .with_context(|| format!("Invalid date in database: {raw}"))
}
