//! Streak Tracker
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Applies the day-boundary rules from [`StreakRecord`] to stored records.
//! Every mutation is one read-modify-write transaction in the store.

use crate::core::error::StreakError;
use crate::database::{Database, LeaderboardColumn, LeaderboardEntry};
use crate::features::streaks::model::{SaverRules, StreakRecord, StreakUpdate};
use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use log::info;
use std::convert::Infallible;

/// Top entries for each ranking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaderboards {
    pub total: Vec<LeaderboardEntry>,
    pub current: Vec<LeaderboardEntry>,
    pub best: Vec<LeaderboardEntry>,
}

#[derive(Clone)]
pub struct StreakTracker {
    database: Database,
    offset: FixedOffset,
    rules: SaverRules,
}

impl StreakTracker {
    pub fn new(database: Database, offset: FixedOffset) -> Self {
        Self::with_rules(database, offset, SaverRules::default())
    }

    pub fn with_rules(database: Database, offset: FixedOffset, rules: SaverRules) -> Self {
        Self {
            database,
            offset,
            rules,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn rules(&self) -> &SaverRules {
        &self.rules
    }

    /// Count a qualifying event for `user_id` at `event_time`
    pub async fn record_event(&self, user_id: u64, event_time: DateTime<Utc>) -> Result<StreakUpdate> {
        let offset = self.offset;
        let outcome = self
            .database
            .modify_streak(user_id, |record| {
                let previous_streak = record.current_streak;
                let new_day = record.apply_event(event_time, offset);
                Ok::<_, Infallible>(StreakUpdate {
                    record: record.clone(),
                    previous_streak,
                    new_day,
                })
            })
            .await?;

        match outcome {
            Ok(update) => Ok(update),
            Err(never) => match never {},
        }
    }

    /// Count a secondary-pattern message toward the total only
    pub async fn record_mention(&self, user_id: u64) -> Result<StreakRecord> {
        let outcome = self
            .database
            .modify_streak(user_id, |record| {
                record.apply_mention();
                Ok::<_, Infallible>(record.clone())
            })
            .await?;

        match outcome {
            Ok(record) => Ok(record),
            Err(never) => match never {},
        }
    }

    /// Spend part of the streak to cover missed days
    pub async fn save_streak(&self, user_id: u64, now: DateTime<Utc>) -> Result<StreakRecord, StreakError> {
        let offset = self.offset;
        let rules = self.rules;
        let saved = self
            .database
            .modify_streak(user_id, |record| {
                record
                    .apply_save(now, offset, &rules)
                    .map(|()| record.clone())
            })
            .await??;

        info!(
            "🛟 User {user_id} saved their streak, now at {}",
            saved.current_streak
        );
        Ok(saved)
    }

    /// Stored counters for a user, zeroed when the user has none yet
    pub async fn stats(&self, user_id: u64) -> Result<StreakRecord> {
        Ok(self
            .database
            .get_streak(user_id)
            .await?
            .unwrap_or_else(|| StreakRecord::new(user_id)))
    }

    /// Whether the user already has a qualifying event today
    pub async fn counted_today(&self, user_id: u64, now: DateTime<Utc>) -> Result<bool> {
        Ok(self
            .database
            .get_streak(user_id)
            .await?
            .is_some_and(|record| record.counted_today(now, self.offset)))
    }

    pub async fn leaderboards(&self, top: i64) -> Result<Leaderboards> {
        Ok(Leaderboards {
            total: self
                .database
                .streak_leaderboard(LeaderboardColumn::Total, top)
                .await?,
            current: self
                .database
                .streak_leaderboard(LeaderboardColumn::CurrentStreak, top)
                .await?,
            best: self
                .database
                .streak_leaderboard(LeaderboardColumn::BestStreak, top)
                .await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn brisbane() -> FixedOffset {
        FixedOffset::east_opt(10 * 3600).unwrap()
    }

    /// Noon in Brisbane on the given May day
    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 2, 0, 0).unwrap()
    }

    async fn tracker() -> StreakTracker {
        StreakTracker::new(Database::new(":memory:").await.unwrap(), brisbane())
    }

    #[tokio::test]
    async fn test_same_day_counts_once() {
        let tracker = tracker().await;
        let first = tracker.record_event(1, noon(1)).await.unwrap();
        assert!(first.new_day);
        assert_eq!(first.previous_streak, 0);

        let second = tracker
            .record_event(1, noon(1) + Duration::hours(4))
            .await
            .unwrap();
        assert!(!second.new_day);
        assert_eq!(second.record.total_count, 2);
        assert_eq!(second.record.current_streak, 1);
    }

    #[tokio::test]
    async fn test_consecutive_days_then_gap() {
        let tracker = tracker().await;
        for day in 1..=3 {
            tracker.record_event(1, noon(day)).await.unwrap();
        }
        assert_eq!(tracker.stats(1).await.unwrap().current_streak, 3);

        let after_gap = tracker.record_event(1, noon(6)).await.unwrap();
        assert_eq!(after_gap.previous_streak, 3);
        assert_eq!(after_gap.record.current_streak, 1);
        assert_eq!(after_gap.record.best_streak, 3);
    }

    #[tokio::test]
    async fn test_mention_counts_total_only() {
        let tracker = tracker().await;
        tracker.record_event(1, noon(1)).await.unwrap();
        let record = tracker.record_mention(1).await.unwrap();
        assert_eq!(record.total_count, 2);
        assert_eq!(record.current_streak, 1);
    }

    #[tokio::test]
    async fn test_counted_today() {
        let tracker = tracker().await;
        assert!(!tracker.counted_today(1, noon(1)).await.unwrap());
        tracker.record_event(1, noon(1)).await.unwrap();
        assert!(tracker.counted_today(1, noon(1)).await.unwrap());
        assert!(!tracker.counted_today(1, noon(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_streak_scenario_persists() {
        let tracker = tracker().await;
        let last_day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        tracker
            .database
            .modify_streak(1, |record| {
                record.current_streak = 45;
                record.best_streak = 45;
                record.total_count = 45;
                record.last_qualifying_day = last_day;
                Ok::<_, Infallible>(())
            })
            .await
            .unwrap()
            .unwrap();

        let now = noon(4);
        let saved = tracker.save_streak(1, now).await.unwrap();
        assert_eq!(saved.current_streak, 15);
        assert_eq!(saved.streak_saved_at, now);

        let stored = tracker.stats(1).await.unwrap();
        assert_eq!(stored.current_streak, 15);
        assert_eq!(stored.streak_saved_at, now);

        // the save bridges the gap, so the next scream continues the streak
        let update = tracker.record_event(1, noon(4) + Duration::hours(1)).await.unwrap();
        assert_eq!(update.record.current_streak, 16);
    }

    #[tokio::test]
    async fn test_rejected_save_leaves_record_untouched() {
        let tracker = tracker().await;
        tracker.record_event(1, noon(1)).await.unwrap();

        let err = tracker.save_streak(1, noon(4)).await.unwrap_err();
        assert!(matches!(err, StreakError::TooShort { streak: 1, required: 30 }));
        assert_eq!(tracker.stats(1).await.unwrap().current_streak, 1);

        // unknown users are not created by a failed save
        assert!(matches!(
            tracker.save_streak(2, noon(4)).await,
            Err(StreakError::TooShort { .. })
        ));
        assert!(tracker.database.get_streak(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_leaderboards() {
        let tracker = tracker().await;
        for day in 1..=3 {
            tracker.record_event(1, noon(day)).await.unwrap();
        }
        tracker.record_event(2, noon(3)).await.unwrap();
        for _ in 0..5 {
            tracker.record_mention(2).await.unwrap();
        }

        let boards = tracker.leaderboards(5).await.unwrap();
        assert_eq!(boards.total[0].user_id, 2);
        assert_eq!(boards.total[0].value, 6);
        assert_eq!(boards.current[0].user_id, 1);
        assert_eq!(boards.best[0].value, 3);
        assert_eq!(boards.best.len(), 2);
    }
}
