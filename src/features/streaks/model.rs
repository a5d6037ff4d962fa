//! Streak record and its day-boundary rules
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! A missed day does not zero the stored streak. The streak is only reset when
//! the next qualifying event arrives after a gap, unless a streak save bridged
//! that gap. Until then the saver can still rescue it.

use crate::core::error::StreakError;
use crate::core::time::local_day;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Preconditions and price of the streak saver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaverRules {
    /// Minimum current streak for a save
    pub min_streak: i64,
    /// Days taken off the streak by a save
    pub cost: i64,
    /// Minimum spacing between two saves
    pub cooldown: Duration,
    /// Most missed days a save can still cover
    pub max_missed_days: i64,
}

impl Default for SaverRules {
    fn default() -> Self {
        Self {
            min_streak: 30,
            cost: 30,
            cooldown: Duration::days(180),
            max_missed_days: 7,
        }
    }
}

/// Per-user counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub user_id: u64,
    pub total_count: i64,
    pub current_streak: i64,
    pub best_streak: i64,
    /// Local calendar day of the last qualifying event
    pub last_qualifying_day: NaiveDate,
    /// Last streak save, or the epoch when none happened
    pub streak_saved_at: DateTime<Utc>,
}

impl StreakRecord {
    /// Fresh record for a user with no history
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            total_count: 0,
            current_streak: 0,
            best_streak: 0,
            last_qualifying_day: DateTime::<Utc>::UNIX_EPOCH.date_naive(),
            streak_saved_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Count a qualifying event. Returns true on the first event of `today`.
    pub fn apply_event(&mut self, event_time: DateTime<Utc>, offset: FixedOffset) -> bool {
        self.total_count += 1;

        let today = local_day(event_time, offset);
        if self.last_qualifying_day >= today {
            return false;
        }

        let continues = today.pred_opt() == Some(self.last_qualifying_day)
            || self.save_bridges_gap(today, offset);

        self.current_streak = if continues {
            self.current_streak + 1
        } else {
            1
        };
        self.best_streak = self.best_streak.max(self.current_streak);
        self.last_qualifying_day = today;
        true
    }

    /// Count a secondary-pattern message: total only, never the streak
    pub fn apply_mention(&mut self) {
        self.total_count += 1;
    }

    /// A save made after the last qualifying day keeps the streak alive
    /// through the save day and the day after it
    fn save_bridges_gap(&self, today: NaiveDate, offset: FixedOffset) -> bool {
        let saved_day = local_day(self.streak_saved_at, offset);
        saved_day > self.last_qualifying_day && (today - saved_day).num_days() <= 1
    }

    /// Whether a save already covers the days missed up to `now`
    pub fn save_covers_gap(&self, now: DateTime<Utc>, offset: FixedOffset) -> bool {
        self.save_bridges_gap(local_day(now, offset), offset)
    }

    /// Spend `rules.cost` days of streak to cover missed days
    pub fn apply_save(
        &mut self,
        now: DateTime<Utc>,
        offset: FixedOffset,
        rules: &SaverRules,
    ) -> Result<(), StreakError> {
        if self.current_streak < rules.min_streak {
            return Err(StreakError::TooShort {
                streak: self.current_streak,
                required: rules.min_streak,
            });
        }

        let next_allowed = self.streak_saved_at + rules.cooldown;
        if now < next_allowed {
            return Err(StreakError::TooRecent { next_allowed });
        }

        let missed_days = self.missed_days(now, offset);
        if missed_days < 1 {
            return Err(StreakError::NotMissed);
        }
        if missed_days > rules.max_missed_days {
            return Err(StreakError::TooOld {
                missed_days,
                max: rules.max_missed_days,
            });
        }

        self.current_streak -= rules.cost;
        self.streak_saved_at = now;
        Ok(())
    }

    /// Whole days without a qualifying event between the last one and today
    pub fn missed_days(&self, now: DateTime<Utc>, offset: FixedOffset) -> i64 {
        (local_day(now, offset) - self.last_qualifying_day).num_days() - 1
    }

    /// Whether a qualifying event was already counted today
    pub fn counted_today(&self, now: DateTime<Utc>, offset: FixedOffset) -> bool {
        self.last_qualifying_day >= local_day(now, offset)
    }
}

/// Result of recording an event, for threshold side effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakUpdate {
    pub record: StreakRecord,
    pub previous_streak: i64,
    /// First qualifying event of the day
    pub new_day: bool,
}

impl StreakUpdate {
    /// Whether this update moved the streak from below `threshold` to at least it
    pub fn crossed(&self, threshold: i64) -> bool {
        threshold > 0
            && self.new_day
            && self.previous_streak < threshold
            && self.record.current_streak >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn brisbane() -> FixedOffset {
        FixedOffset::east_opt(10 * 3600).unwrap()
    }

    /// 02:00 UTC on the given May day, which is noon in Brisbane
    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 2, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn record_with(current: i64, last_day: NaiveDate) -> StreakRecord {
        StreakRecord {
            user_id: 7,
            total_count: current,
            current_streak: current,
            best_streak: current,
            last_qualifying_day: last_day,
            streak_saved_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_first_event_starts_streak() {
        let mut record = StreakRecord::new(7);
        assert!(record.apply_event(noon(1), brisbane()));
        assert_eq!(record.total_count, 1);
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.best_streak, 1);
        assert_eq!(record.last_qualifying_day, date(1));
    }

    #[test]
    fn test_same_day_counts_total_only() {
        let mut record = StreakRecord::new(7);
        assert!(record.apply_event(noon(1), brisbane()));
        assert!(!record.apply_event(noon(1) + Duration::hours(3), brisbane()));
        assert_eq!(record.total_count, 2);
        assert_eq!(record.current_streak, 1);
    }

    #[test]
    fn test_consecutive_days_extend() {
        let mut record = StreakRecord::new(7);
        for day in 1..=4 {
            assert!(record.apply_event(noon(day), brisbane()));
        }
        assert_eq!(record.current_streak, 4);
        assert_eq!(record.best_streak, 4);
    }

    #[test]
    fn test_gap_resets_to_one() {
        let mut record = StreakRecord::new(7);
        record.apply_event(noon(1), brisbane());
        record.apply_event(noon(2), brisbane());
        record.apply_event(noon(3), brisbane());
        assert!(record.apply_event(noon(6), brisbane()));
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.best_streak, 3);
    }

    #[test]
    fn test_day_boundary_follows_offset() {
        let mut record = StreakRecord::new(7);
        // 13:30 UTC is 23:30 in Brisbane, 14:30 UTC is 00:30 the next day
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 13, 30, 0).unwrap();
        let after_midnight = Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap();
        assert!(record.apply_event(late, brisbane()));
        assert!(record.apply_event(after_midnight, brisbane()));
        assert_eq!(record.current_streak, 2);
    }

    #[test]
    fn test_missed_day_is_not_reset_until_next_event() {
        let record = record_with(40, date(1));
        // nothing happens to the stored streak just because days pass
        assert_eq!(record.current_streak, 40);
        assert_eq!(record.missed_days(noon(4), brisbane()), 2);
    }

    #[test]
    fn test_current_never_exceeds_best() {
        let mut record = StreakRecord::new(7);
        for day in [1, 2, 3, 5, 6, 9, 10, 11, 12] {
            record.apply_event(noon(day), brisbane());
            assert!(record.current_streak <= record.best_streak);
        }
        assert_eq!(record.best_streak, 4);
    }

    #[test]
    fn test_save_scenario() {
        let mut record = record_with(45, date(1));
        let now = noon(4);
        record
            .apply_save(now, brisbane(), &SaverRules::default())
            .unwrap();
        assert_eq!(record.current_streak, 15);
        assert_eq!(record.streak_saved_at, now);
        assert!(record.current_streak <= record.best_streak);
    }

    #[test]
    fn test_save_too_short_regardless_of_gap() {
        for last in [1, 3, 20, 29, 30] {
            let mut record = record_with(29, date(last));
            let err = record
                .apply_save(noon(31), brisbane(), &SaverRules::default())
                .unwrap_err();
            assert!(matches!(err, StreakError::TooShort { streak: 29, required: 30 }));
        }
    }

    #[test]
    fn test_save_not_missed() {
        let rules = SaverRules::default();
        let mut yesterday = record_with(50, date(3));
        assert!(matches!(
            yesterday.apply_save(noon(4), brisbane(), &rules),
            Err(StreakError::NotMissed)
        ));
        let mut today = record_with(50, date(4));
        assert!(matches!(
            today.apply_save(noon(4), brisbane(), &rules),
            Err(StreakError::NotMissed)
        ));
        assert_eq!(today.current_streak, 50);
    }

    #[test]
    fn test_save_too_old() {
        let mut record = record_with(50, date(1));
        let err = record
            .apply_save(noon(10), brisbane(), &SaverRules::default())
            .unwrap_err();
        assert!(matches!(err, StreakError::TooOld { missed_days: 8, max: 7 }));

        let mut edge = record_with(50, date(1));
        assert!(edge
            .apply_save(noon(9), brisbane(), &SaverRules::default())
            .is_ok());
    }

    #[test]
    fn test_save_too_recent() {
        let mut record = record_with(80, date(1));
        record.streak_saved_at = noon(1) - Duration::days(100);
        let err = record
            .apply_save(noon(4), brisbane(), &SaverRules::default())
            .unwrap_err();
        match err {
            StreakError::TooRecent { next_allowed } => {
                assert_eq!(next_allowed, noon(1) + Duration::days(80));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_save_bridges_next_event() {
        let offset = brisbane();
        let mut record = record_with(45, date(1));
        record
            .apply_save(noon(4), offset, &SaverRules::default())
            .unwrap();
        assert!(record.apply_event(noon(4) + Duration::hours(2), offset));
        assert_eq!(record.current_streak, 16);
        assert!(record.apply_event(noon(5), offset));
        assert_eq!(record.current_streak, 17);
    }

    #[test]
    fn test_save_bridge_expires() {
        let offset = brisbane();
        let mut record = record_with(45, date(1));
        record
            .apply_save(noon(4), offset, &SaverRules::default())
            .unwrap();
        // save on the 4th covers the 4th and 5th, the 6th is too late
        let mut late = record.clone();
        assert!(late.apply_event(noon(6), offset));
        assert_eq!(late.current_streak, 1);
        assert!(record.apply_event(noon(5), offset));
        assert_eq!(record.current_streak, 16);
    }

    #[test]
    fn test_save_covers_gap() {
        let offset = brisbane();
        let mut record = record_with(45, date(1));
        assert!(!record.save_covers_gap(noon(4), offset));

        record
            .apply_save(noon(4), offset, &SaverRules::default())
            .unwrap();
        assert!(record.save_covers_gap(noon(4), offset));
        assert!(record.save_covers_gap(noon(5), offset));
        assert!(!record.save_covers_gap(noon(6), offset));
    }

    #[test]
    fn test_mention_counts_total_only() {
        let mut record = record_with(3, date(1));
        record.apply_mention();
        assert_eq!(record.total_count, 4);
        assert_eq!(record.current_streak, 3);
        assert_eq!(record.last_qualifying_day, date(1));
    }

    #[test]
    fn test_crossed_threshold() {
        let mut record = record_with(99, date(1));
        let new_day = record.apply_event(noon(2), brisbane());
        let update = StreakUpdate {
            record: record.clone(),
            previous_streak: 99,
            new_day,
        };
        assert!(update.crossed(100));
        assert!(!update.crossed(250));
        assert!(!update.crossed(0));

        let again = StreakUpdate {
            record,
            previous_streak: 100,
            new_day: false,
        };
        assert!(!again.crossed(100));
    }
}
