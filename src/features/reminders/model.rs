//! Reminder record and phase arithmetic
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A persisted one-off or repeating reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Assigned by the store
    pub id: i64,

    /// User who asked for the reminder
    pub owner: u64,

    /// Channel the reminder is delivered to
    pub destination: u64,

    pub message: String,

    /// First due time. Repeating reminders keep this as their interval anchor.
    pub send_time: DateTime<Utc>,

    /// When the reminder was requested (phase anchor)
    pub requested_time: DateTime<Utc>,

    pub repeat: bool,
}

/// Fields of a reminder before the store assigns an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub owner: u64,
    pub destination: u64,
    pub message: String,
    pub send_time: DateTime<Utc>,
    pub requested_time: DateTime<Utc>,
    pub repeat: bool,
}

impl NewReminder {
    pub fn with_id(self, id: i64) -> Reminder {
        Reminder {
            id,
            owner: self.owner,
            destination: self.destination,
            message: self.message,
            send_time: self.send_time,
            requested_time: self.requested_time,
            repeat: self.repeat,
        }
    }
}

impl Reminder {
    /// Repeat interval, derived once from the anchor pair
    pub fn interval(&self) -> Duration {
        self.send_time - self.requested_time
    }

    /// Next firing at or after `now`
    ///
    /// One-off reminders always answer `send_time`, which is in the past when
    /// the process was down past the due time. Repeating reminders answer
    /// `requested_time + k * interval` for the smallest `k >= 1` that is not
    /// before `now`, so downtime never shifts the phase. Intervals are whole
    /// milliseconds.
    pub fn next_fire_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if !self.repeat || now <= self.send_time {
            return self.send_time;
        }

        let interval = self.interval().num_milliseconds();
        if interval <= 0 {
            return self.send_time;
        }

        let elapsed = (now - self.requested_time).num_milliseconds();
        let mut periods = elapsed / interval;
        let mut candidate = self.requested_time + Duration::milliseconds(interval * periods);
        // elapsed is truncated to whole milliseconds, so step past `now` if needed
        while candidate < now {
            periods += 1;
            candidate = self.requested_time + Duration::milliseconds(interval * periods);
        }
        candidate
    }

    /// Whether the reminder is a repeating one with a usable interval
    pub fn has_valid_interval(&self) -> bool {
        !self.repeat || self.interval() > Duration::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    fn reminder(requested: DateTime<Utc>, send: DateTime<Utc>, repeat: bool) -> Reminder {
        Reminder {
            id: 1,
            owner: 10,
            destination: 20,
            message: "stretch".to_string(),
            send_time: send,
            requested_time: requested,
            repeat,
        }
    }

    #[test]
    fn test_one_off_fires_at_send_time() {
        let r = reminder(at(10, 0, 0), at(10, 30, 0), false);
        assert_eq!(r.next_fire_at(at(10, 5, 0)), at(10, 30, 0));
        // overdue stays overdue: fire late, once
        assert_eq!(r.next_fire_at(at(12, 0, 0)), at(10, 30, 0));
    }

    #[test]
    fn test_repeating_before_first_firing() {
        let r = reminder(at(10, 0, 0), at(11, 0, 0), true);
        assert_eq!(r.next_fire_at(at(10, 20, 0)), at(11, 0, 0));
    }

    #[test]
    fn test_repeating_preserves_phase_after_downtime() {
        // hourly from 10:00, process comes back at 13:25
        let r = reminder(at(10, 0, 0), at(11, 0, 0), true);
        assert_eq!(r.next_fire_at(at(13, 25, 0)), at(14, 0, 0));
        assert_eq!(r.next_fire_at(at(13, 59, 59)), at(14, 0, 0));
    }

    #[test]
    fn test_repeating_exactly_on_boundary() {
        let r = reminder(at(10, 0, 0), at(11, 0, 0), true);
        assert_eq!(r.next_fire_at(at(13, 0, 0)), at(13, 0, 0));
        assert_eq!(
            r.next_fire_at(at(13, 0, 0) + Duration::milliseconds(1)),
            at(14, 0, 0)
        );
    }

    #[test]
    fn test_repeating_lands_exactly_on_phase() {
        let requested = at(10, 0, 0) + Duration::microseconds(400);
        let r = reminder(requested, requested + Duration::seconds(1), true);
        let now = requested + Duration::microseconds(2_300_500);
        assert_eq!(r.next_fire_at(now), requested + Duration::seconds(3));
    }

    #[test]
    fn test_interval_is_derived_from_anchor() {
        let r = reminder(at(10, 0, 0), at(22, 0, 0), true);
        assert_eq!(r.interval(), Duration::hours(12));
        assert!(r.has_valid_interval());

        let broken = reminder(at(10, 0, 0), at(10, 0, 0), true);
        assert!(!broken.has_valid_interval());
        assert!(reminder(at(10, 0, 0), at(10, 0, 0), false).has_valid_interval());
    }
}
