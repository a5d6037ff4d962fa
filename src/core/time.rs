//! Duration parsing and time formatting shared by reminders and streaks
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

pub const MINUTE: i64 = 60;
pub const HOUR: i64 = 60 * MINUTE;
pub const DAY: i64 = 24 * HOUR;
pub const WEEK: i64 = 7 * DAY;

static DURATION_PATTERN: OnceLock<Regex> = OnceLock::new();

fn duration_pattern() -> &'static Regex {
    DURATION_PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$")
            .expect("duration pattern is valid")
    })
}

/// Parse a duration like "30m", "2h", "1d", "1h30m" or "1w3d" into seconds
///
/// Units must appear largest first. Returns `None` for anything that does not
/// fully match or adds up to zero.
pub fn parse_duration(input: &str) -> Option<i64> {
    let input = input.trim().to_lowercase();
    let captures = duration_pattern().captures(&input)?;

    let mut total: i64 = 0;
    for (group, unit) in [(1, WEEK), (2, DAY), (3, HOUR), (4, MINUTE), (5, 1)] {
        if let Some(value) = captures.get(group) {
            let value: i64 = value.as_str().parse().ok()?;
            total = total.checked_add(value.checked_mul(unit)?)?;
        }
    }

    (total > 0).then_some(total)
}

fn plural(value: i64, unit: &str) -> String {
    format!("{} {}{}", value, unit, if value == 1 { "" } else { "s" })
}

/// Format seconds as the two most significant units, e.g. "1 day 4 hours"
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let parts = [
        (seconds / DAY, "day"),
        ((seconds % DAY) / HOUR, "hour"),
        ((seconds % HOUR) / MINUTE, "minute"),
        (seconds % MINUTE, "second"),
    ];

    let Some(first) = parts.iter().position(|(value, _)| *value > 0) else {
        return plural(0, "second");
    };

    let mut out = plural(parts[first].0, parts[first].1);
    if let Some((value, unit)) = parts.get(first + 1) {
        if *value > 0 {
            out.push(' ');
            out.push_str(&plural(*value, unit));
        }
    }
    out
}

/// Discord timestamp markup styles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStyle {
    /// `20 April 2021 16:20`
    ShortDateTime,
    /// `Tuesday, 20 April 2021 16:20`
    LongDateTime,
    /// `in 2 months`
    Relative,
}

impl TimestampStyle {
    fn flag(self) -> char {
        match self {
            TimestampStyle::ShortDateTime => 'f',
            TimestampStyle::LongDateTime => 'F',
            TimestampStyle::Relative => 'R',
        }
    }
}

/// Render `<t:unix:style>` so each client shows the time in its own zone
pub fn discord_timestamp(at: DateTime<Utc>, style: TimestampStyle) -> String {
    format!("<t:{}:{}>", at.timestamp(), style.flag())
}

/// Calendar day of `at` in the given offset
pub fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Some(30));
        assert_eq!(parse_duration("30m"), Some(1800));
        assert_eq!(parse_duration("2h"), Some(7200));
        assert_eq!(parse_duration("1d"), Some(86400));
        assert_eq!(parse_duration("1w"), Some(604800));
        assert_eq!(parse_duration("1h30m"), Some(5400));
        assert_eq!(parse_duration("1w3d"), Some(864000));
        assert_eq!(parse_duration(" 2H "), Some(7200));
    }

    #[test]
    fn test_parse_duration_rejects() {
        assert_eq!(parse_duration("invalid"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("0m"), None);
        assert_eq!(parse_duration("30"), None);
        assert_eq!(parse_duration("30m1h"), None);
        assert_eq!(parse_duration("99999999999999999999w"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0 seconds");
        assert_eq!(format_duration(1), "1 second");
        assert_eq!(format_duration(30), "30 seconds");
        assert_eq!(format_duration(60), "1 minute");
        assert_eq!(format_duration(125), "2 minutes 5 seconds");
        assert_eq!(format_duration(3600), "1 hour");
        assert_eq!(format_duration(3660), "1 hour 1 minute");
        assert_eq!(format_duration(86400), "1 day");
        assert_eq!(format_duration(90000), "1 day 1 hour");
        assert_eq!(format_duration(86400 + 60), "1 day");
    }

    #[test]
    fn test_discord_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 6, 6, 6, 29, 10).unwrap();
        assert_eq!(
            discord_timestamp(at, TimestampStyle::Relative),
            format!("<t:{}:R>", at.timestamp())
        );
        assert!(discord_timestamp(at, TimestampStyle::LongDateTime).ends_with(":F>"));
    }

    #[test]
    fn test_local_day_crosses_midnight() {
        let brisbane = FixedOffset::east_opt(10 * 3600).unwrap();
        // 15:00 UTC is 01:00 the next day in Brisbane
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();
        assert_eq!(
            local_day(at, brisbane),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 13, 59, 59).unwrap();
        assert_eq!(
            local_day(at, brisbane),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }
}
