//! Error taxonomy shared by the reminder, streak and course features
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Store access returns `anyhow::Result`; these enums carry the outcomes a
//! command handler has to tell apart when replying to a user.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while creating or cancelling reminders
#[derive(Debug, Error)]
pub enum ReminderError {
    /// Bad user input (unparseable duration, out-of-range delay, ...)
    #[error("{0}")]
    Validation(String),

    /// The reminder belongs to someone else
    #[error("reminder #{id} does not belong to you")]
    NotAuthorized { id: i64 },

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

/// Outcome of a failed delivery attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The destination channel no longer exists or is unreachable for good
    #[error("destination gone: {0}")]
    DestinationGone(String),

    /// Rate limits, network blips and anything else worth retrying
    #[error("transient delivery failure: {0}")]
    Transient(String),
}

/// Errors raised by the streak saver (and store failures underneath it)
#[derive(Debug, Error)]
pub enum StreakError {
    #[error("your streak is {streak} days, at least {required} are needed to save it")]
    TooShort { streak: i64, required: i64 },

    #[error("you already saved a streak recently, next save allowed {next_allowed}")]
    TooRecent { next_allowed: DateTime<Utc> },

    #[error("you have not missed a day, there is nothing to save")]
    NotMissed,

    #[error("your streak lapsed {missed_days} days ago, saves only reach back {max} days")]
    TooOld { missed_days: i64, max: i64 },

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

/// Errors raised by course channel provisioning
#[derive(Debug, Error)]
pub enum CourseError {
    #[error("`{0}` is not a course code, expected something like CSSE1001")]
    InvalidCode(String),

    #[error("{0} is not listed in the course catalogue")]
    UnknownCourse(String),

    #[error("{descriptor} courses cannot be joined in this server, allowed: {}", allowed_list(.allowed))]
    DescriptorNotAllowed {
        descriptor: String,
        allowed: Vec<String>,
    },

    #[error("codes must be 4 capital letters separated by commas, got `{0}`")]
    InvalidDescriptors(String),

    #[error("you are already enrolled in {0}")]
    AlreadyEnrolled(String),

    #[error("you are not enrolled in {0}")]
    NotEnrolled(String),

    #[error("no channel exists for {0} yet")]
    NoSuchChannel(String),

    #[error("<#{0}> is not a course channel")]
    NotACourseChannel(u64),

    /// Store, Discord or catalogue failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn allowed_list(allowed: &[String]) -> String {
    if allowed.is_empty() {
        "none".to_string()
    } else {
        allowed.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_is_transparent() {
        let err: ReminderError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_streak_messages_name_the_failure() {
        let err = StreakError::TooShort {
            streak: 12,
            required: 30,
        };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("30"));

        let err = StreakError::TooOld {
            missed_days: 9,
            max: 7,
        };
        assert!(err.to_string().contains("9 days"));
    }

    #[test]
    fn test_course_messages() {
        let err = CourseError::DescriptorNotAllowed {
            descriptor: "MATH".to_string(),
            allowed: vec!["CSSE".to_string(), "COMP".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "MATH courses cannot be joined in this server, allowed: CSSE, COMP"
        );

        let err = CourseError::DescriptorNotAllowed {
            descriptor: "MATH".to_string(),
            allowed: Vec::new(),
        };
        assert!(err.to_string().ends_with("allowed: none"));
    }
}
