//! # Features Layer
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

pub mod courses;
pub mod reminders;
pub mod streaks;

pub use courses::{CourseService, CourseVerifier};
pub use reminders::{CancelOutcome, Reminder, ReminderScheduler, ReminderSink, SerenityDelivery};
pub use streaks::{SettingsStore, StreakSettings, StreakTracker};
