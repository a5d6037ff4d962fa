//! # Reminders Feature
//!
//! One-off and repeating reminders that survive restarts.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod delivery;
pub mod model;
pub mod scheduler;

pub use delivery::{ReminderSink, SerenityDelivery};
pub use model::{NewReminder, Reminder};
pub use scheduler::{CancelOutcome, ReminderLimits, ReminderScheduler};
