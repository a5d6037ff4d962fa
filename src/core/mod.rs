//! # Core Module
//!
//! Configuration, error taxonomy, time helpers and Discord reply helpers.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod config;
pub mod error;
pub mod response;
pub mod time;

// Re-export commonly used items
pub use config::Config;
pub use error::{CourseError, DeliveryError, ReminderError, StreakError};
pub use response::{
    defer, edit_reply, edit_reply_embed, reply, reply_embed, truncate_for_field,
    truncate_for_message, MESSAGE_LIMIT,
};
pub use time::{discord_timestamp, format_duration, local_day, parse_duration, TimestampStyle};
