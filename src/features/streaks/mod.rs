//! # Streaks Feature
//!
//! Daily "scream" streaks per user, with a once-in-a-while streak saver and
//! per-guild statistics settings.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: true

pub mod model;
pub mod settings;
pub mod tracker;

pub use model::{SaverRules, StreakRecord, StreakUpdate};
pub use settings::{EventMatch, SettingsRow, SettingsStore, SettingsUpdate, StreakSettings};
pub use tracker::{Leaderboards, StreakTracker};
