// Core layer - shared types and configuration
pub mod core;

// Features layer - reminders, scream streaks and course chats
pub mod features;

// Infrastructure
pub mod database;

// Application layer
pub mod command_handler;
pub mod commands;

pub use core::Config;

pub use features::{
    // Courses
    CourseService, CourseVerifier,
    // Reminders
    CancelOutcome, Reminder, ReminderScheduler, ReminderSink, SerenityDelivery,
    // Streaks
    SettingsStore, StreakSettings, StreakTracker,
};
