//! Shared context for command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use crate::core::Config;
use crate::database::Database;
use crate::features::courses::{CourseService, CourseVerifier};
use crate::features::reminders::ReminderScheduler;
use crate::features::streaks::{SettingsStore, StreakTracker};
use std::sync::Arc;

/// Shared context for all command handlers
///
/// Contains the services the handlers and the message listener need:
/// - Database for direct reads (reminder listings)
/// - ReminderScheduler for creating and cancelling reminders
/// - StreakTracker for counting screams and saving streaks
/// - SettingsStore for per-guild statistics settings
/// - CourseService for course chat provisioning
/// - Process configuration
#[derive(Clone)]
pub struct CommandContext {
    pub database: Database,
    pub scheduler: ReminderScheduler,
    pub tracker: StreakTracker,
    pub settings: SettingsStore,
    pub courses: CourseService,
    pub config: Arc<Config>,
}

impl CommandContext {
    pub fn new(
        database: Database,
        scheduler: ReminderScheduler,
        verifier: Arc<dyn CourseVerifier>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            courses: CourseService::new(database.clone(), verifier),
            tracker: StreakTracker::new(database.clone(), config.streak_offset),
            settings: SettingsStore::new(database.clone()),
            database,
            scheduler,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DeliveryError;
use crate::features::courses::FormatOnly;
    use crate::features::reminders::{Reminder, ReminderSink};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct NullSink;

    #[async_trait]
    impl ReminderSink for NullSink {
        async fn deliver(&self, _: &Reminder, _: DateTime<Utc>) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    #[test]
    fn test_command_context_clone() {
        // CommandContext should be Clone for sharing across handlers
        fn assert_clone<T: Clone>() {}
        assert_clone::<CommandContext>();
    }

    #[tokio::test]
    async fn test_tracker_uses_configured_offset() {
        let config = Arc::new(
            Config::from_lookup(|key| match key {
                "DISCORD_TOKEN" => Some("token".to_string()),
                "STREAK_UTC_OFFSET_HOURS" => Some("-3".to_string()),
                _ => None,
            })
            .unwrap(),
        );
        let database = Database::new(":memory:").await.unwrap();
        let scheduler = ReminderScheduler::new(database.clone(), Arc::new(NullSink), &config);
        let ctx = CommandContext::new(database, scheduler, Arc::new(FormatOnly), config);

        assert_eq!(ctx.tracker.offset().local_minus_utc(), -3 * 3600);
    }
}
