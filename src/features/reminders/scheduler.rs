//! # Reminder Scheduler
//!
//! One suspended task per reminder, registered in a map of cancellable
//! handles keyed by reminder id.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! ## Lifecycle
//!
//! Each handle carries an atomic state. A timer moves `PENDING -> FIRING`
//! before it delivers and back to `PENDING` when it is armed for another
//! round. `cancel` swaps in `CANCELLED`; a timer that loses that race never
//! delivers, and one that is already delivering finishes the current firing
//! and stops.
//!
//! One-off reminders fire once, late if the process was down past their due
//! time, and then lose their row. Repeating reminders keep their row and
//! fire on `requested_time + k * interval`.

use crate::core::config::Config;
use crate::core::error::{DeliveryError, ReminderError};
use crate::core::time::{discord_timestamp, format_duration, parse_duration, TimestampStyle, DAY, HOUR};
use crate::database::Database;
use crate::features::reminders::delivery::ReminderSink;
use crate::features::reminders::model::{NewReminder, Reminder};
use anyhow::{Context as _, Result};
use chrono::{Duration as ChronoDuration, SubsecRound, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const PENDING: u8 = 0;
const FIRING: u8 = 1;
const CANCELLED: u8 = 2;

/// Bounds enforced on new reminders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderLimits {
    pub max_delay_seconds: i64,
    pub min_repeat_seconds: i64,
}

impl ReminderLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_delay_seconds: config.reminder_max_days * DAY,
            min_repeat_seconds: config.reminder_min_repeat_hours * HOUR,
        }
    }
}

/// Result of a successful `cancel` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The reminder existed and has been stopped and removed
    Cancelled(Reminder),
    /// Nothing left to cancel (already fired, cancelled, or never existed)
    AlreadyGone,
}

struct ScheduledTimer {
    state: Arc<AtomicU8>,
    task: JoinHandle<()>,
}

#[derive(Clone)]
pub struct ReminderScheduler {
    database: Database,
    sink: Arc<dyn ReminderSink>,
    retry: Option<Duration>,
    limits: ReminderLimits,
    timers: Arc<DashMap<i64, ScheduledTimer>>,
}

impl ReminderScheduler {
    pub fn new(database: Database, sink: Arc<dyn ReminderSink>, config: &Config) -> Self {
        Self {
            database,
            sink,
            retry: config.reminder_retry,
            limits: ReminderLimits::from_config(config),
            timers: Arc::new(DashMap::new()),
        }
    }

    /// Override the transient-failure retry delay for one-off reminders
    pub fn with_retry(mut self, retry: Option<Duration>) -> Self {
        self.retry = retry;
        self
    }

    /// Validate, persist and schedule a new reminder
    pub async fn create(
        &self,
        owner: u64,
        destination: u64,
        duration: &str,
        message: &str,
        repeat: bool,
    ) -> Result<Reminder, ReminderError> {
        let seconds = parse_duration(duration).ok_or_else(|| {
            ReminderError::Validation(format!(
                "Invalid time format `{duration}`. Use combinations like 30m, 1h30m, 2d or 1w3d."
            ))
        })?;

        if seconds > self.limits.max_delay_seconds {
            return Err(ReminderError::Validation(format!(
                "Reminders can be at most {} away.",
                format_duration(self.limits.max_delay_seconds)
            )));
        }
        if repeat && seconds < self.limits.min_repeat_seconds {
            return Err(ReminderError::Validation(format!(
                "Repeating reminders need an interval of at least {}.",
                format_duration(self.limits.min_repeat_seconds)
            )));
        }

        let message = message.trim();
        if message.is_empty() {
            return Err(ReminderError::Validation(
                "The reminder message cannot be empty.".to_string(),
            ));
        }

        // stored timestamps keep millisecond precision
        let now = Utc::now().trunc_subsecs(3);
        let reminder = self
            .database
            .add_reminder(&NewReminder {
                owner,
                destination,
                message: message.to_string(),
                send_time: now + ChronoDuration::seconds(seconds),
                requested_time: now,
                repeat,
            })
            .await?;

        self.schedule(reminder.clone());
        Ok(reminder)
    }

    /// Start a timer for `reminder` unless one is already running for its id
    ///
    /// Returns false when the reminder was already scheduled or carries an
    /// unusable repeat interval.
    pub fn schedule(&self, reminder: Reminder) -> bool {
        if !reminder.has_valid_interval() {
            warn!(
                "⚠️ Skipping reminder #{}: repeat interval is not positive",
                reminder.id
            );
            return false;
        }

        match self.timers.entry(reminder.id) {
            Entry::Occupied(_) => {
                debug!("Reminder #{} is already scheduled", reminder.id);
                false
            }
            Entry::Vacant(slot) => {
                let due = reminder.next_fire_at(Utc::now());
                info!(
                    "⏰ Scheduled reminder #{} for {} (repeat: {})",
                    reminder.id,
                    discord_timestamp(due, TimestampStyle::ShortDateTime),
                    reminder.repeat
                );

                let state = Arc::new(AtomicU8::new(PENDING));
                let scheduler = self.clone();
                let task_state = state.clone();
                let task = tokio::spawn(async move {
                    scheduler.run_timer(reminder, task_state).await;
                });
                slot.insert(ScheduledTimer { state, task });
                true
            }
        }
    }

    /// Cancel a reminder on behalf of `requester`
    pub async fn cancel(&self, id: i64, requester: u64) -> Result<CancelOutcome, ReminderError> {
        let Some(reminder) = self.database.get_reminder(id).await? else {
            self.stop(id);
            return Ok(CancelOutcome::AlreadyGone);
        };

        if reminder.owner != requester {
            return Err(ReminderError::NotAuthorized { id });
        }

        self.stop(id);
        self.database.delete_reminder(id).await?;
        info!("🛑 Cancelled reminder #{id}");
        Ok(CancelOutcome::Cancelled(reminder))
    }

    /// Schedule every stored reminder; run once at startup
    ///
    /// A store failure aborts rehydration so the caller can refuse to start.
    pub async fn rehydrate(&self) -> Result<usize> {
        let reminders = self
            .database
            .get_all_reminders()
            .await
            .context("Failed to load reminders for rehydration")?;

        let total = reminders.len();
        let scheduled = reminders
            .into_iter()
            .filter(|reminder| self.schedule(reminder.clone()))
            .count();

        info!("⏰ Rehydrated {scheduled} of {total} stored reminder(s)");
        Ok(scheduled)
    }

    pub fn is_scheduled(&self, id: i64) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Stop the timer for `id`, if any. Returns whether a timer was registered.
    fn stop(&self, id: i64) -> bool {
        match self.timers.remove(&id) {
            Some((_, timer)) => {
                if timer.state.swap(CANCELLED, Ordering::AcqRel) == PENDING {
                    timer.task.abort();
                }
                true
            }
            None => false,
        }
    }

    async fn run_timer(self, reminder: Reminder, state: Arc<AtomicU8>) {
        let mut due = reminder.next_fire_at(Utc::now());

        loop {
            let delay = (due - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(delay).await;

            if state
                .compare_exchange(PENDING, FIRING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }

            let scheduled_at = if reminder.repeat {
                due
            } else {
                reminder.send_time
            };

            match self.sink.deliver(&reminder, scheduled_at).await {
                Ok(()) if !reminder.repeat => {
                    info!("📨 Delivered reminder #{}", reminder.id);
                    self.finish(&reminder, &state).await;
                    return;
                }
                Ok(()) => {
                    info!("📨 Delivered repeating reminder #{}", reminder.id);
                }
                Err(DeliveryError::DestinationGone(reason)) => {
                    warn!(
                        "🗑️ Destination for reminder #{} is gone, removing it: {reason}",
                        reminder.id
                    );
                    self.finish(&reminder, &state).await;
                    return;
                }
                Err(DeliveryError::Transient(reason)) if reminder.repeat => {
                    warn!(
                        "⚠️ Repeating reminder #{} failed, waiting for the next interval: {reason}",
                        reminder.id
                    );
                }
                Err(DeliveryError::Transient(reason)) => match self.retry {
                    Some(retry) => {
                        warn!(
                            "⚠️ Reminder #{} failed, retrying in {}: {reason}",
                            reminder.id,
                            format_duration(retry.as_secs() as i64)
                        );
                        due = Utc::now() + to_chrono(retry);
                    }
                    None => {
                        warn!(
                            "⚠️ Reminder #{} failed, keeping it for the next start: {reason}",
                            reminder.id
                        );
                        self.release(reminder.id, &state);
                        return;
                    }
                },
            }

            if reminder.repeat {
                let after = Utc::now().max(due + ChronoDuration::milliseconds(1));
                due = reminder.next_fire_at(after);
            }

            if state
                .compare_exchange(FIRING, PENDING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                debug!("Reminder #{} was cancelled while firing", reminder.id);
                return;
            }
        }
    }

    /// Drop the row and the handle of a reminder that will never fire again
    async fn finish(&self, reminder: &Reminder, state: &Arc<AtomicU8>) {
        if let Err(e) = self.database.delete_reminder(reminder.id).await {
            error!("❌ Failed to delete reminder #{}: {e:#}", reminder.id);
        }
        self.release(reminder.id, state);
    }

    /// Forget this task's handle, leaving any newer handle for the same id alone
    fn release(&self, id: i64, state: &Arc<AtomicU8>) {
        self.timers
            .remove_if(&id, |_, timer| Arc::ptr_eq(&timer.state, state));
    }
}

fn to_chrono(duration: Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::seconds(60))
}
