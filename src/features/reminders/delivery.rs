//! Reminder delivery sink
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! The scheduler only knows the [`ReminderSink`] trait. The Discord
//! implementation posts an embed into the destination channel and pings the
//! owner, and nobody else.

use crate::core::error::DeliveryError;
use crate::core::response::truncate_for_field;
use crate::core::time::{discord_timestamp, format_duration, TimestampStyle};
use crate::features::reminders::model::Reminder;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serenity::builder::CreateEmbed;
use serenity::http::{Http, HttpError};
use serenity::model::id::{ChannelId, UserId};
use std::sync::Arc;

const REMINDER_COLOR: u32 = 0x3498DB;

/// Firings later than this past their scheduled time are marked late
const LATE_AFTER_SECONDS: i64 = 60;

/// Discord JSON error codes meaning the destination is gone for good
const UNKNOWN_CHANNEL: isize = 10003;
const UNKNOWN_USER: isize = 10013;
const MISSING_ACCESS: isize = 50001;
const MISSING_PERMISSIONS: isize = 50013;

/// Where due reminders go
#[async_trait]
pub trait ReminderSink: Send + Sync {
    /// Deliver one firing of `reminder`, scheduled for `scheduled_at`
    async fn deliver(
        &self,
        reminder: &Reminder,
        scheduled_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError>;
}

/// Posts reminders through the Discord REST API
pub struct SerenityDelivery {
    http: Arc<Http>,
}

impl SerenityDelivery {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ReminderSink for SerenityDelivery {
    async fn deliver(
        &self,
        reminder: &Reminder,
        scheduled_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        let embed = reminder_embed(reminder, scheduled_at, Utc::now());
        let owner = UserId(reminder.owner);

        ChannelId(reminder.destination)
            .send_message(&self.http, |m| {
                m.content(format!("<@{}>", reminder.owner))
                    .set_embed(embed)
                    .allowed_mentions(|am| am.empty_parse().users(vec![owner]))
            })
            .await
            .map(|_| ())
            .map_err(|e| classify_error(&e))
    }
}

/// Sort a serenity error into permanent or retryable
pub fn classify_error(error: &serenity::Error) -> DeliveryError {
    if let serenity::Error::Http(http_error) = error {
        if let HttpError::UnsuccessfulRequest(response) = http_error.as_ref() {
            return classify_status(
                response.status_code.as_u16(),
                response.error.code,
                &response.error.message,
            );
        }
    }
    DeliveryError::Transient(error.to_string())
}

/// Classification by HTTP status and Discord error code
pub fn classify_status(status: u16, code: isize, message: &str) -> DeliveryError {
    let detail = format!("{status} ({code}): {message}");
    let gone = matches!(status, 403 | 404)
        || matches!(
            code,
            UNKNOWN_CHANNEL | UNKNOWN_USER | MISSING_ACCESS | MISSING_PERMISSIONS
        );
    if gone {
        DeliveryError::DestinationGone(detail)
    } else {
        DeliveryError::Transient(detail)
    }
}

/// Embed posted when a reminder fires
pub fn reminder_embed(
    reminder: &Reminder,
    scheduled_at: DateTime<Utc>,
    delivered_at: DateTime<Utc>,
) -> CreateEmbed {
    let mut embed = CreateEmbed::default();
    embed.title("Reminder");
    embed.color(REMINDER_COLOR);
    embed.description(format!("<@{}>, here's your reminder!", reminder.owner));
    embed.field("Message", truncate_for_field(&reminder.message), false);
    embed.field(
        "Timing",
        timing_text(reminder, scheduled_at, delivered_at),
        false,
    );
    if let Some(footer) = footer_text(reminder) {
        embed.footer(|f| f.text(footer));
    }
    embed
}

fn timing_text(
    reminder: &Reminder,
    scheduled_at: DateTime<Utc>,
    delivered_at: DateTime<Utc>,
) -> String {
    let mut text = format!(
        "Requested: {}\nScheduled: {}\nDelivered: {}",
        discord_timestamp(reminder.requested_time, TimestampStyle::LongDateTime),
        discord_timestamp(scheduled_at, TimestampStyle::LongDateTime),
        discord_timestamp(delivered_at, TimestampStyle::LongDateTime),
    );
    let lateness = delivered_at - scheduled_at;
    if lateness > Duration::seconds(LATE_AFTER_SECONDS) {
        text.push_str(&format!(
            "\n⏰ Delivered {} late",
            format_duration(lateness.num_seconds())
        ));
    }
    text
}

fn footer_text(reminder: &Reminder) -> Option<String> {
    reminder.repeat.then(|| {
        format!(
            "Repeats every {} • Reminder ID: {}",
            format_duration(reminder.interval().num_seconds()),
            reminder.id
        )
    })
}
